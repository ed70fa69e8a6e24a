// src/stats.rs
//! Report computations. Each function runs one or more aggregate queries
//! through an `AssetStore` and shapes the result; `now` is passed in so
//! window arithmetic stays deterministic under test.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime};

use crate::error::{ApiError, ApiResult};
use crate::models::{CasesCount, DataSummary, PendingAssetView, RequestCount};
use crate::query_builders::criteria::{self, midnight, WindowBounds};
use crate::query_builders::{AssetField, BiopsyType, CountPeriod, FilterGroup, Origin, Parity, SummaryStat};
use crate::repositories::AssetStore;

/// Wall-clock time on the server, which is the time zone the tracker records in.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Inclusive calendar range used by the historical overlap filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> ApiResult<Self> {
        if to < from {
            return Err(ApiError::validation_failed("endTime", "end date is before start date"));
        }
        Ok(Self { from, to })
    }

    fn filter(&self) -> FilterGroup {
        criteria::overlapping(self.from, self.to)
    }
}

// ==================== CASE COUNTS ====================

/// One `CasesCount` per day, most recent first. Entry `i` covers
/// `[date(now - i), date(now - (i - 1)))`.
pub async fn daily_counts(
    store: &dyn AssetStore,
    now: NaiveDateTime,
    days: i64,
    max_days: i64,
) -> ApiResult<Vec<CasesCount>> {
    if days < 1 || days > max_days {
        return Err(ApiError::validation_failed(
            "days",
            &format!("must be between 1 and {}", max_days),
        ));
    }

    let mut series = Vec::with_capacity(days as usize);
    for i in 1..=days {
        let from = midnight(criteria::days_before(now, i)?);
        let until = midnight(criteria::days_before(now, i - 1)?);
        let window = criteria::started_between(from, until);

        series.push(CasesCount {
            internal_cases_count: store
                .count(&window.clone().push(criteria::origin(Origin::Internal)))
                .await?,
            external_cases_count: store
                .count(&window.push(criteria::origin(Origin::External)))
                .await?,
        });
    }
    Ok(series)
}

/// Records started between the first day of the month/year and the end of today.
/// `year_anchor` replaces today's date for the year period only.
pub async fn period_count(
    store: &dyn AssetStore,
    now: NaiveDateTime,
    period: CountPeriod,
    year_anchor: Option<NaiveDate>,
) -> ApiResult<i64> {
    let today = match period {
        CountPeriod::Month => now.date(),
        CountPeriod::Year => year_anchor.unwrap_or_else(|| now.date()),
    };

    let first = match period {
        CountPeriod::Month => today.with_day(1),
        CountPeriod::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1),
    }
    .ok_or_else(|| ApiError::InternalServerError(format!("No first day for {}", today)))?;

    let until = midnight(today + Duration::days(1));
    store.count(&criteria::started_between(midnight(first), until)).await
}

// ==================== SUMMARY ====================

pub async fn summarize(
    store: &dyn AssetStore,
    now: NaiveDateTime,
    stat: SummaryStat,
    window_days: i64,
) -> ApiResult<DataSummary> {
    let (field, filter) = match stat {
        SummaryStat::Tat => {
            let since = midnight(criteria::days_before(now, window_days)?);
            (
                AssetField::Tat,
                FilterGroup::all()
                    .push(criteria::has_tat())
                    .push(criteria::started_since(since)),
            )
        }
    };

    Ok(DataSummary {
        stat: stat.as_str().to_string(),
        mean: store.mean(field, &filter).await?,
        max: store.max(field, &filter).await?,
    })
}

// ==================== PENDING ====================

/// Pending assets inside the pending window, optionally narrowed by origin and parity.
pub async fn pending_list(
    store: &dyn AssetStore,
    now: NaiveDateTime,
    origin: Option<Origin>,
    parity: Option<Parity>,
    window_days: i64,
) -> ApiResult<Vec<PendingAssetView>> {
    let mut filter = FilterGroup::all()
        .push(criteria::pending())
        .push(criteria::pending_window(now.date(), window_days)?);

    if let Some(origin) = origin {
        filter = filter.push(criteria::origin_with_parity(origin, parity));
    }

    store.find_pending(&filter, now).await
}

/// Every pending asset, regardless of age.
pub async fn pending_total(store: &dyn AssetStore) -> ApiResult<i64> {
    store.count(&FilterGroup::all().push(criteria::pending())).await
}

/// Pending counts per day-offset window. Without an origin the window is
/// inclusive on both ends; with one the lower end is exclusive.
pub async fn pending_breakout(
    store: &dyn AssetStore,
    now: NaiveDateTime,
    start_offsets: &[i64],
    end_offsets: &[i64],
    origin: Option<(Origin, Option<Parity>)>,
) -> ApiResult<Vec<i64>> {
    check_paired(start_offsets, end_offsets)?;

    let (bounds, base) = match origin {
        None => (WindowBounds::Inclusive, FilterGroup::all()),
        Some((o, p)) => (WindowBounds::ExclusiveEnd, criteria::origin_with_parity(o, p)),
    };

    let mut counts = Vec::with_capacity(start_offsets.len());
    for (&start, &end) in start_offsets.iter().zip(end_offsets) {
        let filter = base
            .clone()
            .push(criteria::pending())
            .push(criteria::offset_window(now, start, end, bounds)?);
        counts.push(store.count(&filter).await?);
    }
    Ok(counts)
}

// ==================== REPORTS ====================

/// Case counts per biopsy type, in vocabulary order, for records overlapping the window.
pub async fn sample_type_breakout(
    store: &dyn AssetStore,
    window: DateWindow,
) -> ApiResult<Vec<i64>> {
    let mut counts = Vec::new();
    for biopsy in <BiopsyType as strum::IntoEnumIterator>::iter() {
        let filter = window.filter().push(criteria::biopsy_type(biopsy));
        counts.push(store.count(&filter).await?);
    }
    Ok(counts)
}

/// Counts of one biopsy type per inclusive TAT range.
pub async fn tat_breakout(
    store: &dyn AssetStore,
    biopsy: BiopsyType,
    lows: &[i64],
    highs: &[i64],
    window: Option<DateWindow>,
) -> ApiResult<Vec<i64>> {
    check_paired(lows, highs)?;

    let base = scoped(biopsy, window);
    let mut counts = Vec::with_capacity(lows.len());
    for (&lo, &hi) in lows.iter().zip(highs) {
        let filter = base.clone().push(criteria::tat_range(lo, hi));
        counts.push(store.count(&filter).await?);
    }
    Ok(counts)
}

/// Request-label counts for one biopsy type within an inclusive TAT range.
pub async fn request_breakout(
    store: &dyn AssetStore,
    biopsy: BiopsyType,
    tat_lo: i64,
    tat_hi: i64,
    window: Option<DateWindow>,
) -> ApiResult<Vec<RequestCount>> {
    let filter = scoped(biopsy, window).push(criteria::tat_range(tat_lo, tat_hi));
    let rows = store.count_by_request_code(&filter).await?;

    Ok(rows
        .into_iter()
        .map(|(code, count)| RequestCount::from_code(&code, count))
        .collect())
}

fn scoped(biopsy: BiopsyType, window: Option<DateWindow>) -> FilterGroup {
    let base = FilterGroup::all().push(criteria::biopsy_type(biopsy));
    match window {
        Some(w) => base.push(w.filter()),
        None => base,
    }
}

fn check_paired(starts: &[i64], ends: &[i64]) -> ApiResult<()> {
    if starts.is_empty() || starts.len() != ends.len() {
        return Err(ApiError::validation_failed(
            "range lists",
            "start and end lists must be non-empty and of equal length",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_pool;
    use crate::models::{AssetRecord, NewAsset, RequestFlags};
    use crate::repositories::SqliteAssetStore;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Seed<'a> {
        np: &'a str,
        biopsy: &'a str,
        start: NaiveDateTime,
        end: Option<NaiveDateTime>,
        code: &'a str,
    }

    async fn store_with(seeds: Vec<Seed<'_>>) -> SqliteAssetStore {
        let store = SqliteAssetStore::new(memory_pool().await);
        for s in seeds {
            let record = AssetRecord::create(NewAsset {
                np_number: s.np.to_string(),
                biopsy_type: s.biopsy.to_string(),
                start_time: s.start,
                end_time: s.end,
                requests: RequestFlags::decode(s.code),
            })
            .unwrap();
            store.insert(&record).await.unwrap();
        }
        store
    }

    fn pending(np: &str, start: NaiveDateTime) -> Seed<'_> {
        Seed { np, biopsy: "Tumor", start, end: None, code: "000000000" }
    }

    // Mid-afternoon on 10 May 2022
    fn now() -> NaiveDateTime {
        at(2022, 5, 10, 15, 30)
    }

    #[actix_rt::test]
    async fn test_daily_counts_windows_are_contiguous() {
        let store = store_with(vec![
            pending("NP1/22", at(2022, 5, 9, 0, 0)),
            pending("X2/22", at(2022, 5, 9, 23, 59)),
            pending("NP3/22", at(2022, 5, 8, 12, 0)),
            pending("NP4/22", at(2022, 5, 7, 0, 0)),
            // today and four days ago fall outside a 3-day series
            pending("NP5/22", at(2022, 5, 10, 1, 0)),
            pending("NP6/22", at(2022, 5, 6, 23, 59)),
        ])
        .await;

        let series = daily_counts(&store, now(), 3, 366).await.unwrap();
        assert_eq!(
            series,
            vec![
                CasesCount { internal_cases_count: 1, external_cases_count: 1 },
                CasesCount { internal_cases_count: 1, external_cases_count: 0 },
                CasesCount { internal_cases_count: 1, external_cases_count: 0 },
            ]
        );
    }

    #[actix_rt::test]
    async fn test_daily_counts_rejects_out_of_range_days() {
        let store = store_with(vec![]).await;
        assert!(matches!(
            daily_counts(&store, now(), 0, 366).await,
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(
            daily_counts(&store, now(), 367, 366).await,
            Err(ApiError::ValidationError(_))
        ));
    }

    #[actix_rt::test]
    async fn test_period_counts_include_all_of_today() {
        let store = store_with(vec![
            pending("NP1/22", at(2022, 5, 1, 0, 0)),
            pending("NP2/22", at(2022, 5, 10, 23, 0)),
            pending("NP3/22", at(2022, 4, 30, 23, 59)),
            pending("NP4/22", at(2022, 1, 1, 0, 0)),
            pending("NP5/22", at(2021, 12, 31, 12, 0)),
        ])
        .await;

        assert_eq!(period_count(&store, now(), CountPeriod::Month, None).await.unwrap(), 2);
        assert_eq!(period_count(&store, now(), CountPeriod::Year, None).await.unwrap(), 4);
    }

    #[actix_rt::test]
    async fn test_year_count_with_anchor() {
        let store = store_with(vec![
            pending("NP1/20", at(2020, 2, 27, 10, 0)),
            pending("NP2/20", at(2020, 3, 1, 10, 0)),
            pending("NP3/22", at(2022, 5, 1, 10, 0)),
        ])
        .await;

        let anchored = period_count(&store, now(), CountPeriod::Year, Some(date(2020, 2, 28)))
            .await
            .unwrap();
        assert_eq!(anchored, 1);
    }

    #[actix_rt::test]
    async fn test_summarize_tat_window() {
        let store = store_with(vec![
            Seed { np: "NP1/22", biopsy: "Tumor", start: at(2022, 5, 1, 9, 0), end: Some(at(2022, 5, 5, 9, 0)), code: "000000000" },
            Seed { np: "NP2/22", biopsy: "Nerve", start: at(2022, 5, 2, 9, 0), end: Some(at(2022, 5, 4, 9, 0)), code: "000000000" },
            // older than the 14-day window
            Seed { np: "NP3/22", biopsy: "Tumor", start: at(2022, 4, 1, 9, 0), end: Some(at(2022, 4, 30, 9, 0)), code: "000000000" },
            pending("NP4/22", at(2022, 5, 3, 9, 0)),
        ])
        .await;

        let summary = summarize(&store, now(), SummaryStat::Tat, 14).await.unwrap();
        assert_eq!(summary.stat, "tat");
        assert_eq!(summary.mean, 3.0);
        assert_eq!(summary.max, 4);

        let empty = store_with(vec![]).await;
        let summary = summarize(&empty, now(), SummaryStat::Tat, 14).await.unwrap();
        assert_eq!(summary.mean, 0.0);
        assert_eq!(summary.max, 0);
    }

    #[actix_rt::test]
    async fn test_pending_list_window_and_filters() {
        let store = store_with(vec![
            pending("NP11/22", at(2022, 5, 5, 8, 0)),
            pending("NP12/22", at(2022, 5, 9, 8, 0)),
            pending("X13/22", at(2022, 5, 3, 8, 0)),
            // started today: outside the window
            pending("NP14/22", at(2022, 5, 10, 8, 0)),
            // older than 90 days
            pending("NP15/22", at(2022, 1, 1, 8, 0)),
            Seed { np: "NP16/22", biopsy: "Tumor", start: at(2022, 5, 4, 8, 0), end: Some(at(2022, 5, 6, 8, 0)), code: "000000000" },
        ])
        .await;

        let all = pending_list(&store, now(), None, None, 90).await.unwrap();
        let ids: Vec<_> = all.iter().map(|v| v.np_number.as_str()).collect();
        assert_eq!(ids, vec!["X13/22", "NP11/22", "NP12/22"]);
        assert_eq!(all[2].start_time, "Yesterday, 08:00");

        let internal_odd = pending_list(&store, now(), Some(Origin::Internal), Some(Parity::Odd), 90)
            .await
            .unwrap();
        let ids: Vec<_> = internal_odd.iter().map(|v| v.np_number.as_str()).collect();
        assert_eq!(ids, vec!["NP11/22"]);

        assert_eq!(pending_total(&store).await.unwrap(), 5);
    }

    #[actix_rt::test]
    async fn test_pending_breakout_bound_asymmetry() {
        // Both records sit exactly on a window edge at midnight
        let store = store_with(vec![
            pending("NP1/22", at(2022, 5, 8, 0, 0)),
            pending("NP3/22", at(2022, 5, 3, 0, 0)),
        ])
        .await;

        let unfiltered = pending_breakout(&store, now(), &[2], &[7], None).await.unwrap();
        assert_eq!(unfiltered, vec![2]);

        let internal = pending_breakout(&store, now(), &[2], &[7], Some((Origin::Internal, None)))
            .await
            .unwrap();
        assert_eq!(internal, vec![1]);

        let odd = pending_breakout(
            &store,
            now(),
            &[2, 7],
            &[7, 30],
            Some((Origin::Internal, Some(Parity::Odd))),
        )
        .await
        .unwrap();
        // NP3/22 sits on the inclusive upper edge of the second window
        assert_eq!(odd, vec![1, 1]);
    }

    #[actix_rt::test]
    async fn test_pending_breakout_rejects_mismatched_lists() {
        let store = store_with(vec![]).await;
        assert!(pending_breakout(&store, now(), &[1, 2], &[0], None).await.is_err());
        assert!(pending_breakout(&store, now(), &[], &[], None).await.is_err());
    }

    #[actix_rt::test]
    async fn test_sample_type_breakout_uses_overlap() {
        let store = store_with(vec![
            Seed { np: "NP1/22", biopsy: "Tumor", start: at(2022, 3, 1, 9, 0), end: Some(at(2022, 3, 10, 9, 0)), code: "000000000" },
            Seed { np: "NP2/22", biopsy: "Nerve and Muscle", start: at(2022, 3, 5, 9, 0), end: Some(at(2022, 3, 6, 9, 0)), code: "000000000" },
            Seed { np: "NP3/22", biopsy: "Multiple Biopsies", start: at(2022, 2, 1, 9, 0), end: Some(at(2022, 2, 3, 9, 0)), code: "000000000" },
            Seed { np: "NP4/22", biopsy: "tumor", start: at(2022, 3, 2, 9, 0), end: Some(at(2022, 3, 4, 9, 0)), code: "000000000" },
        ])
        .await;

        let window = DateWindow::new(date(2022, 3, 3), date(2022, 3, 31)).unwrap();
        let counts = sample_type_breakout(&store, window).await.unwrap();
        assert_eq!(counts, vec![1, 1, 1, 0, 0, 0, 0, 0]);
    }

    #[actix_rt::test]
    async fn test_tat_and_request_breakouts() {
        let store = store_with(vec![
            Seed { np: "NP1/22", biopsy: "Tumor", start: at(2022, 3, 1, 9, 0), end: Some(at(2022, 3, 3, 9, 0)), code: "101000000" },
            Seed { np: "NP2/22", biopsy: "Tumor", start: at(2022, 3, 1, 9, 0), end: Some(at(2022, 3, 6, 9, 0)), code: "101000000" },
            Seed { np: "NP3/22", biopsy: "Tumor", start: at(2022, 3, 1, 9, 0), end: Some(at(2022, 3, 11, 9, 0)), code: "000000000" },
            Seed { np: "NP4/22", biopsy: "Nerve", start: at(2022, 3, 1, 9, 0), end: Some(at(2022, 3, 3, 9, 0)), code: "000000000" },
        ])
        .await;

        let counts = tat_breakout(&store, BiopsyType::Tumor, &[0, 3, 6], &[2, 5, 10], None)
            .await
            .unwrap();
        assert_eq!(counts, vec![1, 1, 1]);

        let mut requests = request_breakout(&store, BiopsyType::Tumor, 0, 10, None).await.unwrap();
        requests.sort_by(|a, b| a.request_type.cmp(&b.request_type));
        assert_eq!(
            requests,
            vec![
                RequestCount { request_type: "No instruction".to_string(), count: 1 },
                RequestCount { request_type: "Special stain + Process all".to_string(), count: 2 },
            ]
        );

        // Window ending before every record started excludes all of them
        let window = DateWindow::new(date(2022, 1, 1), date(2022, 2, 1)).unwrap();
        let counts = tat_breakout(&store, BiopsyType::Tumor, &[0], &[10], Some(window)).await.unwrap();
        assert_eq!(counts, vec![0]);
    }

    #[test]
    fn test_date_window_order() {
        assert!(DateWindow::new(date(2022, 3, 2), date(2022, 3, 1)).is_err());
        assert!(DateWindow::new(date(2022, 3, 1), date(2022, 3, 1)).is_ok());
    }
}
