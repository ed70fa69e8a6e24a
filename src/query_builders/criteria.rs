// src/query_builders/criteria.rs
//! Report predicates built from path parameters

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{ApiError, ApiResult};
use crate::query_builders::filters::{
    AssetField, BiopsyType, Filter, FilterGroup, FilterItem, FilterValue, Origin, Parity,
    EXTERNAL_PREFIX,
};

/// How the lower edge of a day-offset window is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowBounds {
    /// `window_end < start_time <= window_start`
    ExclusiveEnd,
    /// `window_end <= start_time <= window_start`
    Inclusive,
}

#[inline]
pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// `date - days`, rejecting offsets chrono cannot represent.
pub fn date_minus(date: NaiveDate, days: i64) -> ApiResult<NaiveDate> {
    Duration::try_days(days)
        .and_then(|offset| date.checked_sub_signed(offset))
        .ok_or_else(|| ApiError::validation_failed("days", "offset is out of range"))
}

/// Calendar date `days` before the date of `now`.
pub fn days_before(now: NaiveDateTime, days: i64) -> ApiResult<NaiveDate> {
    date_minus(now.date(), days)
}

// ==================== IDENTIFIER FILTERS ====================

pub fn origin(origin: Origin) -> Filter {
    match origin {
        Origin::Internal => Filter::not_starts_with(AssetField::NpNumber, EXTERNAL_PREFIX),
        Origin::External => Filter::starts_with(AssetField::NpNumber, EXTERNAL_PREFIX),
    }
}

pub fn parity(parity: Parity) -> FilterGroup {
    FilterGroup::or(
        parity
            .markers()
            .iter()
            .map(|marker| FilterItem::from(Filter::contains(AssetField::NpNumber, *marker)))
            .collect(),
    )
}

/// Origin filter with an optional parity refinement.
pub fn origin_with_parity(o: Origin, p: Option<Parity>) -> FilterGroup {
    let group = FilterGroup::all().push(origin(o));
    match p {
        Some(p) => group.push(parity(p)),
        None => group,
    }
}

pub fn biopsy_type(biopsy: BiopsyType) -> Filter {
    Filter::contains(AssetField::BiopsyType, biopsy.label())
}

// ==================== STATE FILTERS ====================

pub fn pending() -> Filter {
    Filter::is_null(AssetField::EndTime)
}

pub fn has_tat() -> Filter {
    Filter::is_not_null(AssetField::Tat)
}

/// `lo <= tat <= hi`
pub fn tat_range(lo: i64, hi: i64) -> Filter {
    Filter::between(AssetField::Tat, FilterValue::integer_range(lo, hi))
}

// ==================== TIME WINDOWS ====================

/// `start_time >= today - days` and `start_time < today`, both at midnight.
pub fn pending_window(today: NaiveDate, days: i64) -> ApiResult<FilterGroup> {
    let from = date_minus(today, days)?;
    Ok(FilterGroup::and(vec![
        Filter::gte(AssetField::StartTime, midnight(from)).into(),
        Filter::lt(AssetField::StartTime, midnight(today)).into(),
    ]))
}

/// Records whose lifetime overlaps `[from, to]`.
pub fn overlapping(from: NaiveDate, to: NaiveDate) -> FilterGroup {
    FilterGroup::and(vec![
        Filter::gte(AssetField::EndTime, midnight(from)).into(),
        Filter::lte(AssetField::StartTime, midnight(to)).into(),
    ])
}

/// Half-open `[from, until)` on the start instant.
pub fn started_between(from: NaiveDateTime, until: NaiveDateTime) -> FilterGroup {
    FilterGroup::and(vec![
        Filter::gte(AssetField::StartTime, from).into(),
        Filter::lt(AssetField::StartTime, until).into(),
    ])
}

pub fn started_since(from: NaiveDateTime) -> Filter {
    Filter::gte(AssetField::StartTime, from)
}

/// Window between `date(now - start_offset)` and `date(now - end_offset)`.
pub fn offset_window(
    now: NaiveDateTime,
    start_offset: i64,
    end_offset: i64,
    bounds: WindowBounds,
) -> ApiResult<FilterGroup> {
    let window_start = midnight(days_before(now, start_offset)?);
    let window_end = midnight(days_before(now, end_offset)?);

    let lower = match bounds {
        WindowBounds::ExclusiveEnd => Filter::gt(AssetField::StartTime, window_end),
        WindowBounds::Inclusive => Filter::gte(AssetField::StartTime, window_end),
    };

    Ok(FilterGroup::and(vec![
        lower.into(),
        Filter::lte(AssetField::StartTime, window_start).into(),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builders::filters::FilterOperator;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_origin_filters() {
        let internal = origin(Origin::Internal);
        assert_eq!(internal.operator, FilterOperator::NotStartsWith);
        assert_eq!(internal.value, Some(FilterValue::text("X")));
        assert_eq!(origin(Origin::External).operator, FilterOperator::StartsWith);
    }

    #[test]
    fn test_parity_is_or_of_five_markers() {
        let group = parity(Parity::Odd);
        assert_eq!(group.items.len(), 5);
        assert_eq!(group.group_type, crate::query_builders::filters::GroupType::Or);
    }

    #[test]
    fn test_pending_window_bounds() {
        let today = NaiveDate::from_ymd_opt(2022, 5, 10).unwrap();
        let group = pending_window(today, 90).unwrap();
        assert_eq!(
            group.items[0],
            FilterItem::Single(Filter::gte(AssetField::StartTime, at(2022, 2, 9, 0)))
        );
        assert_eq!(
            group.items[1],
            FilterItem::Single(Filter::lt(AssetField::StartTime, at(2022, 5, 10, 0)))
        );
    }

    #[test]
    fn test_offset_window_uses_calendar_dates() {
        let now = at(2022, 5, 10, 15);
        let group = offset_window(now, 2, 7, WindowBounds::ExclusiveEnd).unwrap();
        assert_eq!(
            group.items[0],
            FilterItem::Single(Filter::gt(AssetField::StartTime, at(2022, 5, 3, 0)))
        );
        assert_eq!(
            group.items[1],
            FilterItem::Single(Filter::lte(AssetField::StartTime, at(2022, 5, 8, 0)))
        );

        let inclusive = offset_window(now, 2, 7, WindowBounds::Inclusive).unwrap();
        assert_eq!(
            inclusive.items[0],
            FilterItem::Single(Filter::gte(AssetField::StartTime, at(2022, 5, 3, 0)))
        );
    }

    #[test]
    fn test_offset_window_out_of_range() {
        let now = at(2022, 5, 10, 15);
        assert!(offset_window(now, i32::MAX as i64, 0, WindowBounds::Inclusive).is_err());
        // past i64::MAX / 86400 the duration itself overflows
        assert!(offset_window(now, 999_999_999_999_999, 0, WindowBounds::Inclusive).is_err());
        assert!(offset_window(now, 0, i64::MAX, WindowBounds::ExclusiveEnd).is_err());
        assert!(days_before(now, 999_999_999_999_999).is_err());
    }

    #[test]
    fn test_pending_window_out_of_range() {
        let today = NaiveDate::from_ymd_opt(2022, 5, 10).unwrap();
        assert!(matches!(
            pending_window(today, 999_999_999_999_999),
            Err(ApiError::ValidationError(_))
        ));
        assert!(pending_window(today, i64::MAX).is_err());
    }
}
