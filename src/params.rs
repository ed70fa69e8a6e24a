// src/params.rs - Path and query parameter parsing for report endpoints
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::stats::DateWindow;

lazy_static! {
    static ref CSV_LIST_REGEX: Regex = Regex::new(r"^\d+(,\d+)*$").unwrap();
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ==================== SCALARS ====================

/// Comma-separated non-negative integers, e.g. `0,3,8`.
pub fn parse_csv_list(field: &str, value: &str) -> ApiResult<Vec<i64>> {
    if !CSV_LIST_REGEX.is_match(value) {
        return Err(ApiError::validation_failed(
            field,
            "expected comma-separated non-negative integers",
        ));
    }

    value
        .split(',')
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| ApiError::validation_failed(field, "value is out of range"))
        })
        .collect()
}

pub fn parse_date(field: &str, value: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| ApiError::validation_failed(field, "expected a date in YYYY-MM-DD format"))
}

// ==================== QUERY STRINGS ====================

/// Optional `?from=YYYY-MM-DD&to=YYYY-MM-DD`; both or neither.
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl DateRangeQuery {
    pub fn window(&self) -> ApiResult<Option<DateWindow>> {
        match (&self.from, &self.to) {
            (None, None) => Ok(None),
            (Some(from), Some(to)) => {
                let window = DateWindow::new(parse_date("from", from)?, parse_date("to", to)?)?;
                Ok(Some(window))
            }
            _ => Err(ApiError::validation_failed(
                "from/to",
                "both bounds are required when filtering by date",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_list() {
        assert_eq!(parse_csv_list("startValues", "0,3,8").unwrap(), vec![0, 3, 8]);
        assert_eq!(parse_csv_list("startValues", "12").unwrap(), vec![12]);
    }

    #[test]
    fn test_csv_list_rejects_malformed() {
        for bad in ["", ",", "1,", ",1", "1,,2", "-1", "1, 2", "a,b", "99999999999999999999"] {
            assert!(
                matches!(parse_csv_list("startValues", bad), Err(ApiError::ValidationError(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("startTime", "2022-02-28").unwrap(),
            NaiveDate::from_ymd_opt(2022, 2, 28).unwrap()
        );
        assert!(parse_date("startTime", "2022-02-30").is_err());
        assert!(parse_date("startTime", "28-02-2022").is_err());
    }

    #[test]
    fn test_date_range_query() {
        assert_eq!(DateRangeQuery::default().window().unwrap(), None);

        let q = DateRangeQuery {
            from: Some("2022-01-01".to_string()),
            to: Some("2022-01-31".to_string()),
        };
        let window = q.window().unwrap().unwrap();
        assert_eq!(window.from, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());

        let half = DateRangeQuery {
            from: Some("2022-01-01".to_string()),
            to: None,
        };
        assert!(half.window().is_err());

        let reversed = DateRangeQuery {
            from: Some("2022-02-01".to_string()),
            to: Some("2022-01-01".to_string()),
        };
        assert!(reversed.window().is_err());
    }
}
