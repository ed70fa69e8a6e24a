// src/query_builders/filters/value.rs
//! Filter values, each variant maps to exactly one bind type

use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
    DateTime(NaiveDateTime),
    IntegerRange { from: i64, to: i64 },
}

impl FilterValue {
    #[inline] pub fn text(s: impl Into<String>) -> Self { FilterValue::Text(s.into()) }
    #[inline] pub fn integer_range(from: i64, to: i64) -> Self { FilterValue::IntegerRange { from, to } }

    #[inline]
    pub fn is_range(&self) -> bool {
        matches!(self, FilterValue::IntegerRange { .. })
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self, FilterValue::Text(_))
    }
}

// ==================== FROM IMPLEMENTATIONS ====================

impl From<String> for FilterValue {
    fn from(s: String) -> Self { FilterValue::Text(s) }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self { FilterValue::Text(s.to_string()) }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self { FilterValue::Integer(n) }
}

impl From<NaiveDateTime> for FilterValue {
    fn from(t: NaiveDateTime) -> Self { FilterValue::DateTime(t) }
}
