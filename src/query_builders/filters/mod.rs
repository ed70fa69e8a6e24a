// src/query_builders/filters/mod.rs
//! Predicate tree over the asset table

pub mod builder;
pub mod enums;
pub mod value;
pub mod whitelist;

pub use builder::FilterBuilder;
pub use enums::*;
pub use value::FilterValue;
pub use whitelist::{AssetField, ASSET_TABLE};

// ==================== OPERATORS ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Lt,
    Lte,
    Gt,
    Gte,
    /// Inclusive on both ends.
    Between,
    /// Case-sensitive prefix match, no wildcards.
    StartsWith,
    NotStartsWith,
    /// Case-sensitive substring match, no wildcards.
    Contains,
    IsNull,
    IsNotNull,
}

impl FilterOperator {
    #[inline]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Between => "BETWEEN",
            FilterOperator::StartsWith => "STARTS WITH",
            FilterOperator::NotStartsWith => "NOT STARTS WITH",
            FilterOperator::Contains => "CONTAINS",
            FilterOperator::IsNull => "IS NULL",
            FilterOperator::IsNotNull => "IS NOT NULL",
        }
    }

    #[inline]
    pub const fn needs_value(&self) -> bool {
        !matches!(self, FilterOperator::IsNull | FilterOperator::IsNotNull)
    }
}

// ==================== FILTER ====================

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: AssetField,
    pub operator: FilterOperator,
    pub value: Option<FilterValue>,
}

impl Filter {
    fn with(field: AssetField, operator: FilterOperator, value: impl Into<FilterValue>) -> Self {
        Self { field, operator, value: Some(value.into()) }
    }

    pub fn lt(field: AssetField, value: impl Into<FilterValue>) -> Self {
        Self::with(field, FilterOperator::Lt, value)
    }
    pub fn lte(field: AssetField, value: impl Into<FilterValue>) -> Self {
        Self::with(field, FilterOperator::Lte, value)
    }
    pub fn gt(field: AssetField, value: impl Into<FilterValue>) -> Self {
        Self::with(field, FilterOperator::Gt, value)
    }
    pub fn gte(field: AssetField, value: impl Into<FilterValue>) -> Self {
        Self::with(field, FilterOperator::Gte, value)
    }
    pub fn between(field: AssetField, value: FilterValue) -> Self {
        Self { field, operator: FilterOperator::Between, value: Some(value) }
    }
    pub fn starts_with(field: AssetField, prefix: impl Into<String>) -> Self {
        Self::with(field, FilterOperator::StartsWith, prefix.into())
    }
    pub fn not_starts_with(field: AssetField, prefix: impl Into<String>) -> Self {
        Self::with(field, FilterOperator::NotStartsWith, prefix.into())
    }
    pub fn contains(field: AssetField, needle: impl Into<String>) -> Self {
        Self::with(field, FilterOperator::Contains, needle.into())
    }
    pub fn is_null(field: AssetField) -> Self {
        Self { field, operator: FilterOperator::IsNull, value: None }
    }
    pub fn is_not_null(field: AssetField) -> Self {
        Self { field, operator: FilterOperator::IsNotNull, value: None }
    }

    pub fn validate(&self) -> Result<(), String> {
        match (&self.value, self.operator.needs_value()) {
            (None, true) => {
                return Err(format!("Value required for {} on {}", self.operator.as_sql(), self.field));
            }
            (Some(_), false) => {
                return Err(format!("{} on {} takes no value", self.operator.as_sql(), self.field));
            }
            _ => {}
        }

        if let Some(value) = &self.value {
            match self.operator {
                FilterOperator::Between if !value.is_range() => {
                    return Err(format!("BETWEEN on {} needs a range", self.field));
                }
                FilterOperator::StartsWith | FilterOperator::NotStartsWith | FilterOperator::Contains
                    if !value.is_text() =>
                {
                    return Err(format!("{} on {} needs text", self.operator.as_sql(), self.field));
                }
                FilterOperator::Between
                | FilterOperator::StartsWith
                | FilterOperator::NotStartsWith
                | FilterOperator::Contains => {}
                _ if value.is_range() => {
                    return Err(format!("{} on {} cannot take a range", self.operator.as_sql(), self.field));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

// ==================== GROUPS ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupType {
    And,
    Or,
}

impl GroupType {
    #[inline]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            GroupType::And => "AND",
            GroupType::Or => "OR",
        }
    }

    /// Neutral element of the connective: an empty AND is true, an empty OR is false.
    #[inline]
    pub const fn empty_sql(&self) -> &'static str {
        match self {
            GroupType::And => "1=1",
            GroupType::Or => "1=0",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterItem {
    Single(Filter),
    Group(FilterGroup),
}

impl From<Filter> for FilterItem {
    fn from(f: Filter) -> Self { FilterItem::Single(f) }
}

impl From<FilterGroup> for FilterItem {
    fn from(g: FilterGroup) -> Self { FilterItem::Group(g) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterGroup {
    pub group_type: GroupType,
    pub items: Vec<FilterItem>,
}

impl FilterGroup {
    pub fn and(items: Vec<FilterItem>) -> Self {
        Self { group_type: GroupType::And, items }
    }

    pub fn or(items: Vec<FilterItem>) -> Self {
        Self { group_type: GroupType::Or, items }
    }

    /// A group matching every row.
    pub fn all() -> Self {
        Self::and(Vec::new())
    }

    pub fn push(mut self, item: impl Into<FilterItem>) -> Self {
        self.items.push(item.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn validate(&self) -> Result<(), String> {
        for item in &self.items {
            match item {
                FilterItem::Single(filter) => filter.validate()?,
                FilterItem::Group(nested) => nested.validate()?,
            }
        }
        Ok(())
    }
}

impl Default for FilterGroup {
    fn default() -> Self {
        Self::all()
    }
}
