// src/query_builders/sql/aggregate.rs
//! Aggregate and projection queries over the asset table

use sqlx::{QueryBuilder, Sqlite};

use crate::query_builders::filters::{AssetField, FilterBuilder, FilterGroup, ASSET_TABLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Avg(AssetField),
    Max(AssetField),
}

impl Aggregate {
    fn select_expr(&self) -> Result<String, String> {
        match self {
            Aggregate::Count => Ok("COUNT(*)".to_string()),
            Aggregate::Avg(field) | Aggregate::Max(field) if !field.is_numeric() => {
                Err(format!("Cannot aggregate non-numeric column '{}'", field))
            }
            Aggregate::Avg(field) => Ok(format!("AVG({})", field.as_sql())),
            Aggregate::Max(field) => Ok(format!("MAX({})", field.as_sql())),
        }
    }
}

/// Builds bound aggregate queries under one predicate.
pub struct AggregateQueryBuilder<'a> {
    filter: &'a FilterGroup,
}

impl<'a> AggregateQueryBuilder<'a> {
    pub fn new(filter: &'a FilterGroup) -> Self {
        Self { filter }
    }

    /// `SELECT <aggregate> FROM asset_summary WHERE ...`
    pub fn scalar(&self, aggregate: Aggregate) -> Result<QueryBuilder<'static, Sqlite>, String> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {} FROM {}",
            aggregate.select_expr()?,
            ASSET_TABLE
        ));
        FilterBuilder::new().push_where(self.filter, &mut qb)?;
        Ok(qb)
    }

    /// `SELECT field, COUNT(*) ... GROUP BY field`
    pub fn count_by(&self, field: AssetField) -> Result<QueryBuilder<'static, Sqlite>, String> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {col}, COUNT(*) FROM {table}",
            col = field.as_sql(),
            table = ASSET_TABLE
        ));
        FilterBuilder::new().push_where(self.filter, &mut qb)?;
        qb.push(" GROUP BY ").push(field.as_sql());
        Ok(qb)
    }

    /// Pending projection ordered by ascending start.
    pub fn pending_rows(&self) -> Result<QueryBuilder<'static, Sqlite>, String> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {}, {}, {} FROM {}",
            AssetField::NpNumber.as_sql(),
            AssetField::BiopsyType.as_sql(),
            AssetField::StartTime.as_sql(),
            ASSET_TABLE
        ));
        FilterBuilder::new().push_where(self.filter, &mut qb)?;
        qb.push(" ORDER BY ").push(AssetField::StartTime.as_sql()).push(" ASC");
        Ok(qb)
    }
}

// ==================== TESTS ====================
