// src/query_builders/filters/builder.rs
//! Compiles a `FilterGroup` into a `sqlx::QueryBuilder`.
//!
//! Every value goes through `push_bind`. Column names come from `AssetField`.
//! Operators are a closed enum.

use sqlx::{QueryBuilder, Sqlite};

use super::{Filter, FilterGroup, FilterItem, FilterOperator, FilterValue};

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterBuilder;

impl FilterBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Appends ` WHERE <condition>`. An empty group renders as its neutral element.
    pub fn push_where<'q>(
        &self,
        group: &FilterGroup,
        builder: &mut QueryBuilder<'q, Sqlite>,
    ) -> Result<(), String> {
        group.validate()?;
        builder.push(" WHERE ");
        self.push_group(group, builder);
        Ok(())
    }

    fn push_group<'q>(&self, group: &FilterGroup, builder: &mut QueryBuilder<'q, Sqlite>) {
        if group.items.is_empty() {
            builder.push(group.group_type.empty_sql());
            return;
        }

        let mut first = true;
        for item in &group.items {
            if !first {
                builder.push(" ");
                builder.push(group.group_type.as_sql());
                builder.push(" ");
            }
            first = false;

            match item {
                FilterItem::Single(filter) => self.push_single(filter, builder),
                FilterItem::Group(nested) => {
                    builder.push("(");
                    self.push_group(nested, builder);
                    builder.push(")");
                }
            }
        }
    }

    fn push_single<'q>(&self, filter: &Filter, builder: &mut QueryBuilder<'q, Sqlite>) {
        let field = filter.field.as_sql();

        // validate() has already paired operators with values
        let value = match (&filter.operator, &filter.value) {
            (FilterOperator::IsNull, _) => {
                builder.push(field).push(" IS NULL");
                return;
            }
            (FilterOperator::IsNotNull, _) => {
                builder.push(field).push(" IS NOT NULL");
                return;
            }
            (_, Some(value)) => value,
            (_, None) => {
                builder.push("1=0");
                return;
            }
        };

        match filter.operator {
            FilterOperator::StartsWith => {
                builder.push("instr(").push(field).push(", ");
                push_bind_value(builder, value);
                builder.push(") = 1");
            }
            FilterOperator::NotStartsWith => {
                builder.push("instr(").push(field).push(", ");
                push_bind_value(builder, value);
                builder.push(") != 1");
            }
            FilterOperator::Contains => {
                builder.push("instr(").push(field).push(", ");
                push_bind_value(builder, value);
                builder.push(") > 0");
            }
            FilterOperator::Between => {
                builder.push(field).push(" BETWEEN ");
                match value {
                    FilterValue::IntegerRange { from, to } => {
                        builder.push_bind(*from).push(" AND ").push_bind(*to);
                    }
                    single => {
                        push_bind_value(builder, single);
                        builder.push(" AND ");
                        push_bind_value(builder, single);
                    }
                }
            }
            op => {
                builder.push(field).push(" ").push(op.as_sql()).push(" ");
                push_bind_value(builder, value);
            }
        }
    }
}

fn push_bind_value<'q>(builder: &mut QueryBuilder<'q, Sqlite>, value: &FilterValue) {
    match value {
        FilterValue::Text(s) => { builder.push_bind(s.clone()); }
        FilterValue::Integer(n) => { builder.push_bind(*n); }
        FilterValue::DateTime(t) => { builder.push_bind(*t); }
        FilterValue::IntegerRange { from, .. } => { builder.push_bind(*from); }
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builders::filters::AssetField;

    fn render(group: &FilterGroup) -> String {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM asset_summary");
        FilterBuilder::new().push_where(group, &mut qb).unwrap();
        qb.sql().to_string()
    }

    #[test]
    fn test_empty_groups_render_neutral_elements() {
        assert!(render(&FilterGroup::all()).ends_with(" WHERE 1=1"));
        assert!(render(&FilterGroup::or(vec![])).ends_with(" WHERE 1=0"));
    }

    #[test]
    fn test_values_are_bound_not_interpolated() {
        let group = FilterGroup::and(vec![
            Filter::starts_with(AssetField::NpNumber, "X'; DROP TABLE users; --").into(),
            Filter::gte(AssetField::Tat, 3i64).into(),
        ]);
        let sql = render(&group);
        assert!(sql.contains("instr(np_number, ?) = 1"));
        assert!(sql.contains("tat >= ?"));
        assert!(!sql.contains("DROP"));
    }

    #[test]
    fn test_nested_or_is_parenthesized() {
        let group = FilterGroup::and(vec![
            Filter::is_null(AssetField::EndTime).into(),
            FilterGroup::or(vec![
                Filter::contains(AssetField::NpNumber, "1/").into(),
                Filter::contains(AssetField::NpNumber, "3/").into(),
            ])
            .into(),
        ]);
        let sql = render(&group);
        assert!(sql.ends_with(
            "WHERE end_time IS NULL AND (instr(np_number, ?) > 0 OR instr(np_number, ?) > 0)"
        ));
    }

    #[test]
    fn test_between_binds_both_ends() {
        let group = FilterGroup::all().push(Filter::between(
            AssetField::Tat,
            FilterValue::integer_range(2, 9),
        ));
        assert!(render(&group).ends_with("WHERE tat BETWEEN ? AND ?"));
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let group = FilterGroup::all().push(Filter {
            field: AssetField::Tat,
            operator: FilterOperator::Gte,
            value: None,
        });
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT 1");
        assert!(FilterBuilder::new().push_where(&group, &mut qb).is_err());
    }
}
