// src/query_builders/mod.rs
//! Query builders: predicates as values, compiled to bound SQL

pub mod criteria;
pub mod filters;
pub mod sql;

pub use filters::{
    AssetField, BiopsyType, CountPeriod, Filter, FilterBuilder, FilterGroup, FilterItem,
    FilterOperator, FilterValue, GroupType, Origin, Parity, SummaryStat,
};
pub use sql::{Aggregate, AggregateQueryBuilder};
