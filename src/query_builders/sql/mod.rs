// src/query_builders/sql/mod.rs
//! SQL query builders

pub mod aggregate;

pub use aggregate::{Aggregate, AggregateQueryBuilder};
