// src/query_builders/filters/whitelist.rs
//! Column whitelist for the asset table. Column names only ever reach SQL
//! through this enum.

use serde::{Deserialize, Serialize};

pub const ASSET_TABLE: &str = "asset_summary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetField {
    NpNumber,
    BiopsyType,
    StartTime,
    EndTime,
    Tat,
    RequestCode,
}

impl AssetField {
    #[inline]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            AssetField::NpNumber => "np_number",
            AssetField::BiopsyType => "biopsy_type",
            AssetField::StartTime => "start_time",
            AssetField::EndTime => "end_time",
            AssetField::Tat => "tat",
            AssetField::RequestCode => "request_code",
        }
    }

    /// Columns that can be averaged or maximised.
    #[inline]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, AssetField::Tat)
    }

    pub const fn all() -> &'static [AssetField] {
        &[
            AssetField::NpNumber,
            AssetField::BiopsyType,
            AssetField::StartTime,
            AssetField::EndTime,
            AssetField::Tat,
            AssetField::RequestCode,
        ]
    }
}

impl std::fmt::Display for AssetField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}
