// src/query_builders/filters/enums.rs
//! Path tokens accepted by the dashboard, generated with define_token_enum!

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::{ApiError, ApiResult};

/// Generates a token enum with as_str, parse, all_values and Display.
/// Matching is exact: case-sensitive, no trimming.
macro_rules! define_token_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $kind:literal {
            $( $variant:ident => $str_val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        $vis enum $name {
            $( $variant ),+
        }

        impl $name {
            #[inline]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $str_val ),+
                }
            }

            pub fn from_token(s: &str) -> Option<Self> {
                match s {
                    $( $str_val => Some($name::$variant), )+
                    _ => None,
                }
            }

            pub fn parse(s: &str) -> ApiResult<Self> {
                Self::from_token(s)
                    .ok_or_else(|| ApiError::unknown_token($kind, s, Self::all_values()))
            }

            pub const fn all_values() -> &'static [&'static str] {
                &[ $( $str_val ),+ ]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

// ==================== ORIGIN ====================

define_token_enum! {
    /// External identifiers start with `X`; everything else is internal.
    pub enum Origin: "origin" {
        Internal => "internal",
        External => "external",
    }
}

pub const EXTERNAL_PREFIX: &str = "X";

// ==================== PARITY ====================

define_token_enum! {
    /// Parity of the digit right before the `/` of an identifier.
    pub enum Parity: "parity" {
        Even => "even",
        Odd => "odd",
    }
}

impl Parity {
    /// Substrings whose presence anywhere in the identifier marks the parity.
    pub const fn markers(&self) -> [&'static str; 5] {
        match self {
            Parity::Even => ["0/", "2/", "4/", "6/", "8/"],
            Parity::Odd => ["1/", "3/", "5/", "7/", "9/"],
        }
    }
}

// ==================== PERIODS & STATS ====================

define_token_enum! {
    pub enum CountPeriod: "time period" {
        Month => "month",
        Year => "year",
    }
}

define_token_enum! {
    pub enum SummaryStat: "stat" {
        Tat => "tat",
    }
}

// ==================== BIOPSY TYPES ====================

/// Fixed biopsy-type vocabulary, in reporting order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
    EnumString, Display, EnumIter, IntoStaticStr,
)]
pub enum BiopsyType {
    Tumor,
    Nerve,
    Muscle,
    #[strum(serialize = "Multiple Biopsies")]
    #[serde(rename = "Multiple Biopsies")]
    MultipleBiopsies,
    Epilepsy,
    Block,
    Slides,
    Other,
}

impl BiopsyType {
    #[inline]
    pub fn label(&self) -> &'static str {
        self.into()
    }

    pub fn all_labels() -> Vec<&'static str> {
        Self::iter().map(|t| t.label()).collect()
    }

    pub fn parse(s: &str) -> ApiResult<Self> {
        s.parse::<Self>()
            .map_err(|_| ApiError::unknown_token("sample type", s, &Self::all_labels()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_match_exactly() {
        assert_eq!(Origin::parse("internal").unwrap(), Origin::Internal);
        assert_eq!(Origin::parse("external").unwrap(), Origin::External);
        assert!(Origin::parse("Internal").is_err());
        assert!(Origin::parse(" internal").is_err());
        assert!(Parity::parse("ODD").is_err());
        assert_eq!(CountPeriod::parse("year").unwrap(), CountPeriod::Year);
        assert!(SummaryStat::parse("mean").is_err());
    }

    #[test]
    fn test_unknown_token_is_validation_error() {
        let err = Parity::parse("prime").unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
        assert!(err.to_string().contains("even, odd"));
    }

    #[test]
    fn test_biopsy_vocabulary_order_and_labels() {
        assert_eq!(
            BiopsyType::all_labels(),
            vec!["Tumor", "Nerve", "Muscle", "Multiple Biopsies", "Epilepsy", "Block", "Slides", "Other"]
        );
        assert_eq!(BiopsyType::parse("Multiple Biopsies").unwrap(), BiopsyType::MultipleBiopsies);
        assert!(BiopsyType::parse("tumor").is_err());
        assert!(BiopsyType::parse("MultipleBiopsies").is_err());
    }

    #[test]
    fn test_parity_markers() {
        assert!(Parity::Odd.markers().iter().any(|m| "NP19/22".contains(m)));
        assert!(!Parity::Even.markers().iter().any(|m| "NP19/22".contains(m)));
        assert!(Parity::Even.markers().iter().any(|m| "NP20/22".contains(m)));
    }
}
