// src/models/asset.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::NaiveDateTime;

use crate::error::{ApiError, ApiResult};

// ==================== REQUEST FLAGS ====================

/// Human-readable names of the request-code positions, in bit order.
pub const REQUEST_NAMES: [&str; 9] = [
    "Special stain",
    "IHC",
    "Process all",
    "Deeper",
    "Decal",
    "Kept for fixation",
    "Electron Microscope",
    "Semi Thin",
    "EHC",
];

pub const NO_INSTRUCTION: &str = "No instruction";

/// The nine special-request flags of an asset.
///
/// Field order is the position order of the request code:
/// `special_stain, ihc, process_all, deeper, decal, kept_for_fixation,
/// electron_microscope, semi_thin, ehc`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFlags {
    pub special_stain: bool,
    pub ihc: bool,
    pub process_all: bool,
    pub deeper: bool,
    pub decal: bool,
    pub kept_for_fixation: bool,
    pub electron_microscope: bool,
    pub semi_thin: bool,
    pub ehc: bool,
}

impl RequestFlags {
    pub fn as_array(&self) -> [bool; 9] {
        [
            self.special_stain,
            self.ihc,
            self.process_all,
            self.deeper,
            self.decal,
            self.kept_for_fixation,
            self.electron_microscope,
            self.semi_thin,
            self.ehc,
        ]
    }

    pub fn from_array(bits: [bool; 9]) -> Self {
        Self {
            special_stain: bits[0],
            ihc: bits[1],
            process_all: bits[2],
            deeper: bits[3],
            decal: bits[4],
            kept_for_fixation: bits[5],
            electron_microscope: bits[6],
            semi_thin: bits[7],
            ehc: bits[8],
        }
    }

    /// Reads a request code. Missing positions are unset, extra positions are
    /// ignored and any character other than `'1'` counts as unset.
    pub fn decode(code: &str) -> Self {
        let mut bits = [false; 9];
        for (bit, c) in bits.iter_mut().zip(code.chars()) {
            *bit = c == '1';
        }
        Self::from_array(bits)
    }

    pub fn encode(&self) -> String {
        self.as_array()
            .iter()
            .map(|set| if *set { '1' } else { '0' })
            .collect()
    }

    /// Names of the set flags joined with `" + "`, or `"No instruction"`.
    pub fn label(&self) -> String {
        let names: Vec<&str> = self
            .as_array()
            .iter()
            .zip(REQUEST_NAMES.iter())
            .filter(|(set, _)| **set)
            .map(|(_, name)| *name)
            .collect();

        if names.is_empty() {
            NO_INSTRUCTION.to_string()
        } else {
            names.join(" + ")
        }
    }
}

/// Decodes a stored request code into its combined label.
pub fn request_label(code: &str) -> String {
    RequestFlags::decode(code).label()
}

// ==================== ASSET RECORD ====================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssetRecord {
    pub np_number: String,
    pub biopsy_type: String,
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub special_stain: bool,
    pub ihc: bool,
    pub process_all: bool,
    pub deeper: bool,
    pub decal: bool,
    pub kept_for_fixation: bool,
    pub em: bool,
    pub semithin: bool,
    pub ehc: bool,
    pub tat: Option<i64>,
    pub request_code: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAsset {
    #[validate(length(min = 1, max = 64, message = "NP number must be between 1 and 64 characters"))]
    pub np_number: String,
    #[validate(length(min = 1, max = 255, message = "Biopsy type must be between 1 and 255 characters"))]
    pub biopsy_type: String,
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub requests: RequestFlags,
}

impl AssetRecord {
    /// Builds a record, deriving TAT and request code. The TAT is fixed here and
    /// never recomputed.
    pub fn create(new: NewAsset) -> ApiResult<Self> {
        new.validate()?;

        if let Some(end) = new.end_time {
            if end < new.start_time {
                return Err(ApiError::validation_failed(
                    "end_time",
                    "end time cannot be before start time",
                ));
            }
        }

        let flags = new.requests;
        Ok(Self {
            tat: new.end_time.map(|end| turnaround_days(new.start_time, end)),
            request_code: flags.encode(),
            np_number: new.np_number,
            biopsy_type: new.biopsy_type,
            start_time: new.start_time,
            end_time: new.end_time,
            special_stain: flags.special_stain,
            ihc: flags.ihc,
            process_all: flags.process_all,
            deeper: flags.deeper,
            decal: flags.decal,
            kept_for_fixation: flags.kept_for_fixation,
            em: flags.electron_microscope,
            semithin: flags.semi_thin,
            ehc: flags.ehc,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn is_external(&self) -> bool {
        self.np_number.starts_with('X')
    }
}

/// Whole days elapsed between start and end.
pub fn turnaround_days(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end - start).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_request_label() {
        assert_eq!(request_label("101000000"), "Special stain + Process all");
        assert_eq!(request_label("000000000"), "No instruction");
        assert_eq!(request_label("000000001"), "EHC");
        assert_eq!(request_label("010010000"), "IHC + Decal");
    }

    #[test]
    fn test_request_label_short_and_malformed_codes() {
        assert_eq!(request_label(""), "No instruction");
        assert_eq!(request_label("1"), "Special stain");
        assert_eq!(request_label("01"), "IHC");
        assert_eq!(request_label("1x1"), "Special stain + Process all");
        assert_eq!(request_label("0000000011111"), "EHC");
    }

    #[test]
    fn test_flags_encode_decode() {
        let flags = RequestFlags {
            ihc: true,
            semi_thin: true,
            ..Default::default()
        };
        assert_eq!(flags.encode(), "010000010");
        assert_eq!(RequestFlags::decode("010000010"), flags);
        assert_eq!(flags.label(), "IHC + Semi Thin");
    }

    #[test]
    fn test_create_derives_tat_and_code() {
        let record = AssetRecord::create(NewAsset {
            np_number: "NP19/22".to_string(),
            biopsy_type: "Tumor".to_string(),
            start_time: at(2022, 3, 1, 9, 30),
            end_time: Some(at(2022, 3, 8, 9, 0)),
            requests: RequestFlags { decal: true, ..Default::default() },
        })
        .unwrap();

        // 6 days 23.5 hours
        assert_eq!(record.tat, Some(6));
        assert_eq!(record.request_code, "000010000");
        assert!(record.decal);
        assert!(!record.is_pending());
        assert!(!record.is_external());
    }

    #[test]
    fn test_create_pending_has_no_tat() {
        let record = AssetRecord::create(NewAsset {
            np_number: "X101/22".to_string(),
            biopsy_type: "Nerve".to_string(),
            start_time: at(2022, 3, 1, 9, 30),
            end_time: None,
            requests: RequestFlags::default(),
        })
        .unwrap();

        assert_eq!(record.tat, None);
        assert!(record.is_pending());
        assert!(record.is_external());
    }

    #[test]
    fn test_create_rejects_end_before_start() {
        let result = AssetRecord::create(NewAsset {
            np_number: "NP1/22".to_string(),
            biopsy_type: "Tumor".to_string(),
            start_time: at(2022, 3, 2, 0, 0),
            end_time: Some(at(2022, 3, 1, 0, 0)),
            requests: RequestFlags::default(),
        });
        assert!(matches!(result, Err(ApiError::ValidationError(_))));
    }

    #[test]
    fn test_create_rejects_empty_np_number() {
        let result = AssetRecord::create(NewAsset {
            np_number: String::new(),
            biopsy_type: "Tumor".to_string(),
            start_time: at(2022, 3, 2, 0, 0),
            end_time: None,
            requests: RequestFlags::default(),
        });
        assert!(matches!(result, Err(ApiError::ValidationError(_))));
    }
}
