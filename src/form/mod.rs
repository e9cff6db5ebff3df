//! Extraction form model: field catalogue, defaults and submit-time validation.

mod sync;

use thiserror::Error;

use crate::geometry::CropRegion;

pub use sync::{coerce_int, CoordinateInputs, DualInput};

pub const THRESHOLD_MIN: f64 = 0.5;
pub const THRESHOLD_MAX: f64 = 15.0;
pub const FRAME_INTERVAL_MAX_SEC: f64 = 3.0;

const DEFAULT_START_TIME: &str = "0:00";
const DEFAULT_THRESHOLD: &str = "5.0";
const DEFAULT_FRAME_INTERVAL_SEC: &str = "1.0";
const DEFAULT_REGION: CropRegion = CropRegion::new(0, 100, 70, 100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coordinate {
    XStart,
    XEnd,
    YStart,
    YEnd,
}

impl Coordinate {
    pub const ALL: [Coordinate; 4] = [Self::XStart, Self::XEnd, Self::YStart, Self::YEnd];

    pub const fn key(self) -> &'static str {
        match self {
            Self::XStart => "x_start",
            Self::XEnd => "x_end",
            Self::YStart => "y_start",
            Self::YEnd => "y_end",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::XStart => "X start (%)",
            Self::XEnd => "X end (%)",
            Self::YStart => "Y start (%)",
            Self::YEnd => "Y end (%)",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::XStart => 0,
            Self::XEnd => 1,
            Self::YStart => 2,
            Self::YEnd => 3,
        }
    }

    pub const fn of(self, region: CropRegion) -> i32 {
        match self {
            Self::XStart => region.x_start,
            Self::XEnd => region.x_end,
            Self::YStart => region.y_start,
            Self::YEnd => region.y_end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Url,
    StartTime,
    EndTime,
    Coordinate(Coordinate),
    Threshold,
    FrameIntervalSec,
    InspectionMode,
}

impl FormField {
    /// Fields mirrored into the query string, in canonical order.
    pub const URL_TRACKED: [FormField; 9] = [
        Self::Url,
        Self::StartTime,
        Self::EndTime,
        Self::Coordinate(Coordinate::XStart),
        Self::Coordinate(Coordinate::XEnd),
        Self::Coordinate(Coordinate::YStart),
        Self::Coordinate(Coordinate::YEnd),
        Self::Threshold,
        Self::FrameIntervalSec,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::StartTime => "start_time",
            Self::EndTime => "end_time",
            Self::Coordinate(coordinate) => coordinate.key(),
            Self::Threshold => "threshold",
            Self::FrameIntervalSec => "frame_interval_sec",
            Self::InspectionMode => "inspection_mode",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::URL_TRACKED
            .into_iter()
            .chain(std::iter::once(Self::InspectionMode))
            .find(|field| field.key() == key)
    }

    pub const fn is_url_tracked(self) -> bool {
        !matches!(self, Self::InspectionMode)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("threshold must be a number between 0.5 and 15.0 (got {raw:?})")]
    ThresholdOutOfRange { raw: String },
    #[error("frame interval must be greater than 0 and at most 3.0 seconds (got {raw:?})")]
    FrameIntervalOutOfRange { raw: String },
}

impl FormError {
    /// Control that should receive focus after a rejected submission.
    pub const fn field(&self) -> FormField {
        match self {
            Self::ThresholdOutOfRange { .. } => FormField::Threshold,
            Self::FrameIntervalOutOfRange { .. } => FormField::FrameIntervalSec,
        }
    }
}

/// Numeric settings that passed submit-time validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedSettings {
    pub threshold: f64,
    pub frame_interval_sec: f64,
    pub region: CropRegion,
}

/// Every control of the extraction form, holding raw text the way the widgets do.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub url: String,
    pub start_time: String,
    pub end_time: String,
    pub coordinates: CoordinateInputs,
    pub threshold: String,
    pub frame_interval_sec: String,
    pub inspection_mode: bool,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            url: String::new(),
            start_time: DEFAULT_START_TIME.to_string(),
            end_time: String::new(),
            coordinates: CoordinateInputs::new(DEFAULT_REGION),
            threshold: DEFAULT_THRESHOLD.to_string(),
            frame_interval_sec: DEFAULT_FRAME_INTERVAL_SEC.to_string(),
            inspection_mode: false,
        }
    }
}

impl FormState {
    pub fn region(&self) -> CropRegion {
        self.coordinates.region()
    }

    pub fn value(&self, field: FormField) -> String {
        match field {
            FormField::Url => self.url.clone(),
            FormField::StartTime => self.start_time.clone(),
            FormField::EndTime => self.end_time.clone(),
            FormField::Coordinate(coordinate) => {
                self.coordinates.get(coordinate).number().to_string()
            }
            FormField::Threshold => self.threshold.clone(),
            FormField::FrameIntervalSec => self.frame_interval_sec.clone(),
            FormField::InspectionMode => bool_flag(self.inspection_mode).to_string(),
        }
    }

    /// Writes a raw value; coordinates update both halves of their pair.
    pub fn set_value(&mut self, field: FormField, raw: &str) {
        match field {
            FormField::Url => self.url = raw.to_string(),
            FormField::StartTime => self.start_time = raw.to_string(),
            FormField::EndTime => self.end_time = raw.to_string(),
            FormField::Coordinate(coordinate) => {
                self.coordinates.get_mut(coordinate).set_from_number(raw)
            }
            FormField::Threshold => self.threshold = raw.to_string(),
            FormField::FrameIntervalSec => self.frame_interval_sec = raw.to_string(),
            FormField::InspectionMode => self.inspection_mode = matches!(raw, "true" | "on" | "1"),
        }
    }

    pub fn validate(&self) -> Result<ValidatedSettings, FormError> {
        let threshold = parse_number(&self.threshold)
            .filter(|value| (THRESHOLD_MIN..=THRESHOLD_MAX).contains(value))
            .ok_or_else(|| FormError::ThresholdOutOfRange {
                raw: self.threshold.clone(),
            })?;
        let frame_interval_sec = parse_number(&self.frame_interval_sec)
            .filter(|value| *value > 0.0 && *value <= FRAME_INTERVAL_MAX_SEC)
            .ok_or_else(|| FormError::FrameIntervalOutOfRange {
                raw: self.frame_interval_sec.clone(),
            })?;

        Ok(ValidatedSettings {
            threshold,
            frame_interval_sec,
            region: self.region(),
        })
    }

    /// Multipart body sent to the execute endpoint.
    pub fn multipart_fields(&self) -> Vec<(&'static str, String)> {
        FormField::URL_TRACKED
            .into_iter()
            .chain(std::iter::once(FormField::InspectionMode))
            .map(|field| (field.key(), self.value(field)))
            .collect()
    }
}

const fn bool_flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
