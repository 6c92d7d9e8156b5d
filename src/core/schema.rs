use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const FEATURE_COUNT: usize = 9;

/// Column names in the order every feature vector is laid out.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "ph",
    "Hardness",
    "Solids",
    "Chloramines",
    "Sulfate",
    "Conductivity",
    "Organic_carbon",
    "Trihalomethanes",
    "Turbidity",
];

pub const LABEL_COLUMN: &str = "Potability";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SampleError {
    #[error("feature `{feature}` is not a finite number")]
    NonFinite { feature: &'static str },

    #[error("feature `{feature}` = {value} is outside {range}")]
    OutOfRange {
        feature: &'static str,
        value: f64,
        range: &'static str,
    },

    #[error("label must be 0 or 1, got {0}")]
    InvalidLabel(i64),
}

/// Binary target of the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Potability {
    NotPotable,
    Potable,
}

impl Potability {
    pub fn from_class(class: usize) -> Option<Self> {
        match class {
            0 => Some(Self::NotPotable),
            1 => Some(Self::Potable),
            _ => None,
        }
    }

    pub fn class_index(self) -> usize {
        match self {
            Self::NotPotable => 0,
            Self::Potable => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotPotable => "Not Potable",
            Self::Potable => "Potable",
        }
    }
}

impl TryFrom<i64> for Potability {
    type Error = SampleError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(Self::from_class)
            .ok_or(SampleError::InvalidLabel(value))
    }
}

impl From<Potability> for i64 {
    fn from(value: Potability) -> Self {
        value.class_index() as i64
    }
}

impl Display for Potability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One water measurement, serialized with the dataset's column names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterSample {
    pub ph: f64,
    #[serde(rename = "Hardness")]
    pub hardness: f64,
    #[serde(rename = "Solids")]
    pub solids: f64,
    #[serde(rename = "Chloramines")]
    pub chloramines: f64,
    #[serde(rename = "Sulfate")]
    pub sulfate: f64,
    #[serde(rename = "Conductivity")]
    pub conductivity: f64,
    #[serde(rename = "Organic_carbon")]
    pub organic_carbon: f64,
    #[serde(rename = "Trihalomethanes")]
    pub trihalomethanes: f64,
    #[serde(rename = "Turbidity")]
    pub turbidity: f64,
}

impl WaterSample {
    pub fn from_array(v: [f64; FEATURE_COUNT]) -> Self {
        Self {
            ph: v[0],
            hardness: v[1],
            solids: v[2],
            chloramines: v[3],
            sulfate: v[4],
            conductivity: v[5],
            organic_carbon: v[6],
            trihalomethanes: v[7],
            turbidity: v[8],
        }
    }

    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.ph,
            self.hardness,
            self.solids,
            self.chloramines,
            self.sulfate,
            self.conductivity,
            self.organic_carbon,
            self.trihalomethanes,
            self.turbidity,
        ]
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }

    /// pH must lie in `[0, 14]`; every other measurement must be non-negative.
    pub fn validate(&self) -> Result<(), SampleError> {
        for (feature, value) in FEATURE_NAMES.iter().zip(self.to_array()) {
            if !value.is_finite() {
                return Err(SampleError::NonFinite { feature });
            }
            if *feature == "ph" {
                if !(0.0..=14.0).contains(&value) {
                    return Err(SampleError::OutOfRange {
                        feature,
                        value,
                        range: "[0, 14]",
                    });
                }
            } else if value < 0.0 {
                return Err(SampleError::OutOfRange {
                    feature,
                    value,
                    range: "[0, inf)",
                });
            }
        }
        Ok(())
    }
}

/// A measurement with its ground-truth label, as accumulated for retraining.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    #[serde(flatten)]
    pub sample: WaterSample,
    #[serde(rename = "Potability")]
    pub label: Potability,
}

impl LabeledSample {
    pub fn new(sample: WaterSample, label: Potability) -> Self {
        Self { sample, label }
    }
}
