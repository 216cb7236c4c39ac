//! Soil measurements and the columnar scoring payload

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Column order expected by the crop model
pub const SOIL_COLUMNS: [&str; 7] = ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"];

/// One complete soil analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilSample {
    /// Nitrogen
    #[serde(rename = "N")]
    pub nitrogen: f64,
    /// Phosphorus
    #[serde(rename = "P")]
    pub phosphorus: f64,
    /// Potassium
    #[serde(rename = "K")]
    pub potassium: f64,
    /// Degrees Celsius
    pub temperature: f64,
    /// Percent
    pub humidity: f64,
    pub ph: f64,
    /// Millimetres
    pub rainfall: f64,
}

impl Default for SoilSample {
    fn default() -> Self {
        Self {
            nitrogen: 90.0,
            phosphorus: 42.0,
            potassium: 43.0,
            temperature: 20.8,
            humidity: 82.0,
            ph: 6.5,
            rainfall: 202.9,
        }
    }
}

impl SoilSample {
    /// Values in [`SOIL_COLUMNS`] order
    pub fn values(&self) -> [f64; 7] {
        [
            self.nitrogen,
            self.phosphorus,
            self.potassium,
            self.temperature,
            self.humidity,
            self.ph,
            self.rainfall,
        ]
    }

    /// Reject non-finite values before they reach the model
    pub fn validate(&self) -> Result<()> {
        for (column, value) in SOIL_COLUMNS.iter().zip(self.values()) {
            if !value.is_finite() {
                return Err(Error::Validation(format!(
                    "Soil field `{}` must be a number",
                    column
                )));
            }
        }
        Ok(())
    }

    pub fn to_payload(&self) -> ScoringRequest {
        ScoringRequest {
            input_data: ScoringFrame {
                columns: SOIL_COLUMNS.iter().map(|c| c.to_string()).collect(),
                index: vec![0],
                data: vec![self.values().to_vec()],
            },
        }
    }
}

/// Soil form as typed by the user, any field may still be blank
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SoilForm {
    #[serde(rename = "N")]
    pub nitrogen: Option<f64>,
    #[serde(rename = "P")]
    pub phosphorus: Option<f64>,
    #[serde(rename = "K")]
    pub potassium: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub ph: Option<f64>,
    pub rainfall: Option<f64>,
}

impl From<SoilSample> for SoilForm {
    fn from(s: SoilSample) -> Self {
        Self {
            nitrogen: Some(s.nitrogen),
            phosphorus: Some(s.phosphorus),
            potassium: Some(s.potassium),
            temperature: Some(s.temperature),
            humidity: Some(s.humidity),
            ph: Some(s.ph),
            rainfall: Some(s.rainfall),
        }
    }
}

impl SoilForm {
    /// Complete form into a sample, naming every blank field
    pub fn complete(&self) -> Result<SoilSample> {
        let fields = [
            self.nitrogen,
            self.phosphorus,
            self.potassium,
            self.temperature,
            self.humidity,
            self.ph,
            self.rainfall,
        ];
        let missing: Vec<&str> = SOIL_COLUMNS
            .iter()
            .zip(fields)
            .filter(|(_, v)| v.is_none())
            .map(|(c, _)| *c)
            .collect();
        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "Soil form incomplete, missing: {}",
                missing.join(", ")
            )));
        }

        let [n, p, k, t, h, ph, r] = fields.map(|v| v.unwrap_or_default());
        let sample = SoilSample {
            nitrogen: n,
            phosphorus: p,
            potassium: k,
            temperature: t,
            humidity: h,
            ph,
            rainfall: r,
        };
        sample.validate()?;
        Ok(sample)
    }
}

/// Body of the scoring request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringRequest {
    pub input_data: ScoringFrame,
}

/// Pandas-style split frame with a single row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringFrame {
    pub columns: Vec<String>,
    pub index: Vec<u32>,
    pub data: Vec<Vec<f64>>,
}
