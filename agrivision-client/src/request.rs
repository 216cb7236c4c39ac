//! Request and response shapes of a single dispatch

use crate::image::ImageFile;
use agrivision_common::soil::SoilSample;
use agrivision_common::types::VisionResponse;
use agrivision_common::{normalize, CropRecommendation, Error, Mode, NormalizedResult, Result};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// What the user submitted
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    File(Arc<ImageFile>),
    /// Checked against the dispatcher's URL policy before sending
    Url(String),
    Soil(SoilSample),
}

impl Input {
    pub fn kind(&self) -> &'static str {
        match self {
            Input::File(_) => "file",
            Input::Url(_) => "url",
            Input::Soil(_) => "soil",
        }
    }
}

/// Everything needed for one dispatch, dropped once it completes
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Log correlation only
    pub id: Uuid,
    pub input: Input,
    pub mode: Mode,
}

impl RequestContext {
    pub fn new(input: Input, mode: Mode) -> Self {
        Self {
            id: Uuid::new_v4(),
            input,
            mode,
        }
    }
}

/// Backend answer before normalization
#[derive(Debug, Clone)]
pub enum RawResponse {
    Vision(VisionResponse),
    Crop(CropRecommendation),
}

/// Display-ready result of a dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "lowercase")]
pub enum Outcome {
    Vision(Vec<NormalizedResult>),
    Crop(CropRecommendation),
}

impl Outcome {
    /// Normalize a raw response; a vision body without `predictions` is a parse error
    pub fn from_raw(raw: RawResponse) -> Result<Self> {
        match raw {
            RawResponse::Vision(body) => {
                let candidates = body
                    .predictions
                    .ok_or_else(|| Error::parse("Vision API", "missing `predictions` array"))?;
                Ok(Outcome::Vision(normalize(&candidates)))
            }
            RawResponse::Crop(rec) => Ok(Outcome::Crop(rec)),
        }
    }

    /// Label to ask the advisory chat about
    pub fn top_label(&self) -> Option<&str> {
        match self {
            Outcome::Vision(results) => results.first().map(|r| r.name.as_str()),
            Outcome::Crop(rec) => Some(rec.name.as_str()),
        }
    }
}
