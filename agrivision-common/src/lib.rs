//! # AgriVision Common Library
//!
//! Shared code for the AgriVision client crates:
//! - Prediction data model and the result normalizer
//! - Crop-recommendation response decoding and soil payloads
//! - Image URL validation
//! - Credential verification
//! - Configuration loading
//! - Error type

pub mod auth;
pub mod config;
pub mod crop;
pub mod error;
pub mod normalize;
pub mod soil;
pub mod types;
pub mod validation;

pub use error::{Error, Result};
pub use normalize::normalize;
pub use types::{
    AdviceTranscript, ChatTurn, CropRecommendation, Mode, NormalizedResult, PredictionCandidate,
};
