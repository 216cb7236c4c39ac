//! Test Helper Utilities
//!
//! Shared utilities for testing agrivision-client

#![allow(dead_code)]

pub mod backend;

pub use backend::{unreachable_url, Backend, Reply, Seen};

use agrivision_common::config::Endpoints;
use std::time::Duration;

/// Endpoints pointing every service at `backend`
pub fn endpoints_for(backend: &Backend) -> Endpoints {
    Endpoints {
        local_vision_url: backend.url.clone(),
        cloud_vision_url: format!("{}/cloud", backend.url),
        prediction_key: Some("test-key".to_string()),
        scoring_url: format!("{}/score", backend.url),
        scoring_token: Some("test-token".to_string()),
        chat_url: backend.url.clone(),
        timeout: Duration::from_secs(5),
        ..Endpoints::default()
    }
}

/// Smallest byte sequence recognised as PNG
pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D]
}
