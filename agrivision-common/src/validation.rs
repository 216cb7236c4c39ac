//! Image URL validation
//!
//! One canonical rule: the text must parse as an absolute URL and its scheme
//! must be on the allow-list. `http` and `https` are always allowed; `data`
//! only when the policy opts in.

use crate::error::{Error, Result};
use url::Url;

/// Message shown when neither a file nor a usable URL is present
pub const NO_INPUT_MESSAGE: &str = "Please select a file or enter a valid URL.";

/// Scheme allow-list for image URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UrlPolicy {
    pub allow_data: bool,
}

impl UrlPolicy {
    pub fn new(allow_data: bool) -> Self {
        Self { allow_data }
    }

    /// Whitespace-trimmed URL if it passes, `None` otherwise
    pub fn accept(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let parsed = Url::parse(trimmed).ok()?;
        let allowed = match parsed.scheme() {
            "http" | "https" => parsed.has_host(),
            "data" => self.allow_data,
            _ => false,
        };
        allowed.then(|| trimmed.to_string())
    }

    pub fn is_valid(&self, raw: &str) -> bool {
        self.accept(raw).is_some()
    }

    /// Like [`accept`](Self::accept) but with a user-facing error
    pub fn validate(&self, raw: &str) -> Result<String> {
        self.accept(raw).ok_or_else(|| {
            let schemes = if self.allow_data {
                "http://, https:// or data:"
            } else {
                "http:// or https://"
            };
            Error::Validation(format!("Image URL must start with {}", schemes))
        })
    }
}
