//! HTTP layer shared by all provider adapters
//!
//! Owns the pooled [`reqwest`] client, request-id correlation and the mapping
//! from HTTP statuses to [`LlmError`](crate::error::LlmError) classes.

pub mod client;
pub mod error;

pub use client::HttpClient;
pub use error::{extract_error_message, map_http_error};

use crate::error::{LlmError, LlmResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Build a header map from static names and dynamic values.
///
/// Values that are not valid header text (e.g. a credential containing a
/// newline) are rejected as configuration errors.
pub fn build_headers<'a, I>(pairs: I) -> LlmResult<HeaderMap>
where
    I: IntoIterator<Item = (&'static str, &'a str)>,
{
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let value = HeaderValue::from_str(value).map_err(|_| {
            LlmError::Configuration(format!("Invalid value for header '{}'", name))
        })?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(headers)
}
