// crates/geodata-scan/src/client.rs
// ============================================================================
// Module: HTTP Scan Client
// Description: Attachment scanner submitting file content over HTTP.
// Purpose: Bridge the engine's scan seam to an external scanning service.
// Dependencies: geodata-core, reqwest, serde, serde_json, url
// ============================================================================

//! ## Overview
//! The HTTP scan client submits uploaded attachment content to a scanning
//! service and maps the response onto the engine's scan verdicts. Requests
//! carry a hard timeout; any transport failure, timeout, or unparseable
//! response reports the collaborator as unavailable so the engine's
//! soft-fail policy decides the outcome. Redirects are never followed.
//! Security posture: uploaded content is untrusted and is forwarded as an
//! opaque body, never interpreted here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use geodata_core::UploadMeta;
use geodata_core::interfaces::AttachmentScanner;
use geodata_core::interfaces::ScanError;
use geodata_core::interfaces::ScanVerdict;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Configuration for the HTTP scan client.
///
/// # Invariants
/// - `allow_http = false` blocks cleartext `http://` endpoints.
/// - `timeout_ms` bounds the full request lifecycle, including the body
///   upload and the verdict read.
/// - URLs with embedded credentials are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpScannerConfig {
    /// Scan endpoint URL.
    pub url: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Allow cleartext HTTP endpoints (disabled by default).
    #[serde(default)]
    pub allow_http: bool,
}

/// Returns the default scan request timeout.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Scan client construction errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ScanClientError {
    /// Endpoint URL does not parse.
    #[error("invalid scan endpoint url: {0}")]
    InvalidUrl(String),
    /// Endpoint URL uses a scheme the policy rejects.
    #[error("unsupported scan endpoint scheme: {0}")]
    UnsupportedScheme(String),
    /// Underlying HTTP client could not be built.
    #[error("scan client build failed")]
    ClientBuild,
}

// ============================================================================
// SECTION: Wire Format
// ============================================================================

/// Verdict document returned by the scanning service.
///
/// `status` is `clean` or `infected`; `signature` names the detection for
/// infected files when the service knows it.
#[derive(Debug, Deserialize)]
struct VerdictDoc {
    /// Verdict status string.
    status: String,
    /// Detection signature for infected files.
    #[serde(default)]
    signature: Option<String>,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Attachment scanner backed by an HTTP scanning service.
///
/// # Invariants
/// - Every request finishes within the configured timeout.
/// - Only `clean` and `infected` responses produce verdicts; everything
///   else reports the collaborator unavailable.
pub struct HttpScanner {
    /// Validated scan endpoint.
    endpoint: Url,
    /// HTTP client with timeout and redirect policy applied.
    client: Client,
}

impl HttpScanner {
    /// Creates a scan client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScanClientError`] when the endpoint URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &HttpScannerConfig) -> Result<Self, ScanClientError> {
        let endpoint = Url::parse(&config.url)
            .map_err(|_| ScanClientError::InvalidUrl(config.url.clone()))?;
        match endpoint.scheme() {
            "https" => {}
            "http" if config.allow_http => {}
            other => return Err(ScanClientError::UnsupportedScheme(other.to_string())),
        }
        if !endpoint.username().is_empty() || endpoint.password().is_some() {
            return Err(ScanClientError::InvalidUrl(config.url.clone()));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(Policy::none())
            .build()
            .map_err(|_| ScanClientError::ClientBuild)?;
        Ok(Self {
            endpoint,
            client,
        })
    }
}

impl AttachmentScanner for HttpScanner {
    fn scan(&self, upload: &UploadMeta) -> Result<ScanVerdict, ScanError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-filename", sanitized_filename(&upload.file_name))
            .body(upload.content.clone())
            .send()
            .map_err(|error| {
                if error.is_timeout() {
                    ScanError::Unavailable("scan request timed out".to_string())
                } else {
                    ScanError::Unavailable("scan request failed".to_string())
                }
            })?;
        if !response.status().is_success() {
            return Err(ScanError::Unavailable(format!(
                "scan service returned status {}",
                response.status().as_u16()
            )));
        }
        let body = response
            .text()
            .map_err(|_| ScanError::Unavailable("unreadable scan response".to_string()))?;
        let doc: VerdictDoc = serde_json::from_str(&body)
            .map_err(|_| ScanError::Unavailable("unparseable scan response".to_string()))?;
        match doc.status.as_str() {
            "clean" => Ok(ScanVerdict::Clean),
            "infected" => Ok(ScanVerdict::Infected {
                signature: doc.signature.unwrap_or_else(|| "unknown".to_string()),
            }),
            other => Err(ScanError::Unavailable(format!("unknown scan status: {other}"))),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Strips header-breaking characters from a client-supplied file name.
fn sanitized_filename(name: &str) -> String {
    name.chars().filter(|ch| !ch.is_control() && ch.is_ascii()).collect()
}
