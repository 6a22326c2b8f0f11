//! src/error.rs
//! ============================================================================
//! # `ExplorerError`: Unified Error Type for the Photo Drive client
//!
//! Every command surfaced to a view returns `ExplorerResult<T>`. Variants are
//! grouped by the failure taxonomy the explorer reports to its caller:
//! validation, network, upload, registration. The type is `Clone` so a single
//! coalesced cache load can hand the same error to every waiting caller.

use std::fmt;

use thiserror::Error;

/// Convenient alias carrying the unified error type
pub type ExplorerResult<T> = Result<T, ExplorerError>;

/// Unified error type for explorer, cache and collaborator operations.
#[non_exhaustive]
#[derive(Debug, Clone, Error)]
pub enum ExplorerError {
    // ────────────────────────────────────────────────────────────
    // Input validation (rejected before any network call)
    // ────────────────────────────────────────────────────────────
    #[error("Invalid input: {field} - {message}")]
    Validation { field: String, message: String },

    // ────────────────────────────────────────────────────────────
    // Remote resource client
    // ────────────────────────────────────────────────────────────
    /// Transport failure or 5xx response.
    #[error("Network failure: {reason}")]
    Network { reason: String },

    /// 401/403 class response. Never retried by the core.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Any other non-success status returned by the server.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Response body could not be decoded.
    #[error("Malformed response: {reason}")]
    Decode { reason: String },

    // ────────────────────────────────────────────────────────────
    // Image upload pipeline
    // ────────────────────────────────────────────────────────────
    /// The media host refused or failed the binary upload.
    #[error("Media upload failed: {reason}")]
    Upload { reason: String },

    /// The binary reached the media host but the image record was not
    /// registered. `public_id` names the orphaned remote asset.
    #[error("Image registration failed for media asset '{public_id}': {source}")]
    Registration {
        public_id: String,
        #[source]
        source: Box<ExplorerError>,
    },

    // ────────────────────────────────────────────────────────────
    // Ambient
    // ────────────────────────────────────────────────────────────
    /// Caching layer error.
    #[error("Cache error: {reason}")]
    Cache { reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// Any other error, with description.
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl ExplorerError {
    /// Create an input validation error
    pub fn validation<S1: Into<String>, S2: Into<String>>(field: S1, message: S2) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a network failure error
    pub fn network<S: fmt::Display>(reason: S) -> Self {
        Self::Network {
            reason: reason.to_string(),
        }
    }

    /// Create a media upload failure error
    pub fn upload<S: fmt::Display>(reason: S) -> Self {
        Self::Upload {
            reason: reason.to_string(),
        }
    }

    /// Wrap a failure that happened after the media asset was stored
    pub fn registration<S: Into<String>>(public_id: S, source: Self) -> Self {
        Self::Registration {
            public_id: public_id.into(),
            source: Box::new(source),
        }
    }

    /// Create a decode error
    pub fn decode<S: fmt::Display>(reason: S) -> Self {
        Self::Decode {
            reason: reason.to_string(),
        }
    }

    #[must_use]
    /// Attach extra context to an error.
    pub fn with_context<S: Into<String>>(self, ctx: S) -> Self {
        Self::Other(format!("{}: {}", ctx.into(), self))
    }

    /// True when the session is gone, including a registration step that
    /// failed because of it.
    #[must_use]
    pub fn is_not_authenticated(&self) -> bool {
        match self {
            Self::NotAuthenticated => true,
            Self::Registration { source, .. } => source.is_not_authenticated(),
            _ => false,
        }
    }

    /// Determine whether re-invoking the same command may succeed
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Upload { .. } | Self::Validation { .. } => true,
            Self::Registration { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    /// Short label used to group errors in structured logs
    #[must_use]
    pub const fn operation_type(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "input_validation",
            Self::Network { .. } | Self::Decode { .. } => "remote_transport",
            Self::NotAuthenticated => "authentication",
            Self::Rejected { .. } => "remote_rejected",
            Self::Upload { .. } => "media_upload",
            Self::Registration { .. } => "image_registration",
            Self::Cache { .. } => "cache",
            Self::Config { .. } => "configuration",
            Self::Other(_) => "other",
        }
    }
}

impl From<reqwest::Error> for ExplorerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::decode(e)
        } else {
            Self::network(e)
        }
    }
}

impl From<serde_json::Error> for ExplorerError {
    fn from(e: serde_json::Error) -> Self {
        Self::decode(e)
    }
}

// Allow conversion from `anyhow::Error` as fallback.
impl From<anyhow::Error> for ExplorerError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(e.to_string())
    }
}
