//! Shared identifiers and error types for Turnstile

use std::fmt;
use std::str::FromStr;

use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a post, assigned at creation and immutable after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub Uuid);

impl PostId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PostId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identifier of a user, established by the fronting authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Main error type for Turnstile operations
#[derive(Debug, thiserror::Error)]
pub enum TurnstileError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Post not found: {0}")]
    NotFound(String),

    #[error("Claim window has not opened yet")]
    NotYetOpen,

    #[error("Claim window has closed")]
    Closed,

    #[error("User already holds a claim on this post")]
    AlreadyClaimed,

    #[error("All slots are taken")]
    QuotaFull,

    #[error("User holds no claim on this post")]
    NotClaimed,

    #[error("Post owners cannot claim their own post")]
    OwnerCannotClaim,

    #[error("Too many requests: {0}")]
    RateLimited(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TurnstileError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotYetOpen => StatusCode::CONFLICT,
            Self::Closed => StatusCode::CONFLICT,
            Self::AlreadyClaimed => StatusCode::CONFLICT,
            Self::QuotaFull => StatusCode::CONFLICT,
            Self::NotClaimed => StatusCode::CONFLICT,
            Self::OwnerCannotClaim => StatusCode::FORBIDDEN,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::NotYetOpen => "NOT_YET_OPEN",
            Self::Closed => "CLOSED",
            Self::AlreadyClaimed => "ALREADY_CLAIMED",
            Self::QuotaFull => "QUOTA_FULL",
            Self::NotClaimed => "NOT_CLAIMED",
            Self::OwnerCannotClaim => "OWNER_CANNOT_CLAIM",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Internal(_) => "INTERNAL",
            Self::Config(_) => "CONFIG",
        }
    }
}

impl From<std::io::Error> for TurnstileError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for TurnstileError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for TurnstileError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

/// Result type alias for Turnstile operations
pub type Result<T> = std::result::Result<T, TurnstileError>;
