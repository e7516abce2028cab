//! Error taxonomy
//!
//! Every failure a tool can produce ends up as one [`ToolError`], which maps
//! onto exactly one stable [`ErrorKind`] identifier.

use serde::Serialize;
use thiserror::Error;

/// Stable error identifiers returned to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    AuthError,
    PermissionDenied,
    NotFound,
    AlreadyExists,
    UpstreamError,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::AuthError => "auth_error",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::UpstreamError => "upstream_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication failures, split by who has to act on them
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No credential source could be found
    #[error("no credentials found: {0}")]
    MissingSource(String),

    /// A credential source exists but its contents are unusable
    #[error("malformed credentials: {0}")]
    Malformed(String),

    /// The provider refused the credentials (expired, revoked, wrong audience)
    #[error("credentials rejected by provider: {0}")]
    Rejected(String),

    /// The token endpoint could not be reached
    #[error("authentication endpoint unreachable: {0}")]
    Unreachable(String),
}

impl AuthError {
    pub fn sub_kind(&self) -> &'static str {
        match self {
            Self::MissingSource(_) => "missing_source",
            Self::Malformed(_) => "malformed",
            Self::Rejected(_) => "rejected",
            Self::Unreachable(_) => "unreachable",
        }
    }
}

/// Argument validation failure naming the offending field
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid value for '{field}': {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::new(field, "required field is missing")
    }
}

/// Failure reported by the cloud provider client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected provider response: {0}")]
    Unexpected(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Any failure of a tool invocation
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Input accepted locally but refused by the provider as malformed
    #[error("request rejected: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::AuthError,
            Self::Validation(_) | Self::InvalidRequest(_) => ErrorKind::InvalidInput,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::AlreadyExists,
            Self::Upstream(_) => ErrorKind::UpstreamError,
            Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Whether the provider refused the credentials of a cached context
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self, Self::Auth(AuthError::Rejected(_)))
    }
}

impl From<ProviderError> for ToolError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::BadRequest(m) => Self::InvalidRequest(m),
            ProviderError::Unauthenticated(m) => Self::Auth(AuthError::Rejected(m)),
            ProviderError::PermissionDenied(m) => Self::PermissionDenied(m),
            ProviderError::NotFound(m) => Self::NotFound(m),
            ProviderError::Conflict(m) => Self::Conflict(m),
            ProviderError::Unavailable(m) => Self::Upstream(m),
            ProviderError::Unexpected(m) => Self::Internal(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_identifiers_are_stable() {
        assert_eq!(ErrorKind::InvalidInput.as_str(), "invalid_input");
        assert_eq!(ErrorKind::AlreadyExists.as_str(), "already_exists");
        assert_eq!(
            serde_json::to_value(ErrorKind::UpstreamError).unwrap(),
            "upstream_error"
        );
    }

    #[test]
    fn test_provider_errors_map_to_taxonomy() {
        let cases = [
            (ProviderError::BadRequest("x".into()), ErrorKind::InvalidInput),
            (ProviderError::Unauthenticated("x".into()), ErrorKind::AuthError),
            (ProviderError::PermissionDenied("x".into()), ErrorKind::PermissionDenied),
            (ProviderError::NotFound("x".into()), ErrorKind::NotFound),
            (ProviderError::Conflict("x".into()), ErrorKind::AlreadyExists),
            (ProviderError::Unavailable("x".into()), ErrorKind::UpstreamError),
            (ProviderError::Unexpected("x".into()), ErrorKind::InternalError),
        ];
        for (err, kind) in cases {
            assert_eq!(ToolError::from(err).kind(), kind);
        }
    }

    #[test]
    fn test_unauthenticated_is_credential_rejection() {
        let err = ToolError::from(ProviderError::Unauthenticated("expired".into()));
        assert!(err.is_credential_rejection());
        assert!(!ToolError::from(AuthError::MissingSource("none".into())).is_credential_rejection());
    }
}
