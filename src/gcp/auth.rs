//! GCP Authentication
//!
//! Resolves an authenticated [`CredentialContext`] per project using a service
//! account key, Application Default Credentials (ADC), or gcloud CLI
//! credentials. Resolved contexts are cached for the process lifetime and
//! dropped explicitly when the provider rejects them.

use crate::error::AuthError;
use async_trait::async_trait;
use gcp_auth::TokenProvider;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell, RwLock};

/// Default scopes for GCP API access
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Token expiry buffer - refresh tokens this much before they actually expire
/// This prevents using tokens that are about to expire during a request
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Something that can hand out bearer tokens
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// Authenticated handle for one project
///
/// Cheap to clone; every clone shares the same token source.
#[derive(Clone)]
pub struct CredentialContext {
    project_id: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl CredentialContext {
    pub fn new(project_id: &str, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self {
            project_id: project_id.to_string(),
            tokens,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Get the current access token
    pub async fn access_token(&self) -> Result<String, AuthError> {
        self.tokens.access_token().await
    }

    /// True when both handles came from the same resolution
    pub fn same_resolution(&self, other: &CredentialContext) -> bool {
        Arc::ptr_eq(&self.tokens, &other.tokens)
    }
}

impl std::fmt::Debug for CredentialContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialContext")
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// gcp_auth backed tokens
// =============================================================================

/// GCP credentials holder with token caching
#[derive(Clone)]
pub struct GcpCredentials {
    provider: Arc<dyn TokenProvider>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
    timeout: Duration,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    /// Check if this cached token is still valid
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl GcpCredentials {
    pub fn from_provider(provider: Arc<dyn TokenProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            token_cache: Arc::new(RwLock::new(None)),
            timeout,
        }
    }
}

#[async_trait]
impl AccessTokenSource for GcpCredentials {
    /// Security: Checks token expiry before returning cached token
    async fn access_token(&self) -> Result<String, AuthError> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = tokio::time::timeout(self.timeout, self.provider.token(DEFAULT_SCOPES))
            .await
            .map_err(|_| {
                AuthError::Unreachable(format!(
                    "token request timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| classify_token_error(&e))?;

        let token_str = token.as_str().to_string();

        // gcp_auth exposes expiry as a DateTime; a conservative TTL keeps this simple
        let expires_at = Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token_str.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            (DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token_str)
    }
}

/// Fixed bearer token (`--access-token`), never refreshed
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

/// Transport failures some HTTP stacks only report as text
const UNREACHABLE_PHRASES: &[&str] = &[
    "connection refused",
    "connection reset",
    "error trying to connect",
    "dns error",
    "failed to lookup address",
    "timed out",
];

/// Tell "could not reach the token endpoint" apart from "endpoint said no"
///
/// Typed errors in the source chain decide first; message text is only
/// consulted when no layer is a known transport error.
fn classify_token_error(err: &(dyn std::error::Error + 'static)) -> AuthError {
    let chain = || std::iter::successors(Some(err), |e| e.source());

    let typed = chain().any(|e| {
        e.downcast_ref::<std::io::Error>().is_some()
            || e.downcast_ref::<tokio::time::error::Elapsed>().is_some()
            || e.downcast_ref::<reqwest::Error>()
                .map(|r| r.is_connect() || r.is_timeout())
                .unwrap_or(false)
    });
    let described = chain().any(|e| {
        let text = e.to_string().to_lowercase();
        UNREACHABLE_PHRASES.iter().any(|phrase| text.contains(phrase))
    });

    if typed || described {
        AuthError::Unreachable(err.to_string())
    } else {
        AuthError::Rejected(err.to_string())
    }
}

// =============================================================================
// Credential sources
// =============================================================================

/// Produces a fresh token source for a project
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn load(&self, project_id: &str) -> Result<Arc<dyn AccessTokenSource>, AuthError>;
}

/// Discovery: configured key file, `GOOGLE_APPLICATION_CREDENTIALS`, the
/// gcloud ADC file, then the `gcp_auth` default chain (metadata server,
/// gcloud CLI).
pub struct AdcSource {
    credentials_file: Option<PathBuf>,
    timeout: Duration,
}

impl AdcSource {
    pub fn new(credentials_file: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            credentials_file,
            timeout,
        }
    }

    fn key_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.credentials_file {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS") {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        adc_well_known_file().filter(|p| p.exists())
    }
}

#[async_trait]
impl CredentialSource for AdcSource {
    async fn load(&self, project_id: &str) -> Result<Arc<dyn AccessTokenSource>, AuthError> {
        let provider = match self.key_file() {
            Some(path) => {
                tracing::info!("Using credentials file at: {:?}", path);
                load_key_file(&path).await?
            },
            None => gcp_auth::provider().await.map_err(|e| {
                AuthError::MissingSource(format!(
                    "{}. Set GOOGLE_APPLICATION_CREDENTIALS or run 'gcloud auth application-default login'",
                    e
                ))
            })?,
        };

        let credentials = GcpCredentials::from_provider(provider, self.timeout);
        // Fetch once so broken credentials surface at resolution time
        credentials.access_token().await?;
        tracing::debug!("Credentials resolved for project {}", project_id);

        Ok(Arc::new(credentials))
    }
}

async fn load_key_file(path: &Path) -> Result<Arc<dyn TokenProvider>, AuthError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AuthError::MissingSource(format!(
                "credentials file not found at: {}",
                path.display()
            )));
        },
        Err(e) => {
            return Err(AuthError::Malformed(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )));
        },
    };

    let parsed: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| AuthError::Malformed(format!("{} is not valid JSON: {}", path.display(), e)))?;

    match parsed.get("type").and_then(|v| v.as_str()) {
        Some("service_account") => {
            let account = gcp_auth::CustomServiceAccount::from_json(&content)
                .map_err(|e| AuthError::Malformed(e.to_string()))?;
            Ok(Arc::new(account))
        },
        // authorized_user / external_account files are handled by the default chain
        Some(_) => gcp_auth::provider()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string())),
        None => Err(AuthError::Malformed(format!(
            "{} has no credential 'type' field",
            path.display()
        ))),
    }
}

/// Hands every project the same fixed token
pub struct StaticTokenSource {
    token: StaticToken,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: StaticToken::new(token),
        }
    }
}

#[async_trait]
impl CredentialSource for StaticTokenSource {
    async fn load(&self, _project_id: &str) -> Result<Arc<dyn AccessTokenSource>, AuthError> {
        if self.token.0.trim().is_empty() {
            return Err(AuthError::Malformed("access token is empty".to_string()));
        }
        Ok(Arc::new(self.token.clone()))
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Per-project credential cache
///
/// Concurrent resolutions for the same project share one in-flight load.
/// A failed load leaves nothing cached, so the next call tries again.
pub struct CredentialResolver {
    source: Arc<dyn CredentialSource>,
    cache: Mutex<HashMap<String, Arc<OnceCell<CredentialContext>>>>,
}

impl CredentialResolver {
    pub fn new(source: Arc<dyn CredentialSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, project_id: &str) -> Result<CredentialContext, AuthError> {
        let cell = {
            let mut cache = self.cache.lock().await;
            cache
                .entry(project_id.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let context = cell
            .get_or_try_init(|| async {
                tracing::debug!("Resolving credentials for project {}", project_id);
                let tokens = self.source.load(project_id).await?;
                Ok::<_, AuthError>(CredentialContext::new(project_id, tokens))
            })
            .await?;

        Ok(context.clone())
    }

    /// Forget the cached context; the next `resolve` loads it again
    pub async fn invalidate(&self, project_id: &str) {
        let removed = self.cache.lock().await.remove(project_id);
        if removed.is_some() {
            tracing::warn!("Invalidated cached credentials for project {}", project_id);
        }
    }

    /// Forget the cached context only if it is still `stale`
    ///
    /// A context resolved after `stale` was handed out is left alone.
    pub async fn invalidate_if_same(&self, stale: &CredentialContext) -> bool {
        let project_id = stale.project_id();
        let mut cache = self.cache.lock().await;
        let current = cache
            .get(project_id)
            .and_then(|cell| cell.get())
            .map(|ctx| ctx.same_resolution(stale))
            .unwrap_or(false);
        if current {
            cache.remove(project_id);
            tracing::warn!("Invalidated cached credentials for project {}", project_id);
        }
        current
    }

    pub async fn is_cached(&self, project_id: &str) -> bool {
        self.cache
            .lock()
            .await
            .get(project_id)
            .map(|cell| cell.initialized())
            .unwrap_or(false)
    }
}

/// Get the gcloud configuration directory
pub fn get_gcloud_config_dir() -> Option<PathBuf> {
    // Check CLOUDSDK_CONFIG environment variable first
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }

    // Default to ~/.config/gcloud on Linux/macOS
    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// File written by `gcloud auth application-default login`
pub fn adc_well_known_file() -> Option<PathBuf> {
    get_gcloud_config_dir().map(|dir| dir.join("application_default_credentials.json"))
}
