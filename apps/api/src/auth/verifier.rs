//! Identity-provider ID token verification.
//!
//! Firebase ID tokens are RS256 JWTs. The signing keys are published as a JWK
//! set and rotate; the set is cached until the `Cache-Control: max-age` of the
//! response that delivered it runs out.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::AppError;

const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);
/// An unknown `kid` only triggers a refetch once the cached set is this old.
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

/// Identity asserted by a verified token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityClaims {
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("token rejected: {0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),

    #[error("no signing key matches kid '{0}'")]
    UnknownKey(String),

    #[error("token carries no email")]
    MissingEmail,

    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(String),
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::KeyFetch(msg) => AppError::Identity(msg),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

/// Verifies bearer tokens. Carried in `AppState` as `Arc<dyn TokenVerifier>`.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, VerifyError>;
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

pub struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
    expires_at: Instant,
}

impl CachedKeys {
    pub fn new(keys: JwkSet, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            keys,
            fetched_at: now,
            expires_at: now + ttl,
        }
    }

    /// `None` when the set should be refetched: it is expired, or `kid` is
    /// missing and the set is old enough that the keys may have rotated.
    fn lookup(&self, kid: &str) -> Option<Result<DecodingKey, VerifyError>> {
        let now = Instant::now();
        if self.expires_at <= now {
            return None;
        }
        match self.keys.find(kid) {
            Some(jwk) => Some(DecodingKey::from_jwk(jwk).map_err(VerifyError::from)),
            None if now.duration_since(self.fetched_at) < MIN_REFETCH_INTERVAL => {
                Some(Err(VerifyError::UnknownKey(kid.to_string())))
            }
            None => None,
        }
    }
}

/// Where signing keys come from.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self) -> Result<CachedKeys, VerifyError>;
}

/// Google's published JWK set for Firebase ID tokens.
pub struct GoogleKeySource {
    http: reqwest::Client,
}

#[async_trait]
impl KeySource for GoogleKeySource {
    async fn fetch(&self) -> Result<CachedKeys, VerifyError> {
        debug!("Fetching identity provider signing keys");
        let response = self
            .http
            .get(FIREBASE_JWKS_URL)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))?;

        let ttl = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_KEY_TTL);

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))?;

        info!("Loaded {} signing keys (ttl {}s)", keys.keys.len(), ttl.as_secs());
        Ok(CachedKeys::new(keys, ttl))
    }
}

pub struct FirebaseTokenVerifier {
    source: Box<dyn KeySource>,
    project_id: String,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseTokenVerifier {
    pub fn new(project_id: String) -> Self {
        Self::with_key_source(
            project_id,
            Box::new(GoogleKeySource {
                http: reqwest::Client::new(),
            }),
        )
    }

    pub fn with_key_source(project_id: String, source: Box<dyn KeySource>) -> Self {
        Self {
            source,
            project_id,
            keys: RwLock::new(None),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);
        validation
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        if let Some(found) = self.keys.read().await.as_ref().and_then(|c| c.lookup(kid)) {
            return found;
        }

        // One fetch at a time; whoever waited re-checks what the winner stored.
        let mut cached = self.keys.write().await;
        if let Some(found) = cached.as_ref().and_then(|c| c.lookup(kid)) {
            return found;
        }
        let fresh = self.source.fetch().await?;
        let key = match fresh.keys.find(kid) {
            Some(jwk) => DecodingKey::from_jwk(jwk).map_err(VerifyError::from),
            None => Err(VerifyError::UnknownKey(kid.to_string())),
        };
        *cached = Some(fresh);
        key
    }
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, VerifyError> {
        let header = decode_header(token)?;
        let kid = header
            .kid
            .ok_or_else(|| VerifyError::Malformed("missing kid header".to_string()))?;

        let key = self.decoding_key(&kid).await?;
        let data = decode::<FirebaseClaims>(token, &key, &self.validation())?;
        claims_to_identity(data.claims)
    }
}

fn claims_to_identity(claims: FirebaseClaims) -> Result<IdentityClaims, VerifyError> {
    if claims.sub.trim().is_empty() {
        return Err(VerifyError::Malformed("empty subject".to_string()));
    }
    let email = claims
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or(VerifyError::MissingEmail)?;
    Ok(IdentityClaims {
        uid: claims.sub,
        email,
        name: claims.name.filter(|n| !n.trim().is_empty()),
    })
}

/// Extracts `max-age` seconds from a `Cache-Control` header value.
fn parse_max_age(header: &str) -> Option<u64> {
    header
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|v| v.trim().parse().ok())
}
