//! API key generation, hashing and verification.
//!
//! Every key is stored twice, neither time in plaintext:
//! - a SHA-256 **lookup digest**, deterministic, used only to find the row
//! - an Argon2id **hash** with a random salt, used to prove possession
//!
//! A digest match alone never authenticates a request.

use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::{
    error::AppError,
    models::api_key::{ApiKey, NewApiKey},
    store::Repository,
};

/// Every generated key starts with this prefix.
pub const KEY_PREFIX: &str = "swip_";

/// Random bytes per key (256 bits of entropy).
const KEY_RANDOM_BYTES: usize = 32;

/// Total key length: prefix plus two hex characters per random byte.
pub const KEY_LENGTH: usize = KEY_PREFIX.len() + KEY_RANDOM_BYTES * 2;

#[derive(Debug, thiserror::Error)]
pub enum KeyHashError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),

    #[error("hashing failed: {0}")]
    Hash(String),

    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Generate a new plaintext API key.
///
/// # Output
///
/// `swip_` followed by 64 lowercase hex characters (32 random bytes)
pub fn generate() -> String {
    let bytes: [u8; KEY_RANDOM_BYTES] = rand::random();
    format!("{KEY_PREFIX}{}", hex::encode(bytes))
}

/// Whether `candidate` has the shape of a generated key.
pub fn is_valid_format(candidate: &str) -> bool {
    candidate.len() == KEY_LENGTH
        && candidate
            .strip_prefix(KEY_PREFIX)
            .is_some_and(|body| body.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')))
}

/// SHA-256 hex digest of the key, used as the index column.
pub fn lookup_digest(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Argon2id work factor. `None` fields fall back to the argon2 crate defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashParams {
    pub memory_kib: Option<u32>,
    pub iterations: Option<u32>,
    pub parallelism: Option<u32>,
}

/// Slow, salted key hashing.
///
/// Hashing and verification are CPU-bound (tens of milliseconds with the
/// default parameters), so the async entry points move them onto the blocking
/// thread pool.
#[derive(Clone)]
pub struct KeyHasher {
    argon: Arc<Argon2<'static>>,
}

impl KeyHasher {
    pub fn new(params: HashParams) -> Result<Self, KeyHashError> {
        let params = Params::new(
            params.memory_kib.unwrap_or(Params::DEFAULT_M_COST),
            params.iterations.unwrap_or(Params::DEFAULT_T_COST),
            params.parallelism.unwrap_or(Params::DEFAULT_P_COST),
            None,
        )
        .map_err(|e| KeyHashError::Params(e.to_string()))?;

        Ok(Self {
            argon: Arc::new(Argon2::new(Algorithm::Argon2id, Version::V0x13, params)),
        })
    }

    /// Hash `secret` with a fresh salt, returning a PHC string.
    pub fn hash(&self, secret: &str) -> Result<String, KeyHashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| KeyHashError::Hash(e.to_string()))
    }

    /// Check `secret` against a stored PHC string.
    ///
    /// The parameters embedded in `hash` are used, so keys hashed under an
    /// older work factor keep verifying. A malformed hash never verifies.
    pub fn verify(&self, secret: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "stored api key hash is malformed");
                false
            }
        }
    }

    pub async fn hash_blocking(&self, secret: String) -> Result<String, KeyHashError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&secret)).await?
    }

    pub async fn verify_blocking(&self, secret: String, hash: String) -> Result<bool, KeyHashError> {
        let hasher = self.clone();
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&secret, &hash)).await?)
    }
}

/// Create and store a key for `app_id`, returning the row and the plaintext
/// key. The plaintext is not recoverable afterwards.
pub async fn issue_api_key(
    repo: &dyn Repository,
    hasher: &KeyHasher,
    app_id: &str,
) -> Result<(ApiKey, String), AppError> {
    if !repo.app_exists(app_id).await? {
        return Err(AppError::AppNotFound);
    }

    let secret = generate();
    let key_hash = hasher.hash_blocking(secret.clone()).await?;

    let key = repo
        .insert_api_key(NewApiKey {
            app_id: app_id.to_string(),
            key_hash,
            lookup_digest: lookup_digest(&secret),
        })
        .await?;

    tracing::info!(app_id = %key.app_id, key_id = %key.id, "api key issued");
    Ok((key, secret))
}

/// Resolve a presented key to its stored record.
///
/// # Flow
///
/// 1. Reject keys that are not shaped like generated keys (no DB work)
/// 2. Find the non-revoked row by lookup digest
/// 3. Verify the key against the row's Argon2id hash
/// 4. Record `last_used_at` in the background
///
/// Every failure is `InvalidApiKey`, so callers cannot tell an unknown key from
/// a revoked or forged one.
pub async fn resolve_api_key(
    repo: Arc<dyn Repository>,
    hasher: &KeyHasher,
    presented: &str,
) -> Result<ApiKey, AppError> {
    if !is_valid_format(presented) {
        return Err(AppError::InvalidApiKey);
    }

    let record = repo
        .find_active_key_by_digest(&lookup_digest(presented))
        .await?
        .ok_or(AppError::InvalidApiKey)?;

    let verified = hasher
        .verify_blocking(presented.to_string(), record.key_hash.clone())
        .await?;
    if !verified {
        tracing::warn!(key_id = %record.id, "api key digest matched but hash verification failed");
        return Err(AppError::InvalidApiKey);
    }

    let key_id = record.id;
    tokio::spawn(async move {
        if let Err(e) = repo.touch_api_key(key_id, Utc::now()).await {
            tracing::warn!(key_id = %key_id, error = %e, "failed to update api key last_used_at");
        }
    });

    Ok(record)
}
