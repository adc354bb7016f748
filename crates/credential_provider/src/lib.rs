//! Credential-provider contract for the ChatGPT client.
//!
//! The chat client treats authentication as opaque: something hands it a
//! bearer token, and refreshing an expired one is that something's problem.
//! This crate defines the seam: the [`BearerTokenProvider`] trait, an
//! injectable [`TokenStore`] for cached tokens, and JWT expiry inspection so
//! stale cache entries are rejected before they ever hit the network.

mod error;
pub mod jwt;
mod store;

use std::sync::{Mutex, MutexGuard};

pub use error::CredentialError;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};

/// Supplies a bearer token for the chat backend.
pub trait BearerTokenProvider {
    fn bearer_token(&self) -> Result<String, CredentialError>;
}

/// Wraps an already-obtained token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl BearerTokenProvider for StaticTokenProvider {
    fn bearer_token(&self) -> Result<String, CredentialError> {
        if self.token.trim().is_empty() {
            return Err(CredentialError::Missing {
                account: "static".to_owned(),
            });
        }
        Ok(self.token.clone())
    }
}

/// Token provider backed by a [`TokenStore`], falling through to an inner
/// provider when the cache misses or holds an expired token.
///
/// Fresh tokens obtained from the inner provider are written back to the
/// store keyed by account.
pub struct CachedTokenProvider<P, S> {
    account: String,
    inner: P,
    store: Mutex<S>,
}

impl<P, S> CachedTokenProvider<P, S>
where
    P: BearerTokenProvider,
    S: TokenStore,
{
    pub fn new(account: impl Into<String>, inner: P, store: S) -> Self {
        Self {
            account: account.into(),
            inner,
            store: Mutex::new(store),
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }
}

impl<P, S> BearerTokenProvider for CachedTokenProvider<P, S>
where
    P: BearerTokenProvider,
    S: TokenStore,
{
    fn bearer_token(&self) -> Result<String, CredentialError> {
        let mut store = lock_unpoisoned(&self.store);

        let mut cached_expired_at = None;
        if let Some(token) = store.get(&self.account)? {
            match jwt::expires_at(&token) {
                Ok(Some(exp)) if exp <= jwt::current_epoch_seconds() => {
                    log::debug!(
                        "cached token for {} expired at {exp}, refreshing",
                        self.account
                    );
                    cached_expired_at = Some(exp);
                }
                Ok(_) => return Ok(token),
                Err(error) => {
                    log::debug!(
                        "cached token for {} is unreadable ({error}), refreshing",
                        self.account
                    );
                }
            }
        }

        match self.inner.bearer_token() {
            Ok(token) => {
                store.put(&self.account, &token)?;
                Ok(token)
            }
            Err(CredentialError::Missing { .. }) => match cached_expired_at {
                // The only token we ever had is stale; say so precisely.
                Some(expired_at) => Err(CredentialError::Expired {
                    account: self.account.clone(),
                    expired_at,
                }),
                None => Err(CredentialError::Missing {
                    account: self.account.clone(),
                }),
            },
            Err(error) => Err(error),
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use crate::jwt::{current_epoch_seconds, token_with_exp};

    use super::{
        BearerTokenProvider, CachedTokenProvider, CredentialError, MemoryTokenStore,
        StaticTokenProvider, TokenStore,
    };

    struct NoProvider;

    impl BearerTokenProvider for NoProvider {
        fn bearer_token(&self) -> Result<String, CredentialError> {
            Err(CredentialError::Missing {
                account: "none".to_owned(),
            })
        }
    }

    #[test]
    fn static_provider_returns_its_token() {
        let provider = StaticTokenProvider::new("tok");
        assert_eq!(provider.bearer_token().expect("token is set"), "tok");
    }

    #[test]
    fn static_provider_rejects_blank_tokens() {
        let error = StaticTokenProvider::new("  ")
            .bearer_token()
            .expect_err("blank token is not a credential");
        assert!(matches!(error, CredentialError::Missing { .. }));
    }

    #[test]
    fn cached_provider_prefers_a_valid_cached_token() {
        let fresh = token_with_exp(Some(current_epoch_seconds() + 3600));
        let mut store = MemoryTokenStore::new();
        store.put("a@example.com", &fresh).expect("put succeeds");

        let provider =
            CachedTokenProvider::new("a@example.com", StaticTokenProvider::new("inner"), store);

        assert_eq!(provider.bearer_token().expect("cache hit"), fresh);
    }

    #[test]
    fn expired_cached_token_falls_through_and_is_replaced() {
        let stale = token_with_exp(Some(1));
        let mut store = MemoryTokenStore::new();
        store.put("a@example.com", &stale).expect("put succeeds");

        let provider =
            CachedTokenProvider::new("a@example.com", StaticTokenProvider::new("inner"), store);

        assert_eq!(provider.bearer_token().expect("inner refresh"), "inner");
        let store = super::lock_unpoisoned(&provider.store);
        assert_eq!(
            store.get("a@example.com").expect("get succeeds").as_deref(),
            Some("inner")
        );
    }

    #[test]
    fn expired_cache_without_refresh_path_reports_expiry() {
        let stale = token_with_exp(Some(1));
        let mut store = MemoryTokenStore::new();
        store.put("a@example.com", &stale).expect("put succeeds");

        let provider = CachedTokenProvider::new("a@example.com", NoProvider, store);

        let error = provider
            .bearer_token()
            .expect_err("nothing can refresh the stale token");
        assert!(matches!(
            error,
            CredentialError::Expired { expired_at: 1, .. }
        ));
    }

    #[test]
    fn empty_cache_without_refresh_path_reports_missing() {
        let provider =
            CachedTokenProvider::new("a@example.com", NoProvider, MemoryTokenStore::new());

        let error = provider.bearer_token().expect_err("no credential exists");
        assert!(matches!(error, CredentialError::Missing { account } if account == "a@example.com"));
    }

    #[test]
    fn opaque_non_jwt_tokens_from_cache_are_refreshed() {
        let mut store = MemoryTokenStore::new();
        store.put("a@example.com", "garbage").expect("put succeeds");

        let provider =
            CachedTokenProvider::new("a@example.com", StaticTokenProvider::new("inner"), store);

        assert_eq!(provider.bearer_token().expect("inner refresh"), "inner");
    }
}
