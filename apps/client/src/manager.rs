//! Auth Session Manager.
//!
//! Owns the one authoritative view of who is signed in. Three places hold a
//! copy of that answer: the identity provider, the durable store (token plus
//! profile) and the `auth` cookie. Every write to the store and cookie goes
//! through this type.
//!
//! Ordering rules:
//! - sign-in writes the store, then the cookie, then publishes the user
//! - sign-out clears the store, then the cookie, then asks the provider, so a
//!   provider failure never leaves local credentials behind
//! - token rotation rewrites only the token fields, under `writes`
//! - the first 401 of a session runs the expiry handler; the rest are no-ops

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::backend::BackendSession;
use crate::cookie::{Cookie, CookieJar, AUTH_COOKIE};
use crate::error::SessionError;
use crate::models::{SessionData, UserProfile};
use crate::navigator::{Navigator, Notice};
use crate::provider::{FederatedPrompt, IdentityProvider, ProviderError, ProviderTokens};
use crate::store::{load_session, save_session, KeyValueStore, SESSION_KEY};

/// Single-flight latch for the session-expiry handler.
#[derive(Debug, Default)]
pub struct ExpiryGuard {
    tripped: AtomicBool,
}

impl ExpiryGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true for exactly one caller until `rearm`.
    pub fn trip(&self) -> bool {
        self.tripped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn rearm(&self) {
        self.tripped.store(false, Ordering::Release);
    }
}

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    backend: Arc<dyn BackendSession>,
    store: Arc<dyn KeyValueStore>,
    cookies: Arc<dyn CookieJar>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
    current: watch::Sender<Option<UserProfile>>,
    /// Serializes store and cookie writes.
    writes: Mutex<()>,
    expiry: ExpiryGuard,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        backend: Arc<dyn BackendSession>,
        store: Arc<dyn KeyValueStore>,
        cookies: Arc<dyn CookieJar>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
    ) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            provider,
            backend,
            store,
            cookies,
            navigator,
            login_path: login_path.into(),
            current,
            writes: Mutex::new(()),
            expiry: ExpiryGuard::new(),
        }
    }

    /// Loads a persisted session into memory. An unreadable blob is dropped.
    pub async fn restore(&self) -> Result<Option<UserProfile>, SessionError> {
        let user = match load_session(self.store.as_ref()).await {
            Ok(session) => session.map(|s| s.user),
            Err(SessionError::Corrupt(e)) => {
                warn!("Discarding unreadable stored session: {e}");
                self.store.remove(SESSION_KEY).await?;
                self.cookies.remove(AUTH_COOKIE);
                None
            }
            Err(e) => return Err(e),
        };
        self.current.send_replace(user.clone());
        Ok(user)
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, SessionError> {
        let tokens = self
            .provider
            .sign_in_with_password(email, password)
            .await
            .map_err(provider_failure)?;
        self.complete_sign_in(tokens, None).await
    }

    /// Creates the provider account, then registers the profile with the
    /// backend under `full_name`.
    pub async fn register_with_password(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<UserProfile, SessionError> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(SessionError::InvalidRequest(
                "Full name is required".to_string(),
            ));
        }
        let tokens = self
            .provider
            .sign_up_with_password(email, password)
            .await
            .map_err(provider_failure)?;
        self.complete_sign_in(tokens, Some(full_name)).await
    }

    /// `Ok(None)` when the user closes the consent screen. Nothing is written
    /// and no notice is shown in that case.
    pub async fn sign_in_with_federated_provider(
        &self,
        prompt: &dyn FederatedPrompt,
    ) -> Result<Option<UserProfile>, SessionError> {
        match self.provider.sign_in_with_federated(prompt).await {
            Ok(tokens) => self.complete_sign_in(tokens, None).await.map(Some),
            Err(ProviderError::PopupClosed) => {
                debug!("Federated sign-in cancelled by user");
                Ok(None)
            }
            Err(e) => Err(provider_failure(e)),
        }
    }

    async fn complete_sign_in(
        &self,
        tokens: ProviderTokens,
        full_name: Option<&str>,
    ) -> Result<UserProfile, SessionError> {
        let user = self.backend.register(&tokens.id_token, full_name).await?;
        let session = SessionData {
            firebase_id_token: tokens.id_token,
            refresh_token: tokens.refresh_token,
            user: user.clone(),
        };

        {
            let _writes = self.writes.lock().await;
            save_session(self.store.as_ref(), &session).await?;
            self.cookies.set(Cookie::auth());
        }
        self.current.send_replace(Some(user.clone()));
        self.expiry.rearm();

        info!("Signed in {}", user.firebase_uid);
        Ok(user)
    }

    /// Asks the provider for a new ID token using the stored refresh token.
    /// A rejected refresh token ends the session through the expiry handler.
    pub async fn refresh_token(&self) -> Result<(), SessionError> {
        let Some(session) = load_session(self.store.as_ref()).await? else {
            return Ok(());
        };
        let Some(refresh_token) = session.refresh_token else {
            debug!("No refresh token stored; skipping refresh");
            return Ok(());
        };

        match self.provider.refresh(&refresh_token).await {
            Ok(tokens) => {
                self.apply_refreshed_token(tokens.id_token, tokens.refresh_token)
                    .await
            }
            Err(ProviderError::Http(e)) => {
                error!("Token refresh request failed: {e}");
                Err(SessionError::UpstreamFailure)
            }
            Err(e) => {
                warn!("Refresh token rejected: {e}");
                self.handle_unauthorized().await;
                Err(SessionError::Unauthorized)
            }
        }
    }

    /// Provider-driven token rotation. Rewrites the token fields only; the
    /// stored user is never touched. Ignored once signed out.
    pub async fn apply_refreshed_token(
        &self,
        id_token: String,
        refresh_token: Option<String>,
    ) -> Result<(), SessionError> {
        let _writes = self.writes.lock().await;
        let Some(mut session) = load_session(self.store.as_ref()).await? else {
            debug!("Token rotated after sign-out; ignoring");
            return Ok(());
        };
        session.firebase_id_token = id_token;
        if let Some(refresh_token) = refresh_token {
            session.refresh_token = Some(refresh_token);
        }
        save_session(self.store.as_ref(), &session).await
    }

    /// Local state is cleared before the provider is asked, and stays cleared
    /// if the provider call fails.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let removed = {
            let _writes = self.writes.lock().await;
            let removed = self.store.remove(SESSION_KEY).await;
            self.cookies.remove(AUTH_COOKIE);
            removed
        };
        self.current.send_replace(None);

        let provider_result = self.provider.sign_out().await;
        removed?;
        provider_result.map_err(|e| {
            warn!("Provider sign-out failed after local clear: {e}");
            SessionError::UpstreamFailure
        })
    }

    /// Cached profile. Never touches the network.
    pub fn current_user(&self) -> Option<UserProfile> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UserProfile>> {
        self.current.subscribe()
    }

    /// Token to attach to a request about to be sent.
    pub async fn bearer_token(&self) -> Result<Option<String>, SessionError> {
        Ok(load_session(self.store.as_ref())
            .await?
            .map(|s| s.firebase_id_token))
    }

    /// Session-expiry handler. Returns true for the one call that actually
    /// cleared the session and redirected.
    pub async fn handle_unauthorized(&self) -> bool {
        let cached = self.current.borrow().is_some();
        let stored = matches!(self.store.get(SESSION_KEY).await, Ok(Some(_)));
        if !cached && !stored {
            return false;
        }
        if !self.expiry.trip() {
            return false;
        }

        {
            let _writes = self.writes.lock().await;
            if let Err(e) = self.store.remove(SESSION_KEY).await {
                error!("Failed to clear expired session: {e}");
            }
            self.cookies.remove(AUTH_COOKIE);
        }
        self.current.send_replace(None);

        info!("Session expired; redirecting to {}", self.login_path);
        self.navigator.notify(Notice::SessionExpired);
        self.navigator.redirect(&self.login_path);
        true
    }
}

fn provider_failure(e: ProviderError) -> SessionError {
    match e {
        ProviderError::InvalidCredentials => SessionError::InvalidCredentials,
        ProviderError::EmailInUse => SessionError::InvalidRequest(
            "An account with this email already exists".to_string(),
        ),
        ProviderError::WeakPassword => SessionError::InvalidRequest(
            "Password should be at least 6 characters".to_string(),
        ),
        ProviderError::PopupClosed => {
            SessionError::InvalidRequest("Sign-in was cancelled".to_string())
        }
        ProviderError::Rejected(_) | ProviderError::Http(_) => {
            error!("Identity provider failure: {e}");
            SessionError::UpstreamFailure
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cookie::{is_authenticated, MemoryCookieJar};
    use crate::provider::FederatedCredential;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    pub(crate) const ID_TOKEN: &str = "id-token-1";

    #[derive(Default)]
    pub(crate) struct FakeProvider {
        pub reject_password: bool,
        pub fail_sign_out: bool,
        pub reject_refresh: bool,
        pub refreshes: AtomicUsize,
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn sign_in_with_password(
            &self,
            _email: &str,
            _password: &str,
        ) -> Result<ProviderTokens, ProviderError> {
            if self.reject_password {
                return Err(ProviderError::InvalidCredentials);
            }
            Ok(tokens(ID_TOKEN))
        }

        async fn sign_up_with_password(
            &self,
            _email: &str,
            _password: &str,
        ) -> Result<ProviderTokens, ProviderError> {
            Ok(tokens(ID_TOKEN))
        }

        async fn sign_in_with_federated(
            &self,
            prompt: &dyn FederatedPrompt,
        ) -> Result<ProviderTokens, ProviderError> {
            let credential = prompt.obtain_credential().await?;
            Ok(tokens(&format!("federated-{}", credential.id_token)))
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<ProviderTokens, ProviderError> {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            if self.reject_refresh {
                return Err(ProviderError::Rejected("TOKEN_EXPIRED".to_string()));
            }
            Ok(tokens(&format!("refreshed-{n}")))
        }

        async fn sign_out(&self) -> Result<(), ProviderError> {
            if self.fail_sign_out {
                return Err(ProviderError::Rejected("NETWORK".to_string()));
            }
            Ok(())
        }
    }

    fn tokens(id_token: &str) -> ProviderTokens {
        ProviderTokens {
            id_token: id_token.to_string(),
            refresh_token: Some("refresh-1".to_string()),
            uid: "uid-1".to_string(),
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeBackend {
        pub calls: AtomicUsize,
        pub full_names: StdMutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl BackendSession for FakeBackend {
        async fn register(
            &self,
            _id_token: &str,
            full_name: Option<&str>,
        ) -> Result<UserProfile, SessionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.full_names
                .lock()
                .unwrap()
                .push(full_name.map(str::to_string));
            Ok(profile())
        }
    }

    pub(crate) fn profile() -> UserProfile {
        UserProfile {
            email: "ada@example.com".to_string(),
            full_name: Some("Ada Lovelace".to_string()),
            firebase_uid: "uid-1".to_string(),
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingNavigator {
        pub notices: StdMutex<Vec<Notice>>,
        pub redirects: StdMutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn notify(&self, notice: Notice) {
            self.notices.lock().unwrap().push(notice);
        }

        fn redirect(&self, path: &str) {
            self.redirects.lock().unwrap().push(path.to_string());
        }
    }

    struct ScriptedPrompt {
        cancel: bool,
    }

    #[async_trait]
    impl FederatedPrompt for ScriptedPrompt {
        async fn obtain_credential(&self) -> Result<FederatedCredential, ProviderError> {
            if self.cancel {
                return Err(ProviderError::PopupClosed);
            }
            Ok(FederatedCredential {
                provider_id: "google.com".to_string(),
                id_token: "google-jwt".to_string(),
            })
        }
    }

    pub(crate) struct Harness {
        pub manager: Arc<SessionManager>,
        pub store: Arc<MemoryStore>,
        pub cookies: Arc<MemoryCookieJar>,
        pub navigator: Arc<RecordingNavigator>,
        pub backend: Arc<FakeBackend>,
    }

    pub(crate) fn harness(provider: FakeProvider) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let cookies = Arc::new(MemoryCookieJar::new());
        let navigator = Arc::new(RecordingNavigator::default());
        let backend = Arc::new(FakeBackend::default());
        let manager = Arc::new(SessionManager::new(
            Arc::new(provider),
            backend.clone(),
            store.clone(),
            cookies.clone(),
            navigator.clone(),
            "/login",
        ));
        Harness {
            manager,
            store,
            cookies,
            navigator,
            backend,
        }
    }

    async fn stored(h: &Harness) -> Option<SessionData> {
        load_session(h.store.as_ref()).await.unwrap()
    }

    #[tokio::test]
    async fn test_current_user_before_and_after_sign_in() {
        let h = harness(FakeProvider::default());
        assert!(h.manager.current_user().is_none());

        let user = h
            .manager
            .sign_in_with_password("ada@example.com", "hunter22")
            .await
            .unwrap();

        assert_eq!(h.manager.current_user(), Some(user.clone()));
        let session = stored(&h).await.unwrap();
        assert_eq!(session.firebase_id_token, ID_TOKEN);
        assert_eq!(session.user, user);
        assert!(is_authenticated(h.cookies.as_ref()));
    }

    #[tokio::test]
    async fn test_bad_password_writes_nothing() {
        let h = harness(FakeProvider {
            reject_password: true,
            ..Default::default()
        });
        let err = h
            .manager
            .sign_in_with_password("ada@example.com", "wrong")
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid email or password");
        assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);
        assert!(stored(&h).await.is_none());
        assert!(!is_authenticated(h.cookies.as_ref()));
    }

    #[tokio::test]
    async fn test_sign_out_clears_locally_even_when_provider_fails() {
        let h = harness(FakeProvider {
            fail_sign_out: true,
            ..Default::default()
        });
        h.manager
            .sign_in_with_password("ada@example.com", "hunter22")
            .await
            .unwrap();

        let result = h.manager.sign_out().await;

        assert!(matches!(result, Err(SessionError::UpstreamFailure)));
        assert!(stored(&h).await.is_none());
        assert!(h.cookies.get(AUTH_COOKIE).is_none());
        assert!(h.manager.current_user().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_unauthorized_redirects_once() {
        let h = harness(FakeProvider::default());
        h.manager
            .sign_in_with_password("ada@example.com", "hunter22")
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = h.manager.clone();
                tokio::spawn(async move { manager.handle_unauthorized().await })
            })
            .collect();
        let mut handled = 0;
        for handle in handles {
            if handle.await.unwrap() {
                handled += 1;
            }
        }

        assert_eq!(handled, 1);
        assert_eq!(*h.navigator.notices.lock().unwrap(), vec![Notice::SessionExpired]);
        assert_eq!(*h.navigator.redirects.lock().unwrap(), vec!["/login".to_string()]);
        assert!(stored(&h).await.is_none());
        assert!(h.cookies.get(AUTH_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_without_session_is_ignored() {
        let h = harness(FakeProvider::default());
        assert!(!h.manager.handle_unauthorized().await);
        assert!(h.navigator.redirects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expiry_guard_rearms_on_sign_in() {
        let h = harness(FakeProvider::default());
        for _ in 0..2 {
            h.manager
                .sign_in_with_password("ada@example.com", "hunter22")
                .await
                .unwrap();
            assert!(h.manager.handle_unauthorized().await);
        }
        assert_eq!(h.navigator.redirects.lock().unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refreshes_keep_user_intact() {
        let h = harness(FakeProvider::default());
        let user = h
            .manager
            .sign_in_with_password("ada@example.com", "hunter22")
            .await
            .unwrap();

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let manager = h.manager.clone();
                tokio::spawn(async move {
                    manager
                        .apply_refreshed_token(format!("rotated-{i}"), None)
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let session = stored(&h).await.unwrap();
        assert_eq!(session.user, user);
        assert!(session.firebase_id_token.starts_with("rotated-"));
        assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn test_rotation_after_sign_out_does_not_resurrect() {
        let h = harness(FakeProvider::default());
        h.manager
            .sign_in_with_password("ada@example.com", "hunter22")
            .await
            .unwrap();
        h.manager.sign_out().await.unwrap();

        h.manager
            .apply_refreshed_token("late".to_string(), None)
            .await
            .unwrap();
        assert!(stored(&h).await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_rewrites_token_only() {
        let h = harness(FakeProvider::default());
        let user = h
            .manager
            .sign_in_with_password("ada@example.com", "hunter22")
            .await
            .unwrap();

        h.manager.refresh_token().await.unwrap();

        let session = stored(&h).await.unwrap();
        assert_eq!(session.firebase_id_token, "refreshed-1");
        assert_eq!(session.user, user);
    }

    #[tokio::test]
    async fn test_rejected_refresh_expires_session() {
        let h = harness(FakeProvider {
            reject_refresh: true,
            ..Default::default()
        });
        h.manager
            .sign_in_with_password("ada@example.com", "hunter22")
            .await
            .unwrap();

        let result = h.manager.refresh_token().await;

        assert!(matches!(result, Err(SessionError::Unauthorized)));
        assert!(stored(&h).await.is_none());
        assert_eq!(h.navigator.redirects.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_federated_sign_in_is_silent() {
        let h = harness(FakeProvider::default());
        let result = h
            .manager
            .sign_in_with_federated_provider(&ScriptedPrompt { cancel: true })
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(stored(&h).await.is_none());
        assert!(!is_authenticated(h.cookies.as_ref()));
        assert!(h.navigator.notices.lock().unwrap().is_empty());
        assert_eq!(h.backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_federated_sign_in_stores_session() {
        let h = harness(FakeProvider::default());
        let user = h
            .manager
            .sign_in_with_federated_provider(&ScriptedPrompt { cancel: false })
            .await
            .unwrap();

        assert_eq!(user, Some(profile()));
        assert_eq!(
            stored(&h).await.unwrap().firebase_id_token,
            "federated-google-jwt"
        );
    }

    #[tokio::test]
    async fn test_register_forwards_full_name() {
        let h = harness(FakeProvider::default());
        h.manager
            .register_with_password("ada@example.com", "hunter22", "  Ada Lovelace ")
            .await
            .unwrap();
        assert_eq!(
            *h.backend.full_names.lock().unwrap(),
            vec![Some("Ada Lovelace".to_string())]
        );

        let err = h
            .manager
            .register_with_password("ada@example.com", "hunter22", "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_subscribers_see_sign_in_and_out() {
        let h = harness(FakeProvider::default());
        let mut rx = h.manager.subscribe();

        h.manager
            .sign_in_with_password("ada@example.com", "hunter22")
            .await
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(profile()));

        h.manager.sign_out().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }

    #[tokio::test]
    async fn test_restore_loads_persisted_session() {
        let h = harness(FakeProvider::default());
        save_session(
            h.store.as_ref(),
            &SessionData {
                firebase_id_token: "persisted".to_string(),
                refresh_token: None,
                user: profile(),
            },
        )
        .await
        .unwrap();

        assert_eq!(h.manager.restore().await.unwrap(), Some(profile()));
        assert_eq!(h.manager.current_user(), Some(profile()));
    }

    #[tokio::test]
    async fn test_restore_discards_corrupt_blob() {
        let h = harness(FakeProvider::default());
        h.store.set(SESSION_KEY, "{oops").await.unwrap();
        h.cookies.set(Cookie::auth());

        assert!(h.manager.restore().await.unwrap().is_none());
        assert!(h.store.get(SESSION_KEY).await.unwrap().is_none());
        assert!(!is_authenticated(h.cookies.as_ref()));
    }
}
