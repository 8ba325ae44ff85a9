//! Default implementation of the `AuthSessionService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::SecurityConfig;
use crate::domain::{Email, Role, UserId};
use crate::services::auth_service::{
    ActivityRecord, AuthError, AuthSessionService, ClientContext, LoginResult, RefreshResult,
    SessionActivity, SessionDescriptor, SessionInfo, SessionStats, TokenPolicy, UserProfile,
    ValidatedSession, iso8601,
};
use crate::services::clock::Clock;
use crate::services::credentials::{CredentialStore, UserRecord};
use crate::services::password;
use crate::services::session_registry::{Disposition, Session, SessionRegistry};
use crate::services::token_codec::{IssuedToken, TokenCodec, TokenSubject};
use crate::services::token_generator::TokenGenerator;

const TOKEN_TYPE: &str = "Bearer";

const DECOY_EMAIL: &str = "decoy@authkeep.invalid";

/// Fresh keys are drawn again on collision; more than a couple of collisions
/// means the generator is broken.
const MAX_KEY_ATTEMPTS: usize = 3;

pub struct DefaultAuthSessionService {
    credentials: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    generator: Arc<dyn TokenGenerator>,
    codec: Arc<dyn TokenCodec>,
    registry: SessionRegistry,
    policy: TokenPolicy,
    security: SecurityConfig,
}

impl DefaultAuthSessionService {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        generator: Arc<dyn TokenGenerator>,
        codec: Arc<dyn TokenCodec>,
        policy: TokenPolicy,
        security: SecurityConfig,
    ) -> Self {
        Self {
            credentials,
            clock,
            generator,
            codec,
            registry: SessionRegistry::new(),
            policy,
            security,
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<UserRecord, AuthError> {
        let Ok(email) = Email::parse(email) else {
            self.verify_against_decoy(password).await?;
            warn!(event = "login_failed", reason = "malformed_email", "Login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        let user = self
            .credentials
            .find_by_email(&email)
            .await
            .map_err(|e| AuthError::CredentialStore(e.to_string()))?;

        let Some(user) = user else {
            self.verify_against_decoy(password).await?;
            warn!(event = "login_failed", reason = "unknown_email", "Login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        if !user.is_active {
            self.verify_against_decoy(password).await?;
            warn!(event = "login_failed", reason = "inactive_account", user_id = %user.id, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let password_ok = self
            .credentials
            .verify_password(&user, password)
            .await
            .map_err(|e| AuthError::CredentialStore(e.to_string()))?;

        if !password_ok {
            warn!(event = "login_failed", reason = "wrong_password", user_id = %user.id, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Runs a full password check against a throwaway account so that a
    /// missing or inactive account takes as long to reject as a wrong password.
    async fn verify_against_decoy(&self, password: &str) -> Result<(), AuthError> {
        let password_hash = password::decoy_hash(&self.security)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let email = Email::parse(DECOY_EMAIL).map_err(|e| AuthError::Internal(e.to_string()))?;
        let decoy = UserRecord {
            id: UserId::new(0),
            email,
            name: String::new(),
            password_hash: password_hash.to_string(),
            role: Role::User,
            is_active: false,
        };

        self.credentials
            .verify_password(&decoy, password)
            .await
            .map_err(|e| AuthError::CredentialStore(e.to_string()))?;
        Ok(())
    }

    async fn load_active_user(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        let user = self
            .credentials
            .find_by_id(user_id)
            .await
            .map_err(|e| AuthError::CredentialStore(e.to_string()))?;
        Ok(user.filter(|u| u.is_active))
    }

    fn open_session(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        client: &ClientContext,
    ) -> Result<Session, AuthError> {
        for _ in 0..MAX_KEY_ATTEMPTS {
            let session = Session::new(
                self.generator.session_id(),
                self.generator.refresh_token(),
                user_id,
                now,
                client.ip_address.clone(),
                client.user_agent.clone(),
            );

            match self.registry.insert(session.clone()) {
                Ok(()) => return Ok(session),
                Err(conflict) => warn!(?conflict, "Generated session key collided, retrying"),
            }
        }

        Err(AuthError::Internal(
            "Could not allocate a unique session key".to_string(),
        ))
    }

    fn issue_access_token(
        &self,
        user: &UserRecord,
        session_id: &str,
    ) -> Result<IssuedToken, AuthError> {
        let subject = TokenSubject {
            user_id: user.id,
            email: user.email.to_string(),
            role: user.role,
            session_id: session_id.to_string(),
        };
        Ok(self.codec.sign(&subject, self.policy.access_ttl)?)
    }

    fn info(&self, session: &Session) -> SessionInfo {
        SessionInfo::from_session(session, self.policy.refresh_ttl)
    }

    #[allow(clippy::cast_precision_loss)]
    fn publish_session_gauge(&self) {
        metrics::gauge!("auth_active_sessions").set(self.registry.len() as f64);
    }
}

fn by_recent_activity(mut sessions: Vec<Session>) -> Vec<Session> {
    sessions.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
    sessions
}

#[async_trait]
impl AuthSessionService for DefaultAuthSessionService {
    async fn login(
        &self,
        email: &str,
        password: &str,
        client: ClientContext,
    ) -> Result<LoginResult, AuthError> {
        let user = match self.authenticate(email, password).await {
            Ok(user) => user,
            Err(e) => {
                metrics::counter!("auth_logins_total", "outcome" => "failure").increment(1);
                return Err(e);
            }
        };

        let now = self.clock.now();
        let session = self.open_session(user.id, now, &client)?;

        let access = match self.issue_access_token(&user, session.session_id()) {
            Ok(access) => access,
            Err(e) => {
                self.registry.remove(session.session_id());
                return Err(e);
            }
        };

        metrics::counter!("auth_logins_total", "outcome" => "success").increment(1);
        self.publish_session_gauge();
        info!(
            event = "login_succeeded",
            user_id = %user.id,
            session_id = %session.session_id(),
            ip = %client.ip_address,
            "User logged in"
        );

        Ok(LoginResult {
            user: UserProfile::from(&user),
            access_token: access.token,
            refresh_token: session.refresh_token().to_string(),
            token_type: TOKEN_TYPE.to_string(),
            expires_in: self.policy.access_ttl.num_seconds(),
            refresh_expires_in: self.policy.refresh_ttl.num_seconds(),
            session: SessionDescriptor {
                session_id: session.session_id().to_string(),
                created_at: iso8601(session.created_at),
                expires_at: iso8601(session.created_at + self.policy.refresh_ttl),
            },
        })
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
        ip_address: &str,
    ) -> Result<RefreshResult, AuthError> {
        let now = self.clock.now();
        let refresh_ttl = self.policy.refresh_ttl;

        let outcome = self.registry.modify_by_refresh_token(refresh_token, |session| {
            if now > session.created_at + refresh_ttl {
                return Disposition::Evict(None);
            }
            session.last_used_at = now.max(session.last_used_at);
            ip_address.clone_into(&mut session.ip_address);
            Disposition::Keep(Some(session.clone()))
        });

        let session = match outcome {
            Some(Some(session)) => session,
            Some(None) => {
                metrics::counter!("auth_refresh_total", "outcome" => "expired").increment(1);
                self.publish_session_gauge();
                info!(event = "refresh_failed", reason = "expired", "Refresh token expired");
                return Err(AuthError::ExpiredRefreshToken);
            }
            None => {
                metrics::counter!("auth_refresh_total", "outcome" => "unknown").increment(1);
                debug!(event = "refresh_failed", reason = "unknown_token", "Refresh token not found");
                return Err(AuthError::InvalidRefreshToken);
            }
        };

        let Some(user) = self.load_active_user(session.user_id).await? else {
            self.registry.remove(session.session_id());
            self.publish_session_gauge();
            warn!(
                event = "refresh_failed",
                reason = "user_unavailable",
                user_id = %session.user_id,
                session_id = %session.session_id(),
                "Session revoked: owner missing or inactive"
            );
            return Err(AuthError::InvalidRefreshToken);
        };

        let access = self.issue_access_token(&user, session.session_id())?;
        metrics::counter!("auth_refresh_total", "outcome" => "success").increment(1);
        debug!(
            event = "token_refreshed",
            user_id = %user.id,
            session_id = %session.session_id(),
            "Access token refreshed"
        );

        Ok(RefreshResult {
            access_token: access.token,
            token_type: TOKEN_TYPE.to_string(),
            expires_in: self.policy.access_ttl.num_seconds(),
            user: UserProfile::from(&user),
        })
    }

    async fn validate_access_token(&self, token: &str) -> Result<ValidatedSession, AuthError> {
        let claims = self.codec.verify(token)?;
        let user_id = claims.user_id()?;
        let now = self.clock.now();

        let last_used = self
            .registry
            .modify(&claims.sid, |session| {
                if session.user_id != user_id {
                    return Disposition::Keep(None);
                }
                session.last_used_at = now.max(session.last_used_at);
                Disposition::Keep(Some(session.last_used_at))
            })
            .flatten()
            .ok_or(AuthError::SessionRevoked)?;

        let Some(user) = self.load_active_user(user_id).await? else {
            self.registry.remove(&claims.sid);
            self.publish_session_gauge();
            warn!(
                event = "session_revoked",
                reason = "user_unavailable",
                user_id = %user_id,
                session_id = %claims.sid,
                "Session revoked: owner missing or inactive"
            );
            return Err(AuthError::SessionRevoked);
        };

        Ok(ValidatedSession {
            user: UserProfile::from(&user),
            session: SessionActivity {
                session_id: claims.sid,
                last_used: iso8601(last_used),
            },
        })
    }

    fn logout(&self, session_id: &str) -> bool {
        let removed = self.registry.remove(session_id);
        if let Some(session) = &removed {
            self.publish_session_gauge();
            info!(
                event = "logout",
                user_id = %session.user_id,
                session_id = %session_id,
                "Session closed"
            );
        }
        removed.is_some()
    }

    fn logout_all(&self, user_id: UserId) -> usize {
        let removed = self.registry.remove_for_user(user_id).len();
        self.publish_session_gauge();
        info!(event = "logout_all", user_id = %user_id, removed, "All sessions closed");
        removed
    }

    fn logout_others(&self, user_id: UserId, keep_session_id: &str) -> usize {
        let removed = self
            .registry
            .remove_where(|s| s.user_id == user_id && s.session_id() != keep_session_id)
            .len();
        self.publish_session_gauge();
        info!(event = "logout_others", user_id = %user_id, removed, "Other sessions closed");
        removed
    }

    fn session_stats(&self) -> SessionStats {
        let sessions = by_recent_activity(self.registry.snapshot());

        let mut sessions_per_user = BTreeMap::new();
        for session in &sessions {
            *sessions_per_user.entry(session.user_id).or_insert(0) += 1;
        }

        SessionStats {
            total_active_sessions: sessions.len(),
            sessions_per_user,
            last_activity: sessions.iter().map(ActivityRecord::from).collect(),
        }
    }

    fn active_sessions(&self) -> Vec<SessionInfo> {
        by_recent_activity(self.registry.snapshot())
            .iter()
            .map(|s| self.info(s))
            .collect()
    }

    fn sessions_for_user(&self, user_id: UserId) -> Vec<SessionInfo> {
        by_recent_activity(self.registry.sessions_for_user(user_id))
            .iter()
            .map(|s| self.info(s))
            .collect()
    }

    fn clear_all_sessions(&self) -> usize {
        let removed = self.registry.clear();
        self.publish_session_gauge();
        warn!(event = "sessions_cleared", removed, "Session registry cleared");
        removed
    }

    fn purge_expired_sessions(&self) -> usize {
        let now = self.clock.now();
        let refresh_ttl = self.policy.refresh_ttl;
        let removed = self
            .registry
            .remove_where(|s| now > s.created_at + refresh_ttl)
            .len();
        if removed > 0 {
            self.publish_session_gauge();
            info!(event = "sessions_purged", removed, "Expired sessions purged");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use crate::services::credentials::InMemoryCredentialStore;
    use crate::services::token_codec::JwtTokenCodec;
    use crate::services::token_generator::SecureTokenGenerator;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        service: DefaultAuthSessionService,
        clock: Arc<ManualClock>,
        users: Arc<InMemoryCredentialStore>,
        alice: UserRecord,
        bob: UserRecord,
    }

    fn cheap_security() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..SecurityConfig::default()
        }
    }

    fn service_over(
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<ManualClock>,
    ) -> DefaultAuthSessionService {
        let codec = Arc::new(JwtTokenCodec::new(
            b"unit-test-secret-with-enough-length-000",
            "authkeep-test",
            clock.clone(),
        ));
        DefaultAuthSessionService::new(
            credentials,
            clock,
            Arc::new(SecureTokenGenerator),
            codec,
            TokenPolicy::from_seconds(900, 7 * 24 * 3600),
            cheap_security(),
        )
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::default());
        let users = Arc::new(InMemoryCredentialStore::new(cheap_security()));
        let alice = users
            .provision("alice@example.com", "Alice", "Secret123!", Role::User)
            .unwrap();
        let bob = users
            .provision("bob@example.com", "Bob", "Hunter22!", Role::Admin)
            .unwrap();

        let service = service_over(users.clone(), clock.clone());

        Harness {
            service,
            clock,
            users,
            alice,
            bob,
        }
    }

    fn client() -> ClientContext {
        ClientContext {
            ip_address: "127.0.0.1".to_string(),
            user_agent: Some("unit-test".to_string()),
        }
    }

    #[tokio::test]
    async fn login_creates_exactly_one_session() {
        let h = harness();
        let result = h
            .service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap();

        assert_eq!(h.service.active_sessions().len(), 1);
        assert_eq!(result.user.id, h.alice.id);
        assert_eq!(result.user.email, "alice@example.com");
        assert_eq!(result.token_type, "Bearer");
        assert_eq!(result.expires_in, 900);
        assert_eq!(result.refresh_expires_in, 7 * 24 * 3600);

        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("argon2"));
    }

    #[tokio::test]
    async fn login_email_is_case_insensitive() {
        let h = harness();
        assert!(
            h.service
                .login("ALICE@Example.com", "Secret123!", client())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_identically() {
        let h = harness();
        let wrong = h
            .service
            .login("alice@example.com", "nope", client())
            .await
            .unwrap_err();
        let unknown = h
            .service
            .login("carol@example.com", "Secret123!", client())
            .await
            .unwrap_err();
        let malformed = h
            .service
            .login("not-an-email", "Secret123!", client())
            .await
            .unwrap_err();

        for err in [&wrong, &unknown, &malformed] {
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(h.service.active_sessions().is_empty());
    }

    /// Counts password checks made through the wrapped store.
    struct CountingStore {
        inner: Arc<InMemoryCredentialStore>,
        checks: AtomicUsize,
    }

    #[async_trait]
    impl CredentialStore for CountingStore {
        async fn find_by_email(&self, email: &Email) -> anyhow::Result<Option<UserRecord>> {
            self.inner.find_by_email(email).await
        }

        async fn find_by_id(&self, id: UserId) -> anyhow::Result<Option<UserRecord>> {
            self.inner.find_by_id(id).await
        }

        async fn verify_password(&self, user: &UserRecord, password: &str) -> anyhow::Result<bool> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.inner.verify_password(user, password).await
        }
    }

    #[tokio::test]
    async fn every_login_failure_pays_for_a_password_check() {
        let inner = Arc::new(InMemoryCredentialStore::new(cheap_security()));
        let alice = inner
            .provision("alice@example.com", "Alice", "Secret123!", Role::User)
            .unwrap();
        inner
            .provision("dora@example.com", "Dora", "Secret123!", Role::User)
            .unwrap();
        let dora = inner
            .find_by_email(&Email::parse("dora@example.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        inner.set_active(dora.id, false);

        let store = Arc::new(CountingStore {
            inner,
            checks: AtomicUsize::new(0),
        });
        let service = service_over(store.clone(), Arc::new(ManualClock::default()));

        let attempts = [
            ("nobody@example.com", "Secret123!"),
            ("not-an-email", "Secret123!"),
            ("dora@example.com", "Secret123!"),
            ("alice@example.com", "wrong-one"),
        ];
        for (email, password) in attempts {
            let err = service.login(email, password, client()).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
        assert_eq!(store.checks.load(Ordering::SeqCst), attempts.len());

        let ok = service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap();
        assert_eq!(ok.user.id, alice.id);
        assert_eq!(store.checks.load(Ordering::SeqCst), attempts.len() + 1);
    }

    #[tokio::test]
    async fn inactive_account_cannot_log_in() {
        let h = harness();
        h.users.set_active(h.alice.id, false);
        let err = h
            .service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn refresh_issues_new_access_token_without_rotating() {
        let h = harness();
        let login = h
            .service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap();
        let before = h.service.active_sessions()[0].last_used_at.clone();

        h.clock.advance(Duration::minutes(10));
        let refreshed = h
            .service
            .refresh_token(&login.refresh_token, "10.0.0.2")
            .await
            .unwrap();
        assert_ne!(refreshed.access_token, login.access_token);
        assert_eq!(refreshed.user.id, h.alice.id);

        let after = h.service.active_sessions()[0].clone();
        assert!(after.last_used_at > before);
        assert_eq!(after.ip_address, "10.0.0.2");

        // The same refresh token keeps working: it is not rotated.
        assert!(
            h.service
                .refresh_token(&login.refresh_token, "10.0.0.2")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn refresh_after_logout_is_invalid() {
        let h = harness();
        let login = h
            .service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap();

        assert!(h.service.logout(&login.session.session_id));
        assert!(!h.service.logout(&login.session.session_id));

        let err = h
            .service
            .refresh_token(&login.refresh_token, "127.0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn refresh_expiry_is_absolute_from_creation() {
        let h = harness();
        let login = h
            .service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap();

        h.clock.advance(Duration::days(6));
        h.service
            .refresh_token(&login.refresh_token, "127.0.0.1")
            .await
            .unwrap();

        h.clock.advance(Duration::days(1) + Duration::seconds(1));
        let err = h
            .service
            .refresh_token(&login.refresh_token, "127.0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ExpiredRefreshToken));

        let err = h
            .service
            .refresh_token(&login.refresh_token, "127.0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));
        assert!(h.service.active_sessions().is_empty());
    }

    #[tokio::test]
    async fn deactivated_user_loses_refresh() {
        let h = harness();
        let login = h
            .service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap();
        h.users.set_active(h.alice.id, false);

        let err = h
            .service
            .refresh_token(&login.refresh_token, "127.0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));
        assert!(h.service.active_sessions().is_empty());
    }

    #[tokio::test]
    async fn validate_returns_user_and_touches_session() {
        let h = harness();
        let login = h
            .service
            .login("bob@example.com", "Hunter22!", client())
            .await
            .unwrap();

        h.clock.advance(Duration::minutes(2));
        let validated = h
            .service
            .validate_access_token(&login.access_token)
            .await
            .unwrap();
        assert_eq!(validated.user.id, h.bob.id);
        assert_eq!(validated.user.role, Role::Admin);
        assert_eq!(validated.session.session_id, login.session.session_id);
        assert_eq!(
            h.service.active_sessions()[0].last_used_at,
            validated.session.last_used
        );
    }

    #[tokio::test]
    async fn validate_after_logout_reports_revocation() {
        let h = harness();
        let login = h
            .service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap();
        h.service.logout(&login.session.session_id);

        let err = h
            .service
            .validate_access_token(&login.access_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionRevoked));
    }

    #[tokio::test]
    async fn validate_rejects_expired_and_garbage_tokens() {
        let h = harness();
        let login = h
            .service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap();

        let err = h
            .service
            .validate_access_token("garbage")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));

        h.clock.advance(Duration::minutes(16));
        let err = h
            .service
            .validate_access_token(&login.access_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ExpiredToken));
    }

    #[tokio::test]
    async fn logout_all_only_touches_one_user() {
        let h = harness();
        let a1 = h
            .service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap();
        h.service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap();
        let b1 = h
            .service
            .login("bob@example.com", "Hunter22!", client())
            .await
            .unwrap();

        assert_eq!(h.service.logout_all(h.alice.id), 2);

        let remaining = h.service.active_sessions();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].user_id, h.bob.id);

        assert!(matches!(
            h.service.validate_access_token(&a1.access_token).await,
            Err(AuthError::SessionRevoked)
        ));
        assert!(h.service.validate_access_token(&b1.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn logout_others_keeps_the_current_session() {
        let h = harness();
        let current = h
            .service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap();
        h.service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap();

        assert_eq!(
            h.service
                .logout_others(h.alice.id, &current.session.session_id),
            1
        );
        let sessions = h.service.sessions_for_user(h.alice.id);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, current.session.session_id);
    }

    #[tokio::test]
    async fn stats_sort_by_most_recent_activity() {
        let h = harness();
        let first = h
            .service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap();
        h.clock.advance(Duration::seconds(30));
        let second = h
            .service
            .login("bob@example.com", "Hunter22!", client())
            .await
            .unwrap();
        h.clock.advance(Duration::seconds(30));
        h.service
            .validate_access_token(&first.access_token)
            .await
            .unwrap();

        let stats = h.service.session_stats();
        assert_eq!(stats.total_active_sessions, 2);
        assert_eq!(stats.sessions_per_user[&h.alice.id], 1);
        assert_eq!(stats.sessions_per_user[&h.bob.id], 1);
        assert_eq!(stats.last_activity[0].session_id, first.session.session_id);
        assert_eq!(stats.last_activity[1].session_id, second.session.session_id);
    }

    #[tokio::test]
    async fn purge_and_clear() {
        let h = harness();
        h.service
            .login("alice@example.com", "Secret123!", client())
            .await
            .unwrap();
        h.clock.advance(Duration::days(3));
        h.service
            .login("bob@example.com", "Hunter22!", client())
            .await
            .unwrap();

        h.clock.advance(Duration::days(5));
        assert_eq!(h.service.purge_expired_sessions(), 1);
        assert_eq!(h.service.active_sessions()[0].user_id, h.bob.id);

        assert_eq!(h.service.clear_all_sessions(), 1);
        assert!(h.service.active_sessions().is_empty());
    }
}
