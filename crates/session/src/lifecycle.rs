//! Token lifecycle: login, second factor, refresh, context switch, logout and
//! current-user rehydration.
//!
//! `TokenLifecycle` is the only writer of the session cookies and of
//! [`SessionState`]. Every operation takes `&mut self`, so writes are
//! serialised by ownership; readers observe snapshots through
//! [`SessionReader`].
//!
//! Failure policy: `Unauthenticated` from any call clears all session cookies
//! and moves the session to `TokenExpired`. Other errors are returned to the
//! caller and leave the session untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use paydesk_auth::{
    validate_token, AuthError, AuthResult, ContextKind, SessionToken, User,
};
use paydesk_core::StateMachine;

use crate::config::SessionConfig;
use crate::cookies::{self, CookieJar, SetCookie};
use crate::phase::{AuthInput, AuthMachine, AuthPhase};
use crate::state::{SessionReader, SessionState, SessionStore};
use crate::two_factor::SecondFactor;
use crate::upstream::{
    AuthApi, LoginReply, LoginRequest, Password, SwitchContextRequest, TwoFactorChallenge,
    VerifySwitchRequest,
};

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated {
        user: User,
        context: Option<ContextKind>,
    },
    SecondFactorRequired(TwoFactorChallenge),
}

pub struct TokenLifecycle<A: AuthApi> {
    api: Arc<A>,
    config: SessionConfig,
    jar: CookieJar,
    store: SessionStore,
    machine: AuthMachine,
}

impl<A: AuthApi> TokenLifecycle<A> {
    /// Restore the session held by `jar`.
    pub fn new(api: Arc<A>, config: SessionConfig, jar: CookieJar) -> Self {
        Self::restore_at(api, config, jar, Utc::now())
    }

    /// Restore the session held by `jar` as of `now`.
    ///
    /// A token that has expired locally is treated as absent and its cookies
    /// are scheduled for removal.
    pub fn restore_at(api: Arc<A>, config: SessionConfig, mut jar: CookieJar, now: DateTime<Utc>) -> Self {
        let stored = cookies::read_session(&jar, &config, now);
        let had_token = jar.get(cookies::ACCESS_TOKEN).is_some();

        let phase = match (&stored.token, had_token) {
            (Some(_), _) => AuthPhase::Authenticated,
            (None, true) => {
                debug!("session cookie expired locally");
                cookies::clear_session(&mut jar, &config);
                AuthPhase::TokenExpired
            }
            (None, false) => AuthPhase::Anonymous,
        };

        let state = SessionState {
            user: None,
            current_context: stored.token.as_ref().and(stored.context),
            context_confirmed: false,
            available_contexts: Vec::new(),
            token: stored.token,
            phase,
        };

        Self {
            api,
            config,
            jar,
            store: SessionStore::new(state),
            machine: AuthMachine::resume(phase),
        }
    }

    pub fn reader(&self) -> SessionReader {
        self.store.reader()
    }

    pub fn state(&self) -> SessionState {
        self.store.snapshot()
    }

    pub fn phase(&self) -> AuthPhase {
        self.machine.phase()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    /// Cookie writes accumulated since the last call.
    pub fn take_set_cookies(&mut self) -> Vec<SetCookie> {
        self.jar.take_pending()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Login
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn login(&mut self, request: &LoginRequest) -> AuthResult<LoginOutcome> {
        self.advance(AuthInput::Begin)?;
        self.publish_phase();

        match self.api.login(request).await {
            Ok(LoginReply::Authenticated(response)) => {
                let (user, context) = self.establish(
                    response.user,
                    response.access_token,
                    response.expires_in,
                    response.context,
                    AuthInput::Succeeded,
                )?;
                info!(user_id = %user.id, context = ?context, "login succeeded");
                Ok(LoginOutcome::Authenticated { user, context })
            }
            Ok(LoginReply::SecondFactorRequired(challenge)) => {
                self.advance(AuthInput::ChallengeIssued)?;
                self.drop_session();
                info!(methods = ?challenge.methods, "second factor required");
                Ok(LoginOutcome::SecondFactorRequired(challenge))
            }
            Err(AuthError::Unauthenticated) => {
                self.advance(AuthInput::Rejected)?;
                self.drop_session();
                info!("login rejected");
                Err(AuthError::validation("invalid email or password"))
            }
            Err(err) => {
                self.advance(AuthInput::Rejected)?;
                self.publish_phase();
                warn!(error = %err, "login failed");
                Err(err)
            }
        }
    }

    /// Answer a second-factor challenge, possibly issued to an earlier
    /// lifecycle instance.
    pub async fn submit_second_factor(
        &mut self,
        challenge: &TwoFactorChallenge,
        factor: &SecondFactor,
    ) -> AuthResult<LoginOutcome> {
        self.advance(AuthInput::ResumeChallenge)?;
        self.publish_phase();

        match self.api.verify_second_factor(challenge, factor).await {
            Ok(response) => {
                let (user, context) = self.establish(
                    response.user,
                    response.access_token,
                    response.expires_in,
                    response.context,
                    AuthInput::Succeeded,
                )?;
                info!(user_id = %user.id, method = factor.method(), "second factor accepted");
                Ok(LoginOutcome::Authenticated { user, context })
            }
            Err(AuthError::Unauthenticated) => {
                self.invalidate("second-factor challenge expired");
                Err(AuthError::Unauthenticated)
            }
            Err(err) => {
                self.advance(AuthInput::Rejected)?;
                debug!(error = %err, method = factor.method(), "second factor rejected");
                Err(err)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Token maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Exchange the current token for a fresh one.
    ///
    /// Any failure invalidates the session.
    pub async fn refresh(&mut self) -> AuthResult<SessionToken> {
        let token = self.require_token()?;
        match self.api.refresh(token.value()).await {
            Ok(response) => {
                let fresh = match self.issued_token(response.access_token, Some(response.expires_in)) {
                    Ok(fresh) => fresh,
                    Err(err) => {
                        warn!(error = %err, "token refresh failed");
                        self.invalidate("refresh returned an unusable token");
                        return Err(AuthError::Unauthenticated);
                    }
                };
                let context = self.store.snapshot().current_context;
                cookies::store_session(&mut self.jar, &self.config, &fresh, context);
                self.store.update(|state| state.token = Some(fresh.clone()));
                info!(expires_at = %fresh.expires_at(), "token refreshed");
                Ok(fresh)
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed");
                self.invalidate("refresh failed");
                Err(AuthError::Unauthenticated)
            }
        }
    }

    /// Re-fetch the user behind the current token.
    pub async fn fetch_current_user(&mut self) -> AuthResult<User> {
        let token = self.require_token()?;
        match self.api.me(token.value()).await {
            Ok(user) => {
                let available = user.available_contexts();
                let published = user.clone();
                self.store.update(move |state| {
                    if state.current_context.is_none() {
                        state.current_context = choose_context(None, &available);
                    }
                    state.available_contexts = available;
                    state.user = Some(published);
                });
                Ok(user)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Sign out. The upstream call is best effort; local cookies are always
    /// cleared.
    pub async fn logout(&mut self) {
        if let Some(token) = self.store.snapshot().token {
            if let Err(err) = self.api.logout(token.value()).await {
                warn!(error = %err, "upstream logout failed, clearing local session anyway");
            }
        }
        cookies::clear_session(&mut self.jar, &self.config);
        self.settle(AuthInput::SignedOut);
        self.store.publish(SessionState::default());
        info!("signed out");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Context switching
    // ─────────────────────────────────────────────────────────────────────────

    /// Switch the session into `target`, replacing the token.
    ///
    /// Entering a context that requires verification needs `password`; it is
    /// not sent otherwise. On failure the current token stays in place.
    pub async fn switch_context(
        &mut self,
        target: ContextKind,
        password: Option<Password>,
    ) -> AuthResult<ContextKind> {
        let require_verification = target.requires_verification();
        if require_verification && password.as_ref().is_none_or(Password::is_empty) {
            return Err(AuthError::validation(format!(
                "password is required to enter the {target} context"
            )));
        }

        let token = self.require_token()?;
        let request = SwitchContextRequest {
            context_type: target,
            password: password.filter(|_| require_verification),
            require_verification,
        };

        match self.api.switch_context(token.value(), &request).await {
            Ok(response) => {
                let input = if response.context.requires_verification() {
                    AuthInput::ContextVerified
                } else {
                    AuthInput::ContextLeft
                };
                let (_, context) = self.establish(
                    response.user,
                    response.access_token,
                    response.expires_in,
                    Some(response.context),
                    input,
                )?;
                info!(context = %response.context, "context switched");
                Ok(context.unwrap_or(response.context))
            }
            Err(err) => {
                debug!(error = %err, target = %target, "context switch failed");
                Err(self.fail(err))
            }
        }
    }

    /// Check the password without switching.
    pub async fn verify_switch_password(&mut self, password: Password) -> AuthResult<bool> {
        let token = self.require_token()?;
        match self
            .api
            .verify_switch(token.value(), &VerifySwitchRequest { password })
            .await
        {
            Ok(response) => Ok(response.verified),
            Err(err) => Err(self.fail(err)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Clear cookies and state after the token was rejected or expired.
    pub fn invalidate(&mut self, reason: &str) {
        cookies::clear_session(&mut self.jar, &self.config);
        self.settle(AuthInput::Expired);
        let phase = self.machine.phase();
        self.store.publish(SessionState {
            phase,
            ..SessionState::default()
        });
        warn!(reason, "session invalidated");
    }

    /// Current token if it is still locally valid; invalidates otherwise.
    fn require_token(&mut self) -> AuthResult<SessionToken> {
        let Some(token) = self.store.snapshot().token else {
            self.invalidate("no session token");
            return Err(AuthError::Unauthenticated);
        };
        if let Err(err) = validate_token(&token, Utc::now()) {
            self.invalidate(&err.to_string());
            return Err(err.into());
        }
        Ok(token)
    }

    /// Route an upstream error through the failure policy.
    fn fail(&mut self, err: AuthError) -> AuthError {
        if err.clears_session() {
            self.invalidate("upstream rejected the session token");
        }
        err
    }

    /// Store a freshly issued token and publish the authenticated state.
    fn establish(
        &mut self,
        user: User,
        access_token: String,
        expires_in: Option<i64>,
        context: Option<ContextKind>,
        input: AuthInput,
    ) -> AuthResult<(User, Option<ContextKind>)> {
        let token = match self.issued_token(access_token, expires_in) {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "discarding upstream token");
                self.settle(AuthInput::Rejected);
                self.publish_phase();
                return Err(err);
            }
        };
        let context = choose_context(context, &user.available_contexts());

        self.advance(input)?;
        cookies::store_session(&mut self.jar, &self.config, &token, context);
        self.store.publish(SessionState::authenticated(
            user.clone(),
            context,
            token,
            self.machine.phase(),
        ));
        Ok((user, context))
    }

    /// Wrap a token issued by the upstream. Its lifetime is bounded by the
    /// cookie lifetime and its value must be storable in a cookie.
    fn issued_token(&self, access_token: String, expires_in: Option<i64>) -> AuthResult<SessionToken> {
        if !cookies::is_cookie_value(&access_token) {
            return Err(AuthError::unavailable(
                "upstream issued a token that cannot be stored in a cookie",
            ));
        }
        let max_lifetime = self.config.cookie_max_age;
        let seconds = expires_in.unwrap_or_else(|| max_lifetime.num_seconds());
        Ok(SessionToken::expiring_in(access_token, seconds, max_lifetime, Utc::now()))
    }

    fn advance(&mut self, input: AuthInput) -> AuthResult<()> {
        self.machine
            .execute(&input)
            .map(|_| ())
            .map_err(|err| AuthError::validation(err.to_string()))
    }

    /// Apply an input that is legal in every phase.
    fn settle(&mut self, input: AuthInput) {
        if let Err(err) = self.machine.execute(&input) {
            debug!(error = %err, "phase unchanged");
        }
    }

    fn publish_phase(&self) {
        let phase = self.machine.phase();
        self.store.update(|state| state.phase = phase);
    }

    /// Forget any previous session while a login is in flight.
    fn drop_session(&mut self) {
        cookies::clear_session(&mut self.jar, &self.config);
        let phase = self.machine.phase();
        self.store.publish(SessionState {
            phase,
            ..SessionState::default()
        });
    }
}

/// Context to enter after authentication: the one the upstream named, else
/// vendor when available, else the first available.
fn choose_context(explicit: Option<ContextKind>, available: &[ContextKind]) -> Option<ContextKind> {
    explicit
        .or_else(|| available.iter().copied().find(|c| *c == ContextKind::Vendor))
        .or_else(|| available.first().copied())
}
