//! Admin/vendor context switching.
//!
//! ```text
//! SingleContext
//! Idle ──Request(vendor)──────────────────────────▶ Switching ──Succeeded──▶ Idle
//!   └──Request(admin)──▶ AwaitingPassword ──PasswordSubmitted──▶ Switching
//!                         ▲   │ Cancel → Idle                      │
//!                         └───┴──────── Failed(rejected) ──────────┘
//! ```
//!
//! Entering admin always asks for the password again; entering vendor never
//! does. The machine itself performs no I/O: [`ContextSwitcher`] drives it and
//! delegates the upstream call to [`TokenLifecycle::switch_context`].

use async_trait::async_trait;
use tracing::debug;

use paydesk_auth::{AuthError, AuthResult, ContextKind};
use paydesk_core::{DomainError, StateMachine};

use crate::lifecycle::TokenLifecycle;
use crate::state::SessionState;
use crate::upstream::{AuthApi, Password};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitcherState {
    /// The user holds one context only; there is nothing to switch to.
    SingleContext { current: Option<ContextKind> },
    Idle {
        current: Option<ContextKind>,
    },
    AwaitingPassword {
        current: Option<ContextKind>,
        target: ContextKind,
        /// Inline message from the previous attempt.
        error: Option<String>,
    },
    Switching {
        from: Option<ContextKind>,
        to: ContextKind,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchFailure {
    Rejected(String),
    Forbidden(String),
    Unavailable(String),
    SessionExpired,
}

impl From<&AuthError> for SwitchFailure {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => SwitchFailure::SessionExpired,
            AuthError::Validation(msg) => SwitchFailure::Rejected(msg.clone()),
            AuthError::Unauthorized(msg) => SwitchFailure::Forbidden(msg.clone()),
            AuthError::ServiceUnavailable(_) => SwitchFailure::Unavailable(err.user_message()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchInput {
    Request(ContextKind),
    PasswordSubmitted,
    Cancel,
    Succeeded(ContextKind),
    Failed(SwitchFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchEvent {
    PromptOpened {
        current: Option<ContextKind>,
        target: ContextKind,
    },
    SwitchStarted {
        from: Option<ContextKind>,
        to: ContextKind,
    },
    Switched {
        to: ContextKind,
    },
    PromptError {
        current: Option<ContextKind>,
        target: ContextKind,
        message: String,
    },
    Aborted {
        current: Option<ContextKind>,
    },
    /// Session expired mid-switch; the caller has to sign in again.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Already in the requested context.
    Unchanged,
    PasswordRequired,
    Switched(ContextKind),
    Cancelled,
}

/// Collects the password for a switch into a verified context.
#[async_trait]
pub trait PasswordPrompt: Send + Sync {
    /// `None` when the user dismisses the dialog. `error` carries the message
    /// from the previous attempt, if any.
    async fn ask(&self, target: ContextKind, error: Option<&str>) -> Option<Password>;
}

#[derive(Debug, Clone)]
pub struct ContextSwitcher {
    state: SwitcherState,
}

impl ContextSwitcher {
    /// Switcher for `session`. A context the upstream has not confirmed is
    /// treated as unknown, so every switch request reaches the upstream.
    pub fn for_session(session: &SessionState) -> Self {
        let current = session.current_context;
        let state = if !session.context_confirmed {
            SwitcherState::Idle { current: None }
        } else if session.can_switch() {
            SwitcherState::Idle { current }
        } else {
            SwitcherState::SingleContext { current }
        };
        Self { state }
    }

    pub fn current(&self) -> Option<ContextKind> {
        match &self.state {
            SwitcherState::SingleContext { current }
            | SwitcherState::Idle { current }
            | SwitcherState::AwaitingPassword { current, .. } => *current,
            SwitcherState::Switching { from, .. } => *from,
        }
    }

    /// Start a switch. Vendor switches complete immediately; admin switches
    /// stop at [`SwitchOutcome::PasswordRequired`].
    pub async fn request_switch<A: AuthApi>(
        &mut self,
        lifecycle: &mut TokenLifecycle<A>,
        target: ContextKind,
    ) -> AuthResult<SwitchOutcome> {
        self.step(&SwitchInput::Request(target))?;
        match &self.state {
            SwitcherState::Switching { to, .. } => {
                let to = *to;
                self.perform(lifecycle, to, None).await
            }
            SwitcherState::AwaitingPassword { .. } => Ok(SwitchOutcome::PasswordRequired),
            _ => Ok(SwitchOutcome::Unchanged),
        }
    }

    /// Complete a switch waiting for its password.
    pub async fn submit_password<A: AuthApi>(
        &mut self,
        lifecycle: &mut TokenLifecycle<A>,
        password: Password,
    ) -> AuthResult<SwitchOutcome> {
        let SwitcherState::AwaitingPassword { target, .. } = self.state else {
            return Err(AuthError::validation("no context switch is waiting for a password"));
        };
        self.step(&SwitchInput::PasswordSubmitted)?;
        self.perform(lifecycle, target, Some(password)).await
    }

    /// Dismiss the password prompt.
    pub fn cancel(&mut self) -> AuthResult<()> {
        self.step(&SwitchInput::Cancel)
    }

    /// Check a password without switching.
    pub async fn verify_password<A: AuthApi>(
        &mut self,
        lifecycle: &mut TokenLifecycle<A>,
        password: Password,
    ) -> AuthResult<bool> {
        let result = lifecycle.verify_switch_password(password).await;
        if matches!(result, Err(AuthError::Unauthenticated)) {
            self.apply(&SwitchEvent::Closed);
        }
        result
    }

    /// One-shot switch with an optional password, for callers without an
    /// interactive prompt.
    pub async fn switch_to<A: AuthApi>(
        &mut self,
        lifecycle: &mut TokenLifecycle<A>,
        target: ContextKind,
        password: Option<Password>,
    ) -> AuthResult<SwitchOutcome> {
        let outcome = self.request_switch(lifecycle, target).await?;
        match (outcome, password) {
            (SwitchOutcome::PasswordRequired, Some(password)) => {
                self.submit_password(lifecycle, password).await
            }
            (outcome, _) => Ok(outcome),
        }
    }

    /// Switch, asking `prompt` for the password as often as the upstream
    /// rejects it.
    pub async fn switch_interactive<A, P>(
        &mut self,
        lifecycle: &mut TokenLifecycle<A>,
        target: ContextKind,
        prompt: &P,
    ) -> AuthResult<SwitchOutcome>
    where
        A: AuthApi,
        P: PasswordPrompt + ?Sized,
    {
        let mut outcome = self.request_switch(lifecycle, target).await?;
        while outcome == SwitchOutcome::PasswordRequired {
            let error = match &self.state {
                SwitcherState::AwaitingPassword { error, .. } => error.clone(),
                _ => None,
            };
            let Some(password) = prompt.ask(target, error.as_deref()).await else {
                self.cancel()?;
                return Ok(SwitchOutcome::Cancelled);
            };
            outcome = match self.submit_password(lifecycle, password).await {
                Err(AuthError::Validation(_)) => SwitchOutcome::PasswordRequired,
                other => other?,
            };
        }
        Ok(outcome)
    }

    async fn perform<A: AuthApi>(
        &mut self,
        lifecycle: &mut TokenLifecycle<A>,
        target: ContextKind,
        password: Option<Password>,
    ) -> AuthResult<SwitchOutcome> {
        match lifecycle.switch_context(target, password).await {
            Ok(context) => {
                self.step(&SwitchInput::Succeeded(context))?;
                Ok(SwitchOutcome::Switched(context))
            }
            Err(err) => {
                self.step(&SwitchInput::Failed(SwitchFailure::from(&err)))?;
                Err(err)
            }
        }
    }

    fn step(&mut self, input: &SwitchInput) -> AuthResult<()> {
        self.execute(input)
            .map(|events| debug!(?events, state = ?self.state, "context switcher"))
            .map_err(|err| AuthError::validation(err.to_string()))
    }
}

impl StateMachine for ContextSwitcher {
    type State = SwitcherState;
    type Input = SwitchInput;
    type Transition = SwitchEvent;
    type Error = DomainError;

    fn state(&self) -> &SwitcherState {
        &self.state
    }

    fn apply(&mut self, event: &SwitchEvent) {
        self.state = match event.clone() {
            SwitchEvent::PromptOpened { current, target } => SwitcherState::AwaitingPassword {
                current,
                target,
                error: None,
            },
            SwitchEvent::SwitchStarted { from, to } => SwitcherState::Switching { from, to },
            SwitchEvent::Switched { to } => SwitcherState::Idle { current: Some(to) },
            SwitchEvent::PromptError {
                current,
                target,
                message,
            } => SwitcherState::AwaitingPassword {
                current,
                target,
                error: Some(message),
            },
            SwitchEvent::Aborted { current } => SwitcherState::Idle { current },
            SwitchEvent::Closed => SwitcherState::Idle { current: None },
        };
    }

    fn handle(&self, input: &SwitchInput) -> Result<Vec<SwitchEvent>, DomainError> {
        let illegal = || {
            Err(DomainError::invalid_transition(format!(
                "{input:?} is not allowed while {:?}",
                self.state
            )))
        };

        match (&self.state, input) {
            (SwitcherState::SingleContext { current }, SwitchInput::Request(target))
                if *current == Some(*target) =>
            {
                Ok(Vec::new())
            }
            (SwitcherState::SingleContext { .. }, SwitchInput::Request(_)) => {
                Err(DomainError::invalid_transition("only one context is available"))
            }

            (SwitcherState::Idle { current }, SwitchInput::Request(target)) => {
                if *current == Some(*target) {
                    Ok(Vec::new())
                } else if target.requires_verification() {
                    Ok(vec![SwitchEvent::PromptOpened {
                        current: *current,
                        target: *target,
                    }])
                } else {
                    Ok(vec![SwitchEvent::SwitchStarted {
                        from: *current,
                        to: *target,
                    }])
                }
            }
            (SwitcherState::Idle { .. }, SwitchInput::Cancel) => Ok(Vec::new()),

            (SwitcherState::AwaitingPassword { target, .. }, SwitchInput::Request(requested))
                if requested == target =>
            {
                Ok(Vec::new())
            }
            (SwitcherState::AwaitingPassword { current, target, .. }, SwitchInput::PasswordSubmitted) => {
                Ok(vec![SwitchEvent::SwitchStarted {
                    from: *current,
                    to: *target,
                }])
            }
            (SwitcherState::AwaitingPassword { current, .. }, SwitchInput::Cancel) => {
                Ok(vec![SwitchEvent::Aborted { current: *current }])
            }

            (SwitcherState::Switching { .. }, SwitchInput::Succeeded(to)) => {
                Ok(vec![SwitchEvent::Switched { to: *to }])
            }
            (SwitcherState::Switching { .. }, SwitchInput::Failed(SwitchFailure::SessionExpired)) => {
                Ok(vec![SwitchEvent::Closed])
            }
            (
                SwitcherState::Switching { from, to },
                SwitchInput::Failed(
                    SwitchFailure::Rejected(message)
                    | SwitchFailure::Forbidden(message)
                    | SwitchFailure::Unavailable(message),
                ),
            ) => {
                if to.requires_verification() {
                    Ok(vec![SwitchEvent::PromptError {
                        current: *from,
                        target: *to,
                        message: message.clone(),
                    }])
                } else {
                    Ok(vec![SwitchEvent::Aborted { current: *from }])
                }
            }

            _ => illegal(),
        }
    }
}
