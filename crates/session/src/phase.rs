//! Authentication phases of one session.
//!
//! ```text
//! Anonymous → Authenticating → [AwaitingSecondFactor] → Authenticated
//!                                                         ├→ ContextVerified
//!                                                         └→ TokenExpired → Anonymous
//! ```

use serde::Serialize;

use paydesk_core::{DomainError, StateMachine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    #[default]
    Anonymous,
    Authenticating,
    AwaitingSecondFactor,
    Authenticated,
    /// Authenticated in a context that needed password re-verification.
    ContextVerified,
    TokenExpired,
}

impl AuthPhase {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthPhase::Authenticated | AuthPhase::ContextVerified)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthInput {
    /// Credentials submitted. A new login replaces any existing session,
    /// including one left half-way by an abandoned attempt.
    Begin,
    /// Upstream answered the credentials with a 2FA challenge.
    ChallengeIssued,
    /// A challenge issued earlier is being answered in a fresh session.
    ResumeChallenge,
    /// Upstream issued a token.
    Succeeded,
    /// Upstream refused the credentials or the second factor.
    Rejected,
    /// Switched into a context after password re-verification.
    ContextVerified,
    /// Switched into a context that needs no verification.
    ContextLeft,
    /// Token expired or was rejected.
    Expired,
    SignedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChanged {
    pub from: AuthPhase,
    pub to: AuthPhase,
}

#[derive(Debug, Clone, Default)]
pub struct AuthMachine {
    phase: AuthPhase,
}

impl AuthMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Machine for a session restored from cookies.
    pub fn resume(phase: AuthPhase) -> Self {
        Self { phase }
    }

    pub fn phase(&self) -> AuthPhase {
        self.phase
    }

    fn to(&self, to: AuthPhase) -> Vec<PhaseChanged> {
        if self.phase == to {
            Vec::new()
        } else {
            vec![PhaseChanged {
                from: self.phase,
                to,
            }]
        }
    }
}

impl StateMachine for AuthMachine {
    type State = AuthPhase;
    type Input = AuthInput;
    type Transition = PhaseChanged;
    type Error = DomainError;

    fn state(&self) -> &AuthPhase {
        &self.phase
    }

    fn apply(&mut self, transition: &PhaseChanged) {
        self.phase = transition.to;
    }

    fn handle(&self, input: &AuthInput) -> Result<Vec<PhaseChanged>, DomainError> {
        use AuthPhase::*;

        let next = match (self.phase, input) {
            (_, AuthInput::Begin) => Some(Authenticating),

            (Authenticating, AuthInput::ChallengeIssued) => Some(AwaitingSecondFactor),

            (Authenticating, AuthInput::ResumeChallenge) => None,
            (_, AuthInput::ResumeChallenge) => Some(AwaitingSecondFactor),

            (Authenticating | AwaitingSecondFactor, AuthInput::Succeeded) => Some(Authenticated),

            (Authenticating, AuthInput::Rejected) => Some(Anonymous),
            // A wrong code leaves the challenge open.
            (AwaitingSecondFactor, AuthInput::Rejected) => Some(AwaitingSecondFactor),

            (Authenticated | ContextVerified, AuthInput::ContextVerified) => Some(ContextVerified),
            (Authenticated | ContextVerified, AuthInput::ContextLeft) => Some(Authenticated),

            (Anonymous, AuthInput::Expired) => Some(Anonymous),
            (_, AuthInput::Expired) => Some(TokenExpired),

            (_, AuthInput::SignedOut) => Some(Anonymous),

            _ => None,
        };

        match next {
            Some(to) => Ok(self.to(to)),
            None => Err(DomainError::invalid_transition(format!(
                "{input:?} is not allowed while {:?}",
                self.phase
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(inputs: &[AuthInput]) -> Result<AuthPhase, DomainError> {
        let mut machine = AuthMachine::new();
        for input in inputs {
            machine.execute(input)?;
        }
        Ok(machine.phase())
    }

    #[test]
    fn password_login() {
        assert_eq!(
            run(&[AuthInput::Begin, AuthInput::Succeeded]),
            Ok(AuthPhase::Authenticated)
        );
    }

    #[test]
    fn two_factor_login() {
        assert_eq!(
            run(&[
                AuthInput::Begin,
                AuthInput::ChallengeIssued,
                AuthInput::Rejected,
                AuthInput::Succeeded
            ]),
            Ok(AuthPhase::Authenticated)
        );
        assert_eq!(
            run(&[AuthInput::ResumeChallenge, AuthInput::Succeeded]),
            Ok(AuthPhase::Authenticated)
        );
    }

    #[test]
    fn verified_context_then_expiry() {
        assert_eq!(
            run(&[
                AuthInput::Begin,
                AuthInput::Succeeded,
                AuthInput::ContextVerified,
                AuthInput::Expired,
                AuthInput::SignedOut
            ]),
            Ok(AuthPhase::Anonymous)
        );
    }

    #[test]
    fn rejects_illegal_transitions() {
        assert!(run(&[AuthInput::Succeeded]).is_err());
        assert!(run(&[AuthInput::ContextVerified]).is_err());
        assert!(run(&[AuthInput::Begin, AuthInput::ResumeChallenge]).is_err());
        assert!(run(&[AuthInput::Begin, AuthInput::Succeeded, AuthInput::ChallengeIssued]).is_err());
    }

    #[test]
    fn self_transitions_emit_nothing() {
        let mut machine = AuthMachine::new();
        assert_eq!(machine.execute(&AuthInput::SignedOut), Ok(Vec::new()));
        assert_eq!(machine.execute(&AuthInput::Expired), Ok(Vec::new()));
    }
}
