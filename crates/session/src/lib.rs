//! `paydesk-session`: session protocols on top of the upstream auth API.
//!
//! - `lifecycle`: the single writer of session state and cookies
//! - `switcher`: admin/vendor context switching with password re-verification
//! - `upstream`: the API contract (`AuthApi`) and its HTTP implementation
//! - `cookies`: cookie jar and the session cookie policy

pub mod config;
pub mod cookies;
pub mod lifecycle;
pub mod phase;
pub mod state;
pub mod switcher;
pub mod two_factor;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testing;

pub use config::SessionConfig;
pub use cookies::{CookieJar, CookieSameSite, SetCookie};
pub use lifecycle::{LoginOutcome, TokenLifecycle};
pub use phase::{AuthInput, AuthMachine, AuthPhase};
pub use state::{SessionReader, SessionState};
pub use switcher::{
    ContextSwitcher, PasswordPrompt, SwitchEvent, SwitchFailure, SwitchInput, SwitchOutcome,
    SwitcherState,
};
pub use two_factor::SecondFactor;
pub use upstream::{
    AuthApi, HttpAuthApi, LoginReply, LoginRequest, LoginResponse, Password, RefreshResponse,
    SwitchContextRequest, SwitchContextResponse, TwoFactorChallenge, UpstreamConfig,
};
