//! BFF application wiring (Axum router + shared state).
//!
//! - `routes/`: HTTP handlers (one file per area)
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: error bodies and `Set-Cookie` plumbing

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;

use paydesk_session::{CookieJar, HttpAuthApi, SessionConfig, TokenLifecycle};

use crate::config::BffConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Shared per-process state. Sessions themselves live in the cookies; a
/// [`TokenLifecycle`] is rebuilt from them on every request.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<HttpAuthApi>,
    pub session: SessionConfig,
}

impl AppState {
    pub fn lifecycle(&self, jar: CookieJar) -> TokenLifecycle<HttpAuthApi> {
        TokenLifecycle::new(self.api.clone(), self.session.clone(), jar)
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: &BffConfig) -> anyhow::Result<Router> {
    let api = HttpAuthApi::new(&config.upstream)?;
    Ok(router(AppState {
        api: Arc::new(api),
        session: config.session.clone(),
    }))
}

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/login", post(routes::auth::login))
        .route("/2fa", post(routes::auth::second_factor))
        .route("/logout", post(routes::auth::logout));

    // Routes that need a session token.
    let protected = Router::new()
        .route("/refresh", post(routes::auth::refresh))
        .route("/me", get(routes::auth::me))
        .route("/switch-context", post(routes::auth::switch_context))
        .route("/verify-switch", post(routes::auth::verify_switch))
        .route("/permissions/explain", get(routes::permissions::explain))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/auth", public.merge(protected))
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::trace_requests)))
        .with_state(state)
}
