//! `/api/auth/*`: the token lifecycle over HTTP.
//!
//! Every handler rebuilds a [`TokenLifecycle`] from the request cookies, runs
//! one operation and returns whatever cookie writes it scheduled.

use axum::{
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use paydesk_auth::{AuthError, AuthResult};
use paydesk_session::{
    ContextSwitcher, HttpAuthApi, LoginRequest, SwitchOutcome, TokenLifecycle, TwoFactorChallenge,
};

use crate::app::dto::{
    LoginBody, LoginView, RefreshView, SecondFactorBody, SessionView, SwitchContextBody, SwitchView,
    VerifySwitchBody, VerifyView,
};
use crate::app::{errors, AppState};
use crate::context::SessionContext;
use crate::middleware::request_jar;

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginBody>,
) -> Response {
    let mut lifecycle = state.lifecycle(request_jar(&headers));
    let request = LoginRequest {
        email: body.email.trim().to_string(),
        password: body.password,
    };
    let result = lifecycle
        .login(&request)
        .await
        .map(|outcome| Json(LoginView::from(outcome)).into_response());
    respond(&mut lifecycle, result)
}

/// POST /api/auth/2fa
pub async fn second_factor(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SecondFactorBody>,
) -> Response {
    let factor = match body.factor() {
        Ok(factor) => factor,
        Err(err) => return errors::auth_error_response(&err, Vec::new(), &state.session),
    };
    let challenge = TwoFactorChallenge {
        two_factor_token: body.two_factor_token,
        methods: Vec::new(),
    };

    let mut lifecycle = state.lifecycle(request_jar(&headers));
    let result = lifecycle
        .submit_second_factor(&challenge, &factor)
        .await
        .map(|outcome| Json(LoginView::from(outcome)).into_response());
    respond(&mut lifecycle, result)
}

/// POST /api/auth/logout. Always 204.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut lifecycle = state.lifecycle(request_jar(&headers));
    lifecycle.logout().await;
    errors::with_cookies(StatusCode::NO_CONTENT.into_response(), lifecycle.take_set_cookies())
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    let mut lifecycle = state.lifecycle(session.into_jar());
    let result = lifecycle.refresh().await.map(|token| {
        Json(RefreshView {
            expires_at: token.expires_at(),
        })
        .into_response()
    });
    respond(&mut lifecycle, result)
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Response {
    let mut lifecycle = state.lifecycle(session.into_jar());
    let result = match lifecycle.fetch_current_user().await {
        Ok(user) => Ok(Json(SessionView::new(user, &lifecycle.state())).into_response()),
        Err(err) => Err(err),
    };
    respond(&mut lifecycle, result)
}

/// POST /api/auth/switch-context
pub async fn switch_context(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<SwitchContextBody>,
) -> Response {
    let mut lifecycle = state.lifecycle(session.into_jar());
    let result = switch(&mut lifecycle, body).await;
    respond(&mut lifecycle, result)
}

async fn switch(
    lifecycle: &mut TokenLifecycle<HttpAuthApi>,
    body: SwitchContextBody,
) -> AuthResult<Response> {
    let target = body.context_type;
    lifecycle.fetch_current_user().await?;

    let session = lifecycle.state();
    if !session.available_contexts.contains(&target) {
        return Err(AuthError::unauthorized(format!(
            "the {target} context is not available to this user"
        )));
    }

    let mut switcher = ContextSwitcher::for_session(&session);
    let view = match switcher.switch_to(lifecycle, target, body.password).await? {
        SwitchOutcome::Switched(context) => SwitchView {
            context: Some(context),
            switched: true,
            user: lifecycle.state().user,
        },
        SwitchOutcome::PasswordRequired => {
            return Err(AuthError::validation(format!(
                "password is required to enter the {target} context"
            )));
        }
        SwitchOutcome::Unchanged | SwitchOutcome::Cancelled => SwitchView {
            context: session.current_context,
            switched: false,
            user: None,
        },
    };
    Ok(Json(view).into_response())
}

/// POST /api/auth/verify-switch
pub async fn verify_switch(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<VerifySwitchBody>,
) -> Response {
    let mut lifecycle = state.lifecycle(session.into_jar());
    let result = lifecycle
        .verify_switch_password(body.password)
        .await
        .map(|verified| Json(VerifyView { verified }).into_response());
    respond(&mut lifecycle, result)
}

/// Attach the lifecycle's pending cookie writes to the outcome.
pub(crate) fn respond(lifecycle: &mut TokenLifecycle<HttpAuthApi>, result: AuthResult<Response>) -> Response {
    let cookies = lifecycle.take_set_cookies();
    match result {
        Ok(response) => errors::with_cookies(response, cookies),
        Err(err) => errors::auth_error_response(&err, cookies, lifecycle.config()),
    }
}
