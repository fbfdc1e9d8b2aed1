//! Authorization audit endpoint: "why can / can't I do X?".

use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use paydesk_auth::{explain as explain_authorization, CheckOptions, Permission};

use crate::app::dto::ExplainQuery;
use crate::app::routes::auth::respond;
use crate::app::{errors, AppState};
use crate::context::SessionContext;

/// GET /api/auth/permissions/explain?permission=View%20KYC&direct_only=true
pub async fn explain(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<ExplainQuery>,
) -> Response {
    let permission: Permission = match query.permission.parse() {
        Ok(permission) => permission,
        Err(err) => {
            return errors::json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", format!("{err}"));
        }
    };
    let options = if query.direct_only {
        CheckOptions::direct_only()
    } else {
        CheckOptions::default()
    };

    let mut lifecycle = state.lifecycle(session.into_jar());
    let result = lifecycle
        .fetch_current_user()
        .await
        .map(|user| Json(explain_authorization(Some(&user), permission, options)).into_response());
    respond(&mut lifecycle, result)
}
