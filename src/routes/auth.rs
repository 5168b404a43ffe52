use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::instrument;

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::token::verifier::Verifier;
use crate::types::{request, response};

#[instrument(skip_all, fields(username = %user_data.username))]
pub(crate) async fn login(
    State(state): State<AppState>,
    Json(user_data): Json<request::LoginData>,
) -> Result<Json<response::Login>, Error> {
    let user = state
        .user_controller
        .login(&user_data.username, &user_data.password)
        .await?;

    let pair = state.token_controller.issue_and_persist(user.id).await?;

    Ok(Json(response::Login::from(pair)))
}

#[instrument(skip_all, fields(username = %user_data.username))]
pub(crate) async fn register(
    State(state): State<AppState>,
    Json(user_data): Json<request::LoginData>,
) -> Result<(StatusCode, Json<response::Login>), Error> {
    let user = state
        .user_controller
        .register(&user_data.username, &user_data.password)
        .await?;

    let pair = state.token_controller.issue_and_persist(user.id).await?;

    Ok((StatusCode::CREATED, Json(response::Login::from(pair))))
}

#[instrument(skip_all)]
pub(crate) async fn verify_token(
    State(state): State<AppState>,
    Json(params): Json<request::VerifyTokenData>,
) -> (StatusCode, Json<response::TokenStatus>) {
    let valid = state.token_controller.verify(&params.token).await;

    let status = match valid {
        true => StatusCode::OK,
        false => StatusCode::UNAUTHORIZED,
    };

    (status, Json(response::TokenStatus { valid }))
}
