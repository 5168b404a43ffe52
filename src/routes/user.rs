use axum::Json;
use axum::extract::{Extension, State};
use tracing::instrument;

use crate::core::error::Error;
use crate::core::state::AppState;
use crate::token::claims::AccessClaims;
use crate::types::response;

#[instrument(skip_all, fields(user_id = claims.user_id))]
pub(crate) async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<Json<Vec<response::User>>, Error> {
    let users = state.user_controller.list_users().await?;

    Ok(Json(users))
}
