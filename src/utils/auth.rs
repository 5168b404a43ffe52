use axum::extract::State;
use axum::http::HeaderMap;
use axum::{body::Body, extract::Request, http, http::Response, middleware::Next};

use crate::core::error::Error;
use crate::core::state::AppState;

/// Accepts `Bearer <token>` (scheme matched case-insensitively) as well as a
/// bare token in the header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, Error> {
    let Some(header) = headers.get(http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = header.to_str()?.trim();

    if value.eq_ignore_ascii_case("bearer") {
        return Ok(None);
    }

    let token = match value.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => value,
    };

    if token.is_empty() {
        return Ok(None);
    }

    Ok(Some(token.to_owned()))
}

pub(crate) async fn authorize(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response<Body>, Error> {
    let token = bearer_token(request.headers())?.ok_or(Error::NoCredentials)?;

    let claims = state.token_controller.authenticate(&token).await?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
