use axum::BoxError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Missing setting: {0}")]
    MissingSetting(&'static str),
    #[error("ACCESS_SECRET and REFRESH_SECRET must differ")]
    SharedSecret,
    #[error("Database migration error: {0}")]
    DatabaseMigration(#[from] sqlx::migrate::MigrateError),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
    #[error("Store call timed out")]
    StoreTimeout,
    #[error("Signing error: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("Token already issued")]
    DuplicateIssuance,
    #[error("Partial write: {0}")]
    PartialWrite(#[source] sqlx::Error),
    #[error("Invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("Expired token")]
    ExpiredToken,
    #[error("No credentials provided")]
    NoCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid token kind: {0}")]
    InvalidTokenKind(String),
    #[error("Invalid username")]
    InvalidUsername,
    #[error("Invalid password: {0}")]
    InvalidPassword(String),
    #[error("User already exists")]
    UserAlreadyExists,
    #[error("Bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("Invalid header value: {0}")]
    HeaderDecode(#[from] axum::http::header::ToStrError),
}

impl Error {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Error::StoreUnavailable(_)
            | Error::StoreTimeout
            | Error::Signing(_)
            | Error::PartialWrite(_)
            | Error::InvalidTokenKind(_)
            | Error::Bcrypt(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::DuplicateIssuance | Error::UserAlreadyExists => StatusCode::CONFLICT,
            Error::InvalidToken(_)
            | Error::ExpiredToken
            | Error::NoCredentials
            | Error::Unauthorized
            | Error::HeaderDecode(_) => StatusCode::UNAUTHORIZED,
            Error::InvalidUsername | Error::InvalidPassword(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Error::StoreUnavailable(_) | Error::StoreTimeout => "Store unavailable",
            Error::Signing(_) => "Token signing failed",
            Error::DuplicateIssuance => "Token already issued",
            Error::PartialWrite(_) => "Token could not be stored",
            Error::InvalidToken(_) | Error::HeaderDecode(_) => "Invalid token",
            Error::ExpiredToken => "Expired token",
            Error::NoCredentials => "No credentials provided",
            Error::Unauthorized => "Unauthorized",
            Error::InvalidUsername => "Invalid username",
            Error::InvalidPassword(_) => "Password must be at least 8 characters",
            Error::UserAlreadyExists => "User already exists",
            Error::InvalidTokenKind(_) | Error::Bcrypt(_) => "Internal server error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("{:?}", self);
        } else {
            tracing::debug!("{:?}", self);
        }

        (status, self.public_message()).into_response()
    }
}

pub(crate) async fn handle_middleware_errors(err: BoxError) -> (StatusCode, &'static str) {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("Request timed out");
        return (StatusCode::REQUEST_TIMEOUT, "Request timed out");
    }

    tracing::error!("Unhandled error: {:?}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_are_server_errors() {
        assert_eq!(
            Error::StoreUnavailable(sqlx::Error::PoolTimedOut).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(Error::StoreTimeout.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            Error::PartialWrite(sqlx::Error::PoolClosed).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn verification_failures_are_unauthorized() {
        assert_eq!(Error::NoCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::ExpiredToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn responses_hide_internal_detail() {
        let response = Error::StoreUnavailable(sqlx::Error::Protocol(
            "connection reset by 10.0.0.3".into(),
        ))
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Store unavailable");
    }
}
