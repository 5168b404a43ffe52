use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use uuid::Uuid;

use crate::core::config::Args;
use crate::core::error::Error;
use crate::token::claims::{AccessClaims, RefreshClaims, SubjectId, TokenPair};

pub(crate) const ACCESS_TOKEN_MINUTES: i64 = 15;
pub(crate) const REFRESH_TOKEN_DAYS: i64 = 7;

#[derive(Clone)]
pub(crate) struct TokenIssuer {
    access_key: EncodingKey,
    refresh_key: EncodingKey,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub(crate) fn new(args: &Args) -> Self {
        Self {
            access_key: EncodingKey::from_secret(args.access_secret.as_bytes()),
            refresh_key: EncodingKey::from_secret(args.refresh_secret.as_bytes()),
        }
    }

    pub(crate) fn issue(&self, subject_id: SubjectId) -> Result<TokenPair, Error> {
        self.issue_at(subject_id, Utc::now())
    }

    /// Builds and signs both tokens as of `now`. Fails as a whole if either
    /// signature cannot be produced.
    pub(crate) fn issue_at(
        &self,
        subject_id: SubjectId,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, Error> {
        let access_unique_id = Uuid::new_v4().to_string();
        let refresh_unique_id = Uuid::new_v4().to_string();

        let access_expires_at = (now + Duration::minutes(ACCESS_TOKEN_MINUTES)).timestamp();
        let refresh_expires_at = (now + Duration::days(REFRESH_TOKEN_DAYS)).timestamp();

        let access_token = self.sign_access(&AccessClaims {
            authorized: true,
            access_uuid: access_unique_id.clone(),
            user_id: subject_id,
            exp: access_expires_at,
        })?;

        let refresh_token = self.sign_refresh(&RefreshClaims {
            refresh_uuid: refresh_unique_id.clone(),
            user_id: subject_id,
            exp: refresh_expires_at,
        })?;

        tracing::debug!(subject_id, access_unique_id = %access_unique_id, "issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_unique_id,
            refresh_unique_id,
            access_expires_at,
            refresh_expires_at,
        })
    }

    pub(crate) fn sign_access(&self, claims: &AccessClaims) -> Result<String, Error> {
        sign(claims, &self.access_key)
    }

    pub(crate) fn sign_refresh(&self, claims: &RefreshClaims) -> Result<String, Error> {
        sign(claims, &self.refresh_key)
    }
}

fn sign<T: Serialize>(claims: &T, key: &EncodingKey) -> Result<String, Error> {
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, key).map_err(Error::Signing)
}
