use serde::Serialize;

use crate::token::claims::TokenPair;

#[derive(Debug, Serialize)]
pub(crate) struct Login {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
    pub(crate) access_expires_at: i64,
    pub(crate) refresh_expires_at: i64,
}

impl From<TokenPair> for Login {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            access_expires_at: pair.access_expires_at,
            refresh_expires_at: pair.refresh_expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct User {
    pub(crate) id: i64,
    pub(crate) username: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenStatus {
    pub(crate) valid: bool,
}
