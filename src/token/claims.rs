use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::core::error::Error;

pub(crate) type SubjectId = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            other => Err(Error::InvalidTokenKind(other.to_owned())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) struct AccessClaims {
    pub(crate) authorized: bool,
    pub(crate) access_uuid: String,
    pub(crate) user_id: SubjectId,
    pub(crate) exp: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) struct RefreshClaims {
    pub(crate) refresh_uuid: String,
    pub(crate) user_id: SubjectId,
    pub(crate) exp: i64,
}

/// Persisted trace of a signed token. The signed string itself is never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct IssuedTokenRecord {
    pub(crate) unique_id: String,
    pub(crate) subject_id: SubjectId,
    pub(crate) expires_at: i64,
    pub(crate) kind: TokenKind,
}

impl IssuedTokenRecord {
    pub(crate) fn is_live(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

#[derive(Clone, Debug)]
pub(crate) struct TokenPair {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
    pub(crate) access_unique_id: String,
    pub(crate) refresh_unique_id: String,
    pub(crate) access_expires_at: i64,
    pub(crate) refresh_expires_at: i64,
}

impl TokenPair {
    pub(crate) fn records(&self, subject_id: SubjectId) -> (IssuedTokenRecord, IssuedTokenRecord) {
        (
            IssuedTokenRecord {
                unique_id: self.access_unique_id.clone(),
                subject_id,
                expires_at: self.access_expires_at,
                kind: TokenKind::Access,
            },
            IssuedTokenRecord {
                unique_id: self.refresh_unique_id.clone(),
                subject_id,
                expires_at: self.refresh_expires_at,
                kind: TokenKind::Refresh,
            },
        )
    }
}
