use crate::core::error::Error;
use crate::token::claims::{IssuedTokenRecord, TokenKind};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct RecordKey {
    pub(crate) kind: TokenKind,
    pub(crate) unique_id: String,
}

impl From<&IssuedTokenRecord> for RecordKey {
    fn from(record: &IssuedTokenRecord) -> Self {
        Self {
            kind: record.kind,
            unique_id: record.unique_id.clone(),
        }
    }
}

/// Matches records whose key is any of `keys`, optionally only those still
/// live at `live_at`.
#[derive(Clone, Debug, Default)]
pub(crate) struct RecordFilter {
    pub(crate) keys: Vec<RecordKey>,
    pub(crate) live_at: Option<i64>,
}

impl RecordFilter {
    pub(crate) fn any_of(keys: Vec<RecordKey>) -> Self {
        Self {
            keys,
            live_at: None,
        }
    }

    pub(crate) fn live_at(mut self, now: i64) -> Self {
        self.live_at = Some(now);
        self
    }

    pub(crate) fn unique_ids(&self) -> Vec<String> {
        self.keys.iter().map(|key| key.unique_id.clone()).collect()
    }

    pub(crate) fn matches(&self, record: &IssuedTokenRecord) -> bool {
        let keyed = self
            .keys
            .iter()
            .any(|key| key.kind == record.kind && key.unique_id == record.unique_id);

        keyed && self.live_at.is_none_or(|now| record.is_live(now))
    }
}

pub(crate) trait TokenStore {
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<IssuedTokenRecord>, Error>;

    /// Writes both records or neither. A key that already exists yields
    /// `Error::DuplicateIssuance`.
    async fn insert_pair(
        &self,
        access: &IssuedTokenRecord,
        refresh: &IssuedTokenRecord,
    ) -> Result<(), Error>;

    /// Removes records whose expiry is at or before `now`, returning how many.
    async fn delete_expired(&self, now: i64) -> Result<u64, Error>;
}
