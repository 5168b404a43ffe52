use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::error::Error;
use crate::token::claims::IssuedTokenRecord;
use crate::token::store::{RecordFilter, RecordKey, TokenStore};

#[derive(Clone, Default)]
pub(crate) struct MemoryTokenStore {
    records: Arc<Mutex<HashMap<RecordKey, IssuedTokenRecord>>>,
}

impl MemoryTokenStore {
    pub(crate) async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub(crate) async fn records(&self) -> Vec<IssuedTokenRecord> {
        self.records.lock().await.values().cloned().collect()
    }
}

impl TokenStore for MemoryTokenStore {
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<IssuedTokenRecord>, Error> {
        let records = self.records.lock().await;

        Ok(records
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn insert_pair(
        &self,
        access: &IssuedTokenRecord,
        refresh: &IssuedTokenRecord,
    ) -> Result<(), Error> {
        let mut records = self.records.lock().await;

        let access_key = RecordKey::from(access);
        let refresh_key = RecordKey::from(refresh);

        if records.contains_key(&access_key) || records.contains_key(&refresh_key) {
            return Err(Error::DuplicateIssuance);
        }

        records.insert(access_key, access.clone());
        records.insert(refresh_key, refresh.clone());

        Ok(())
    }

    async fn delete_expired(&self, now: i64) -> Result<u64, Error> {
        let mut records = self.records.lock().await;
        let before = records.len();

        records.retain(|_, record| record.is_live(now));

        Ok((before - records.len()) as u64)
    }
}
