use chrono::Utc;
use std::future::Future;
use std::time::Duration;

use crate::core::config::Args;
use crate::core::error::Error;
use crate::token::claims::{AccessClaims, SubjectId, TokenKind, TokenPair};
use crate::token::issuer::TokenIssuer;
use crate::token::store::{RecordFilter, RecordKey, TokenStore};
use crate::token::verifier::{AccessTokenDecoder, Verifier};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Ack {
    Stored,
    AlreadyIssued,
}

#[derive(Clone)]
pub(crate) struct TokenController<T: TokenStore> {
    issuer: TokenIssuer,
    decoder: AccessTokenDecoder,
    token_store: T,
    store_timeout: Duration,
}

impl<T: TokenStore> TokenController<T> {
    pub(crate) fn new(args: &Args, token_store: T) -> Self {
        Self {
            issuer: TokenIssuer::new(args),
            decoder: AccessTokenDecoder::new(args),
            token_store,
            store_timeout: args.store_timeout(),
        }
    }

    pub(crate) fn issue(&self, subject_id: SubjectId) -> Result<TokenPair, Error> {
        self.issuer.issue(subject_id)
    }

    /// Records both halves of `pair`. Retrying with the same pair is a no-op
    /// that reports `Ack::AlreadyIssued`.
    pub(crate) async fn persist(
        &self,
        subject_id: SubjectId,
        pair: &TokenPair,
    ) -> Result<Ack, Error> {
        let now = Utc::now().timestamp();
        let (access, refresh) = pair.records(subject_id);

        let reaped = self
            .with_timeout(self.token_store.delete_expired(now))
            .await?;
        if reaped > 0 {
            tracing::debug!(reaped, "removed expired token records");
        }

        let filter = RecordFilter::any_of(vec![RecordKey::from(&access), RecordKey::from(&refresh)]);
        let existing = self.with_timeout(self.token_store.find(&filter)).await?;

        if !existing.is_empty() {
            tracing::debug!(subject_id, "token pair already issued, skipping insert");
            return Ok(Ack::AlreadyIssued);
        }

        // The unique index is the real guard, the lookup above only saves a round trip.
        match self
            .with_timeout(self.token_store.insert_pair(&access, &refresh))
            .await
        {
            Ok(()) => {
                tracing::info!(subject_id, "stored token pair");
                Ok(Ack::Stored)
            }
            Err(Error::DuplicateIssuance) => {
                tracing::debug!(subject_id, "concurrent insert won, treating as issued");
                Ok(Ack::AlreadyIssued)
            }
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn issue_and_persist(&self, subject_id: SubjectId) -> Result<TokenPair, Error> {
        let pair = self.issue(subject_id)?;

        self.persist(subject_id, &pair).await?;

        Ok(pair)
    }

    pub(crate) async fn authenticate(&self, presented: &str) -> Result<AccessClaims, Error> {
        if presented.is_empty() {
            return Err(Error::NoCredentials);
        }

        let claims = self.decoder.decode(presented)?;

        let filter = RecordFilter::any_of(vec![RecordKey {
            kind: TokenKind::Access,
            unique_id: claims.access_uuid.clone(),
        }])
        .live_at(Utc::now().timestamp());

        let records = self.with_timeout(self.token_store.find(&filter)).await?;

        if !records
            .iter()
            .any(|record| record.subject_id == claims.user_id)
        {
            return Err(Error::Unauthorized);
        }

        Ok(claims)
    }

    async fn with_timeout<R>(
        &self,
        call: impl Future<Output = Result<R, Error>>,
    ) -> Result<R, Error> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| Error::StoreTimeout)?
    }
}

impl<T: TokenStore> Verifier for TokenController<T> {
    async fn verify(&self, presented: &str) -> bool {
        match self.authenticate(presented).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("token rejected: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::test_args;
    use crate::token::claims::IssuedTokenRecord;
    use crate::token::memory::MemoryTokenStore;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use chrono::Duration as ChronoDuration;
    use std::collections::HashSet;

    #[derive(Clone)]
    struct UnreachableStore;

    impl TokenStore for UnreachableStore {
        async fn find(&self, _filter: &RecordFilter) -> Result<Vec<IssuedTokenRecord>, Error> {
            Err(Error::StoreUnavailable(sqlx::Error::PoolTimedOut))
        }

        async fn insert_pair(
            &self,
            _access: &IssuedTokenRecord,
            _refresh: &IssuedTokenRecord,
        ) -> Result<(), Error> {
            Err(Error::StoreUnavailable(sqlx::Error::PoolTimedOut))
        }

        async fn delete_expired(&self, _now: i64) -> Result<u64, Error> {
            Err(Error::StoreUnavailable(sqlx::Error::PoolTimedOut))
        }
    }

    #[derive(Clone)]
    struct SlowStore;

    impl TokenStore for SlowStore {
        async fn find(&self, _filter: &RecordFilter) -> Result<Vec<IssuedTokenRecord>, Error> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        async fn insert_pair(
            &self,
            _access: &IssuedTokenRecord,
            _refresh: &IssuedTokenRecord,
        ) -> Result<(), Error> {
            Ok(())
        }

        async fn delete_expired(&self, _now: i64) -> Result<u64, Error> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(0)
        }
    }

    /// Fails the refresh half of every pair, like a connection dropping mid-write.
    #[derive(Clone, Default)]
    struct TornWriteStore {
        inner: MemoryTokenStore,
    }

    impl TokenStore for TornWriteStore {
        async fn find(&self, filter: &RecordFilter) -> Result<Vec<IssuedTokenRecord>, Error> {
            self.inner.find(filter).await
        }

        async fn insert_pair(
            &self,
            _access: &IssuedTokenRecord,
            _refresh: &IssuedTokenRecord,
        ) -> Result<(), Error> {
            Err(Error::PartialWrite(sqlx::Error::PoolClosed))
        }

        async fn delete_expired(&self, now: i64) -> Result<u64, Error> {
            self.inner.delete_expired(now).await
        }
    }

    fn controller() -> (TokenController<MemoryTokenStore>, MemoryTokenStore) {
        let store = MemoryTokenStore::default();
        (TokenController::new(&test_args(), store.clone()), store)
    }

    #[tokio::test]
    async fn issued_and_persisted_token_verifies() {
        let (controller, store) = controller();

        let pair = controller.issue(42).unwrap();
        assert_eq!(controller.persist(42, &pair).await.unwrap(), Ack::Stored);

        assert!(controller.verify(&pair.access_token).await);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn authenticate_returns_claims() {
        let (controller, _store) = controller();
        let pair = controller.issue_and_persist(42).await.unwrap();

        let claims = controller.authenticate(&pair.access_token).await.unwrap();

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.access_uuid, pair.access_unique_id);
    }

    #[tokio::test]
    async fn persisting_the_same_pair_twice_stores_it_once() {
        let (controller, store) = controller();
        let pair = controller.issue(42).unwrap();

        assert_eq!(controller.persist(42, &pair).await.unwrap(), Ack::Stored);
        assert_eq!(
            controller.persist(42, &pair).await.unwrap(),
            Ack::AlreadyIssued
        );

        let records = store.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(
            records
                .iter()
                .filter(|record| record.kind == TokenKind::Access)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn concurrent_retries_of_one_pair_store_it_once() {
        let (controller, store) = controller();
        let pair = controller.issue(42).unwrap();

        let (first, second) =
            tokio::join!(controller.persist(42, &pair), controller.persist(42, &pair));

        let mut acks = vec![first.unwrap(), second.unwrap()];
        acks.sort_by_key(|ack| *ack == Ack::AlreadyIssued);

        assert_eq!(acks, vec![Ack::Stored, Ack::AlreadyIssued]);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn concurrent_logins_never_share_unique_ids() {
        let (controller, store) = controller();

        let (first, second) = tokio::join!(
            controller.issue_and_persist(42),
            controller.issue_and_persist(42)
        );
        first.unwrap();
        second.unwrap();

        let records = store.records().await;
        let ids: HashSet<_> = records
            .iter()
            .map(|record| (record.kind, record.unique_id.clone()))
            .collect();

        assert_eq!(records.len(), 4);
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn unreachable_store_fails_login_with_server_error() {
        let controller = TokenController::new(&test_args(), UnreachableStore);

        let pair = controller.issue(42).unwrap();
        assert!(!pair.access_token.is_empty());

        let err = controller.persist(42, &pair).await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));

        let err = controller.issue_and_persist(42).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn verification_fails_closed_when_store_is_down() {
        let (issuing, _store) = controller();
        let pair = issuing.issue_and_persist(42).await.unwrap();

        let controller = TokenController::new(&test_args(), UnreachableStore);

        assert!(!controller.verify(&pair.access_token).await);
        assert!(matches!(
            controller.authenticate(&pair.access_token).await,
            Err(Error::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn slow_store_times_out() {
        let args = Args {
            store_timeout_ms: 20,
            ..test_args()
        };
        let controller = TokenController::new(&args, SlowStore);
        let pair = controller.issue(42).unwrap();

        assert!(matches!(
            controller.persist(42, &pair).await,
            Err(Error::StoreTimeout)
        ));
        assert!(!controller.verify(&pair.access_token).await);
    }

    #[tokio::test]
    async fn torn_write_is_reported() {
        let controller = TokenController::new(&test_args(), TornWriteStore::default());
        let pair = controller.issue(42).unwrap();

        assert!(matches!(
            controller.persist(42, &pair).await,
            Err(Error::PartialWrite(_))
        ));
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let (controller, _store) = controller();

        assert!(!controller.verify("").await);
        assert!(matches!(
            controller.authenticate("").await,
            Err(Error::NoCredentials)
        ));
    }

    #[tokio::test]
    async fn signed_but_unpersisted_token_is_rejected() {
        let (controller, _store) = controller();
        let pair = controller.issue(42).unwrap();

        assert!(!controller.verify(&pair.access_token).await);
    }

    #[tokio::test]
    async fn token_signed_with_another_secret_is_rejected() {
        let (controller, store) = controller();
        let foreign = TokenController::new(
            &Args {
                access_secret: "someone-elses-secret".into(),
                ..test_args()
            },
            store,
        );

        let pair = foreign.issue_and_persist(42).await.unwrap();

        assert!(!controller.verify(&pair.access_token).await);
    }

    #[tokio::test]
    async fn refresh_token_does_not_open_protected_routes() {
        let (controller, _store) = controller();
        let pair = controller.issue_and_persist(42).await.unwrap();

        assert!(!controller.verify(&pair.refresh_token).await);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let (controller, store) = controller();
        let pair = controller
            .issuer
            .issue_at(42, Utc::now() - ChronoDuration::minutes(20))
            .unwrap();
        let (access, refresh) = pair.records(42);
        store.insert_pair(&access, &refresh).await.unwrap();

        assert!(!controller.verify(&pair.access_token).await);
    }

    #[tokio::test]
    async fn record_for_another_subject_does_not_match() {
        let (controller, store) = controller();
        let pair = controller.issue(42).unwrap();
        let (mut access, refresh) = pair.records(42);
        access.subject_id = 7;
        store.insert_pair(&access, &refresh).await.unwrap();

        assert!(!controller.verify(&pair.access_token).await);
    }

    #[tokio::test]
    async fn persisting_reaps_expired_records() {
        let (controller, store) = controller();
        let stale = controller
            .issuer
            .issue_at(42, Utc::now() - ChronoDuration::days(8))
            .unwrap();
        let (access, refresh) = stale.records(42);
        store.insert_pair(&access, &refresh).await.unwrap();

        let fresh = controller.issue_and_persist(42).await.unwrap();

        let records = store.records().await;
        assert_eq!(records.len(), 2);
        assert!(
            records
                .iter()
                .all(|record| record.unique_id != stale.access_unique_id
                    && record.unique_id != stale.refresh_unique_id)
        );
        assert!(controller.verify(&fresh.access_token).await);
    }
}
