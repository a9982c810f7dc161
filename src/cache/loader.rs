//! Local feed loader
//!
//! Coordinates saving, loading and validating the cached feed against a
//! [`FeedStore`] and a [`FeedCachePolicy`]. The loader never keeps the feed in
//! memory; every call round-trips through the store.
//!
//! Each operation submits its first store call before returning, so calls made
//! back to back reach the store in call order. Two call styles are offered:
//!
//! - `save`/`load`/`validate_cache` return a future borrowing the loader.
//! - `spawn_save`/`spawn_load`/`spawn_validate_cache` run the operation on a
//!   Tokio task and hand the result to a completion closure. The task only
//!   holds a weak reference: once the loader is dropped, the completion is never
//!   called and no follow-up store call is made.

use super::conversions;
use super::policy::FeedCachePolicy;
use crate::store::FeedStore;
use crate::{FeedCacheError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed::{FeedItem, FeedLoader};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

type Clock = dyn Fn() -> DateTime<Utc> + Send + Sync;

/// Result of validating the cache
#[derive(Debug)]
pub enum ValidationOutcome {
    /// The cache was empty or still fresh and was left alone
    Validated,
    /// The cache was deleted
    Deleted(DeletionReason),
}

impl ValidationOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, ValidationOutcome::Deleted(_))
    }
}

/// Why validation deleted the cache
#[derive(Debug)]
pub enum DeletionReason {
    /// The record had reached the maximum age
    Expired { timestamp: DateTime<Utc> },
    /// The record could not be read
    Unreadable(FeedCacheError),
}

struct LoaderState<S: ?Sized> {
    policy: FeedCachePolicy,
    current_date: Box<Clock>,
    store: Arc<S>,
}

impl<S: ?Sized> LoaderState<S> {
    fn is_fresh(&self, timestamp: DateTime<Utc>) -> bool {
        !self.policy.validate(timestamp, (self.current_date)()).is_expired()
    }
}

/// Cache coordinator in front of a feed store
pub struct LocalFeedLoader<S: ?Sized = dyn FeedStore> {
    state: Arc<LoaderState<S>>,
}

impl<S: FeedStore + ?Sized + 'static> LocalFeedLoader<S> {
    /// Loader using the default seven day policy and the given clock
    pub fn new<C>(store: Arc<S>, current_date: C) -> Self
    where
        C: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self::with_policy(store, current_date, FeedCachePolicy::default())
    }

    pub fn with_policy<C>(store: Arc<S>, current_date: C, policy: FeedCachePolicy) -> Self
    where
        C: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self {
            state: Arc::new(LoaderState {
                policy,
                current_date: Box::new(current_date),
                store,
            }),
        }
    }

    /// Loader reading the system clock
    pub fn with_system_clock(store: Arc<S>) -> Self {
        Self::new(store, Utc::now)
    }

    pub fn policy(&self) -> FeedCachePolicy {
        self.state.policy
    }

    pub fn store(&self) -> &Arc<S> {
        &self.state.store
    }

    /// Replace the cached feed with `feed`, stamped with the current time
    ///
    /// The previous record is deleted first. If that fails the error is
    /// returned and nothing is inserted.
    pub fn save(&self, feed: &[FeedItem]) -> impl Future<Output = Result<()>> + Send + '_ {
        let pending = self.begin_save(feed);
        async move { pending.await.unwrap_or(Err(FeedCacheError::LoaderReleased)) }
    }

    /// The cached feed if it is still fresh, otherwise an empty feed
    ///
    /// Never modifies the store.
    pub fn load(&self) -> impl Future<Output = Result<Vec<FeedItem>>> + Send + '_ {
        let pending = self.begin_load();
        async move { pending.await.unwrap_or(Err(FeedCacheError::LoaderReleased)) }
    }

    /// Delete the cached feed if it expired or cannot be read
    ///
    /// A failed retrieval triggers exactly one corrective delete. When that
    /// delete fails its error is returned; when it succeeds the retrieval error
    /// is reported as [`DeletionReason::Unreadable`].
    pub fn validate_cache(&self) -> impl Future<Output = Result<ValidationOutcome>> + Send + '_ {
        let pending = self.begin_validate();
        async move { pending.await.unwrap_or(Err(FeedCacheError::LoaderReleased)) }
    }

    /// Run [`save`](Self::save) on a Tokio task
    ///
    /// `completion` is skipped if the loader is dropped first. Must be called
    /// from within a Tokio runtime.
    pub fn spawn_save<F>(&self, feed: &[FeedItem], completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        spawn_guarded("save", self.begin_save(feed), completion)
    }

    /// Run [`load`](Self::load) on a Tokio task
    pub fn spawn_load<F>(&self, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Vec<FeedItem>>) + Send + 'static,
    {
        spawn_guarded("load", self.begin_load(), completion)
    }

    /// Run [`validate_cache`](Self::validate_cache) on a Tokio task
    pub fn spawn_validate_cache<F>(&self, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<ValidationOutcome>) + Send + 'static,
    {
        spawn_guarded("validate", self.begin_validate(), completion)
    }

    // The begin_* futures resolve to None when the loader was dropped while a
    // store call was pending.

    fn begin_save(
        &self,
        feed: &[FeedItem],
    ) -> impl Future<Output = Option<Result<()>>> + Send + 'static {
        let local = conversions::to_local(feed);
        tracing::info!(items = local.len(), "Saving feed to cache");

        let deletion = self.state.store.delete_cached_feed();
        let state = Arc::downgrade(&self.state);

        async move {
            let deleted = deletion.await;
            let insertion = {
                let loader = state.upgrade()?;
                if let Err(error) = deleted {
                    tracing::warn!(error = %error, "Could not clear cache before saving");
                    return Some(Err(error));
                }
                let timestamp = (loader.current_date)();
                loader.store.insert(local, timestamp)
            };

            let inserted = insertion.await;
            state.upgrade()?;
            Some(inserted)
        }
    }

    fn begin_load(&self) -> impl Future<Output = Option<Result<Vec<FeedItem>>>> + Send + 'static {
        let retrieval = self.state.store.retrieve();
        let state = Arc::downgrade(&self.state);

        async move {
            let retrieved = retrieval.await;
            let loader = state.upgrade()?;
            Some(retrieved.map(|cached| match cached {
                Some(cached) if loader.is_fresh(cached.timestamp) => {
                    conversions::to_feed(cached.feed)
                }
                Some(cached) => {
                    tracing::debug!(timestamp = %cached.timestamp, "Cached feed expired");
                    Vec::new()
                }
                None => Vec::new(),
            }))
        }
    }

    fn begin_validate(
        &self,
    ) -> impl Future<Output = Option<Result<ValidationOutcome>>> + Send + 'static {
        let retrieval = self.state.store.retrieve();
        let state = Arc::downgrade(&self.state);

        async move {
            let retrieved = retrieval.await;
            let (deletion, reason) = {
                let loader = state.upgrade()?;
                match retrieved {
                    Ok(None) => return Some(Ok(ValidationOutcome::Validated)),
                    Ok(Some(cached)) if loader.is_fresh(cached.timestamp) => {
                        return Some(Ok(ValidationOutcome::Validated))
                    }
                    Ok(Some(cached)) => {
                        tracing::info!(timestamp = %cached.timestamp, "Deleting expired cache");
                        (
                            loader.store.delete_cached_feed(),
                            DeletionReason::Expired {
                                timestamp: cached.timestamp,
                            },
                        )
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "Cache unreadable, deleting it");
                        (
                            loader.store.delete_cached_feed(),
                            DeletionReason::Unreadable(error),
                        )
                    }
                }
            };

            let deleted = deletion.await;
            state.upgrade()?;
            Some(deleted.map(|()| ValidationOutcome::Deleted(reason)))
        }
    }
}

fn spawn_guarded<T, P, F>(operation: &'static str, pending: P, completion: F) -> JoinHandle<()>
where
    T: Send + 'static,
    P: Future<Output = Option<Result<T>>> + Send + 'static,
    F: FnOnce(Result<T>) + Send + 'static,
{
    tokio::spawn(async move {
        match pending.await {
            Some(result) => completion(result),
            None => tracing::debug!(operation, "Feed loader dropped, discarding result"),
        }
    })
}

#[async_trait]
impl<S: FeedStore + ?Sized + 'static> FeedLoader for LocalFeedLoader<S> {
    type Error = FeedCacheError;

    async fn load(&self) -> Result<Vec<FeedItem>> {
        LocalFeedLoader::load(self).await
    }
}
