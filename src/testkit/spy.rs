//! Store spy
//!
//! Records every message it receives and hands out futures that stay pending
//! until the test completes them, so tests control exactly when and how each
//! store operation resolves.

use crate::cache::{CachedFeed, LocalFeedItem};
use crate::store::{FeedStore, StoreFuture};
use crate::{FeedCacheError, Result};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// A message the spy received, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedMessage {
    DeleteCachedFeed,
    Insert(Vec<LocalFeedItem>, DateTime<Utc>),
    Retrieve,
}

type Completion<T> = Option<oneshot::Sender<Result<T>>>;

#[derive(Default)]
struct SpyState {
    messages: Vec<ReceivedMessage>,
    deletions: Vec<Completion<()>>,
    insertions: Vec<Completion<()>>,
    retrievals: Vec<Completion<Option<CachedFeed>>>,
}

/// A [`FeedStore`] driven by the test
#[derive(Default)]
pub struct FeedStoreSpy {
    state: Mutex<SpyState>,
}

impl FeedStoreSpy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far
    pub fn received_messages(&self) -> Vec<ReceivedMessage> {
        self.state().messages.clone()
    }

    pub fn complete_deletion(&self, result: Result<()>, index: usize) {
        let sender = self.state().deletions.get_mut(index).and_then(Option::take);
        deliver(sender, result, "deletion", index);
    }

    pub fn complete_deletion_successfully(&self, index: usize) {
        self.complete_deletion(Ok(()), index);
    }

    pub fn complete_deletion_with_error(&self, error: FeedCacheError, index: usize) {
        self.complete_deletion(Err(error), index);
    }

    pub fn complete_insertion(&self, result: Result<()>, index: usize) {
        let sender = self.state().insertions.get_mut(index).and_then(Option::take);
        deliver(sender, result, "insertion", index);
    }

    pub fn complete_insertion_successfully(&self, index: usize) {
        self.complete_insertion(Ok(()), index);
    }

    pub fn complete_insertion_with_error(&self, error: FeedCacheError, index: usize) {
        self.complete_insertion(Err(error), index);
    }

    pub fn complete_retrieval(&self, result: Result<Option<CachedFeed>>, index: usize) {
        let sender = self.state().retrievals.get_mut(index).and_then(Option::take);
        deliver(sender, result, "retrieval", index);
    }

    pub fn complete_retrieval_with_empty_cache(&self, index: usize) {
        self.complete_retrieval(Ok(None), index);
    }

    pub fn complete_retrieval_with_feed(
        &self,
        feed: Vec<LocalFeedItem>,
        timestamp: DateTime<Utc>,
        index: usize,
    ) {
        self.complete_retrieval(Ok(Some(CachedFeed::new(feed, timestamp))), index);
    }

    pub fn complete_retrieval_with_error(&self, error: FeedCacheError, index: usize) {
        self.complete_retrieval(Err(error), index);
    }

    fn state(&self) -> MutexGuard<'_, SpyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn deliver<T>(sender: Completion<T>, result: Result<T>, operation: &str, index: usize) {
    match sender {
        // A dropped receiver means the caller gave up on the result; nothing to assert
        Some(sender) => {
            let _ = sender.send(result);
        }
        None => panic!("no pending {} at index {}", operation, index),
    }
}

fn pending<T: Send + 'static>(receiver: oneshot::Receiver<Result<T>>) -> StoreFuture<T> {
    Box::pin(async move {
        match receiver.await {
            Ok(result) => result,
            Err(_) => Err(FeedCacheError::StoreUnavailable(
                "spy dropped the completion".to_string(),
            )),
        }
    })
}

impl FeedStore for FeedStoreSpy {
    fn retrieve(&self) -> StoreFuture<Option<CachedFeed>> {
        let (sender, receiver) = oneshot::channel();
        let mut state = self.state();
        state.messages.push(ReceivedMessage::Retrieve);
        state.retrievals.push(Some(sender));
        pending(receiver)
    }

    fn insert(&self, feed: Vec<LocalFeedItem>, timestamp: DateTime<Utc>) -> StoreFuture<()> {
        let (sender, receiver) = oneshot::channel();
        let mut state = self.state();
        state.messages.push(ReceivedMessage::Insert(feed, timestamp));
        state.insertions.push(Some(sender));
        pending(receiver)
    }

    fn delete_cached_feed(&self) -> StoreFuture<()> {
        let (sender, receiver) = oneshot::channel();
        let mut state = self.state();
        state.messages.push(ReceivedMessage::DeleteCachedFeed);
        state.deletions.push(Some(sender));
        pending(receiver)
    }
}
