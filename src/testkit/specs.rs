//! Store behaviour assertions
//!
//! Every [`FeedStore`] implementation runs these against its own storage so
//! they all honour the same contract. Failure assertions expect the caller to
//! have arranged a store whose operation fails.

use super::fixtures;
use crate::cache::CachedFeed;
use crate::store::FeedStore;
use chrono::Duration;
use futures::FutureExt;

pub async fn assert_retrieve_delivers_empty_on_empty_cache(store: &dyn FeedStore) {
    let result = store.retrieve().await;
    assert!(matches!(result, Ok(None)), "expected empty, got {:?}", result);
}

pub async fn assert_retrieve_has_no_side_effects_on_empty_cache(store: &dyn FeedStore) {
    for _ in 0..2 {
        let result = store.retrieve().await;
        assert!(matches!(result, Ok(None)), "expected empty, got {:?}", result);
    }
}

pub async fn assert_retrieve_delivers_found_values_on_non_empty_cache(store: &dyn FeedStore) {
    let (feed, timestamp) = fixtures::non_expired_local_feed();
    store.insert(feed.clone(), timestamp).await.unwrap();

    let cached = store.retrieve().await.unwrap();
    assert_eq!(cached, Some(CachedFeed::new(feed, timestamp)));
}

pub async fn assert_retrieve_has_no_side_effects_on_non_empty_cache(store: &dyn FeedStore) {
    let (feed, timestamp) = fixtures::non_expired_local_feed();
    store.insert(feed.clone(), timestamp).await.unwrap();

    let expected = Some(CachedFeed::new(feed, timestamp));
    assert_eq!(store.retrieve().await.unwrap(), expected);
    assert_eq!(store.retrieve().await.unwrap(), expected);
}

pub async fn assert_retrieve_delivers_failure_on_failed_retrieval(store: &dyn FeedStore) {
    let result = store.retrieve().await;
    assert!(result.is_err(), "expected failure, got {:?}", result);
}

pub async fn assert_retrieve_has_no_side_effects_on_failed_retrieval(store: &dyn FeedStore) {
    for _ in 0..2 {
        let result = store.retrieve().await;
        assert!(result.is_err(), "expected failure, got {:?}", result);
    }
}

pub async fn assert_insert_delivers_no_error_on_empty_cache(store: &dyn FeedStore) {
    let (feed, timestamp) = fixtures::non_expired_local_feed();
    let result = store.insert(feed, timestamp).await;
    assert!(result.is_ok(), "expected success, got {:?}", result);
}

pub async fn assert_insert_delivers_no_error_on_non_empty_cache(store: &dyn FeedStore) {
    let (feed, timestamp) = fixtures::non_expired_local_feed();
    store.insert(feed, timestamp).await.unwrap();

    let (feed, timestamp) = fixtures::non_expired_local_feed();
    let result = store.insert(feed, timestamp).await;
    assert!(result.is_ok(), "expected success, got {:?}", result);
}

pub async fn assert_insert_overrides_previously_inserted_cache_values(store: &dyn FeedStore) {
    let (first, timestamp) = fixtures::non_expired_local_feed();
    store.insert(first, timestamp).await.unwrap();

    let (latest, _) = fixtures::non_expired_local_feed();
    let latest_timestamp = timestamp + Duration::seconds(1);
    store.insert(latest.clone(), latest_timestamp).await.unwrap();

    let cached = store.retrieve().await.unwrap();
    assert_eq!(cached, Some(CachedFeed::new(latest, latest_timestamp)));
}

pub async fn assert_insert_delivers_error_on_failed_insertion(store: &dyn FeedStore) {
    let (feed, timestamp) = fixtures::non_expired_local_feed();
    let result = store.insert(feed, timestamp).await;
    assert!(result.is_err(), "expected failure, got {:?}", result);
}

pub async fn assert_insert_has_no_side_effects_on_failed_insertion(store: &dyn FeedStore) {
    let (feed, timestamp) = fixtures::non_expired_local_feed();
    assert!(store.insert(feed, timestamp).await.is_err());

    let result = store.retrieve().await;
    assert!(matches!(result, Ok(None)), "expected empty, got {:?}", result);
}

pub async fn assert_delete_delivers_no_error_on_empty_cache(store: &dyn FeedStore) {
    let result = store.delete_cached_feed().await;
    assert!(result.is_ok(), "expected success, got {:?}", result);
}

pub async fn assert_delete_has_no_side_effects_on_empty_cache(store: &dyn FeedStore) {
    store.delete_cached_feed().await.unwrap();

    let result = store.retrieve().await;
    assert!(matches!(result, Ok(None)), "expected empty, got {:?}", result);
}

pub async fn assert_delete_delivers_no_error_on_non_empty_cache(store: &dyn FeedStore) {
    let (feed, timestamp) = fixtures::non_expired_local_feed();
    store.insert(feed, timestamp).await.unwrap();

    let result = store.delete_cached_feed().await;
    assert!(result.is_ok(), "expected success, got {:?}", result);
}

pub async fn assert_delete_empties_previously_inserted_cache(store: &dyn FeedStore) {
    let (feed, timestamp) = fixtures::non_expired_local_feed();
    store.insert(feed, timestamp).await.unwrap();
    store.delete_cached_feed().await.unwrap();

    let result = store.retrieve().await;
    assert!(matches!(result, Ok(None)), "expected empty, got {:?}", result);
}

pub async fn assert_delete_delivers_error_on_failed_deletion(store: &dyn FeedStore) {
    let result = store.delete_cached_feed().await;
    assert!(result.is_err(), "expected failure, got {:?}", result);
}

/// Operations submitted back to back complete in submission order, and the
/// last write wins
pub async fn assert_side_effects_run_serially(store: &dyn FeedStore) {
    let (first, timestamp) = fixtures::non_expired_local_feed();
    let (last, _) = fixtures::non_expired_local_feed();
    let last_timestamp = timestamp + Duration::seconds(1);

    let op1 = store.insert(first, timestamp);
    let op2 = store.delete_cached_feed();
    let op3 = store.insert(last.clone(), last_timestamp);

    op3.await.unwrap();
    let op1 = op1.now_or_never().expect("first insert finished before the last");
    let op2 = op2.now_or_never().expect("delete finished before the last insert");
    op1.unwrap();
    op2.unwrap();

    let cached = store.retrieve().await.unwrap();
    assert_eq!(cached, Some(CachedFeed::new(last, last_timestamp)));
}
