//! Type conversions between the feed model and the cache model
//!
//! - feed::FeedItem -> LocalFeedItem (on save)
//! - LocalFeedItem -> feed::FeedItem (on load)

use super::model::LocalFeedItem;
use feed::FeedItem;

/// Convert a feed item into its cache representation
impl From<&FeedItem> for LocalFeedItem {
    fn from(item: &FeedItem) -> Self {
        LocalFeedItem {
            id: item.id(),
            description: item.description().map(str::to_string),
            location: item.location().map(str::to_string),
            url: item.image_url().clone(),
        }
    }
}

/// Convert a cached item back into the feed model
impl From<LocalFeedItem> for FeedItem {
    fn from(local: LocalFeedItem) -> Self {
        let mut item = FeedItem::new(local.id, local.url);
        if let Some(description) = local.description {
            item = item.with_description(description);
        }
        if let Some(location) = local.location {
            item = item.with_location(location);
        }
        item
    }
}

/// Map a feed into the list a store persists
pub fn to_local(feed: &[FeedItem]) -> Vec<LocalFeedItem> {
    feed.iter().map(LocalFeedItem::from).collect()
}

/// Map a stored list back into the feed model
pub fn to_feed(local: Vec<LocalFeedItem>) -> Vec<FeedItem> {
    local.into_iter().map(FeedItem::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use uuid::Uuid;

    fn url() -> Url {
        Url::parse("https://an-image-url.com/a.png").unwrap()
    }

    #[test]
    fn test_feed_item_to_local() {
        let item = FeedItem::new(Uuid::new_v4(), url())
            .with_description("desc")
            .with_location("loc");

        let local = LocalFeedItem::from(&item);
        assert_eq!(local.id, item.id());
        assert_eq!(local.description.as_deref(), Some("desc"));
        assert_eq!(local.location.as_deref(), Some("loc"));
        assert_eq!(&local.url, item.image_url());
    }

    #[test]
    fn test_local_without_optionals_to_feed_item() {
        let local = LocalFeedItem::new(Uuid::new_v4(), None, None, url());
        let item = FeedItem::from(local.clone());
        assert_eq!(item.id(), local.id);
        assert!(item.description().is_none());
        assert!(item.location().is_none());
    }

    #[test]
    fn test_mapping_preserves_order() {
        let feed: Vec<FeedItem> = (0..5).map(|_| FeedItem::new(Uuid::new_v4(), url())).collect();
        let back = to_feed(to_local(&feed));
        assert_eq!(back, feed);
    }
}
