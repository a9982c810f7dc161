//! Feed domain model
//!
//! The types a feed source hands to its consumers. A feed is an ordered list of
//! immutable [`FeedItem`]s; anything that can produce one implements [`FeedLoader`].
//!
//! # Example
//!
//! ```
//! use feed::FeedItem;
//! use url::Url;
//! use uuid::Uuid;
//!
//! let item = FeedItem::new(Uuid::new_v4(), Url::parse("https://example.com/a.png")?)
//!     .with_description("a description")
//!     .with_location("a location");
//!
//! assert_eq!(item.description(), Some("a description"));
//! # Ok::<(), url::ParseError>(())
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// A single image post in a feed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedItem {
    id: Uuid,
    description: Option<String>,
    location: Option<String>,
    image_url: Url,
}

impl FeedItem {
    /// Create an item without description or location
    pub fn new(id: Uuid, image_url: Url) -> Self {
        Self {
            id,
            description: None,
            location: None,
            image_url,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn image_url(&self) -> &Url {
        &self.image_url
    }
}

/// A source of feed items
///
/// Implementations may complete on any thread; callers synchronise themselves.
#[async_trait]
pub trait FeedLoader: Send + Sync {
    /// Error reported when the feed cannot be produced
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the current feed
    async fn load(&self) -> Result<Vec<FeedItem>, Self::Error>;
}
