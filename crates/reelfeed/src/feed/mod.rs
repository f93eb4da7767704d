// Feed data: backend records, the first-page cache and preloading

mod cache;
mod model;
mod preload;
mod source;

pub use cache::{CacheStats, FeedCache, FeedItems, WarmOptions};
pub use model::{FeedItem, FeedKey, PageMeta, PageQuery, PropertyRecord, VideoPage, VideoRecord, feed_items};
pub use preload::{FeedPreloader, PreloadOutcome, PrimeSummary};
pub use source::{FeedSource, HttpFeedSource};
