//! Live product catalog.
//!
//! # Architecture
//!
//! - [`feed`] subscribes to the realtime database's streaming endpoint and
//!   publishes normalized snapshots through a watch channel
//! - [`view`] is the pure filter/sort/paginate pipeline over a snapshot
//!
//! The feed is the source of truth; the storefront never writes product data.

pub mod feed;
pub mod view;

pub use feed::{CatalogFeed, CatalogSnapshot, CatalogSubscription, FeedStatus};
pub use view::{PageLink, PageView, PriceBucket, SortKey, ViewFilterState};
