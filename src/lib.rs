//! Viewport-width grouping of real-user URL Metrics.
//!
//! URL Metrics collected from page visits are routed into breakpoint groups,
//! each keeping a bounded window of the newest samples. The collection derives
//! cross-group analytics (common LCP element, element intersection ratios,
//! initial-viewport positioning) that decide how a page is optimized.

pub mod error;
pub mod grouping;
pub mod models;
pub mod settings;
pub mod utils;

pub use error::{UrlMetricError, UrlMetricResult};
pub use grouping::{
    CollectionRecord, GroupRecord, UrlMetricAdded, UrlMetricGroup, UrlMetricGroupCollection,
    UrlMetricObserver, MAX_VIEWPORT_WIDTH,
};
pub use models::{DomRect, Element, ElementRef, UrlMetric, Viewport};
pub use settings::CollectionSettings;
