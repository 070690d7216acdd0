pub mod cache;
pub mod collection;
pub mod events;
pub mod group;
pub mod record;

pub use cache::{InitialViewportFlags, IntersectionRatios, XpathElementsMap};
pub use collection::{UrlMetricGroupCollection, MAX_VIEWPORT_WIDTH};
pub use events::{UrlMetricAdded, UrlMetricObserver};
pub use group::UrlMetricGroup;
pub use record::{CollectionRecord, GroupRecord};
