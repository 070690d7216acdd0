use std::rc::Rc;

use uuid::Uuid;

use crate::grouping::{UrlMetricGroup, UrlMetricGroupCollection};
use crate::models::UrlMetric;

/// Emitted after a collection accepts a URL Metric.
#[derive(Debug)]
pub struct UrlMetricAdded<'a> {
    pub id: Uuid,
    pub url_metric: &'a Rc<UrlMetric>,
    pub group: &'a UrlMetricGroup,
    pub collection: &'a UrlMetricGroupCollection,
}

pub trait UrlMetricObserver {
    fn on_url_metric_added(&self, event: &UrlMetricAdded<'_>);
}
