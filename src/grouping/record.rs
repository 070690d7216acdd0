//! Serialized form of a group collection, used for persistence and for handing
//! the analytics to the optimizer.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::grouping::cache::IntersectionRatios;
use crate::models::{Element, UrlMetric};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub breakpoints: Vec<i64>,
    pub freshness_ttl: i64,
    pub sample_size: usize,
    pub all_element_max_intersection_ratios: IntersectionRatios,
    pub common_lcp_element: Option<Element>,
    pub every_group_complete: bool,
    pub every_group_populated: bool,
    pub groups: Vec<GroupRecord>,
}

/// Per-group record. Sample size and freshness TTL live on the collection record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub lcp_element: Option<Element>,
    pub minimum_viewport_width: i64,
    pub maximum_viewport_width: i64,
    pub complete: bool,
    pub url_metrics: Vec<Rc<UrlMetric>>,
}
