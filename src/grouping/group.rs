use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

use chrono::{DateTime, Utc};

use crate::error::{UrlMetricError, UrlMetricResult};
use crate::grouping::cache::{IntersectionRatios, QueryCache, XpathElementsMap};
use crate::grouping::record::GroupRecord;
use crate::models::{ElementRef, UrlMetric};

/// URL Metrics captured within one inclusive viewport-width range.
///
/// Holds at most `sample_size` URL Metrics; once full, each new URL Metric evicts
/// the oldest one.
#[derive(Debug)]
pub struct UrlMetricGroup {
    url_metrics: VecDeque<Rc<UrlMetric>>,
    minimum_viewport_width: i64,
    maximum_viewport_width: i64,
    sample_size: usize,
    freshness_ttl: i64,
    now: DateTime<Utc>,
    /// Cache of the owning collection. Empty for a detached group.
    collection_cache: Weak<QueryCache>,
}

impl UrlMetricGroup {
    /// A group that belongs to no collection.
    pub fn detached(
        url_metrics: Vec<Rc<UrlMetric>>,
        minimum_viewport_width: i64,
        maximum_viewport_width: i64,
        sample_size: usize,
        freshness_ttl: i64,
        now: DateTime<Utc>,
    ) -> UrlMetricResult<Self> {
        Self::new(
            url_metrics,
            minimum_viewport_width,
            maximum_viewport_width,
            sample_size,
            freshness_ttl,
            now,
            Weak::new(),
        )
    }

    pub(crate) fn new(
        url_metrics: Vec<Rc<UrlMetric>>,
        minimum_viewport_width: i64,
        maximum_viewport_width: i64,
        sample_size: usize,
        freshness_ttl: i64,
        now: DateTime<Utc>,
        collection_cache: Weak<QueryCache>,
    ) -> UrlMetricResult<Self> {
        if minimum_viewport_width < 0 || maximum_viewport_width < minimum_viewport_width {
            return Err(UrlMetricError::InvalidGroupRange {
                min: minimum_viewport_width,
                max: maximum_viewport_width,
            });
        }
        if sample_size == 0 {
            return Err(UrlMetricError::InvalidSampleSize(sample_size));
        }
        if freshness_ttl < 0 {
            return Err(UrlMetricError::InvalidFreshnessTtl(freshness_ttl));
        }

        let mut group = Self {
            url_metrics: VecDeque::with_capacity(sample_size + 1),
            minimum_viewport_width,
            maximum_viewport_width,
            sample_size,
            freshness_ttl,
            now,
            collection_cache,
        };
        for url_metric in url_metrics {
            group.add_url_metric(url_metric)?;
        }
        Ok(group)
    }

    /// Rebuilds a detached group from its serialized record.
    ///
    /// The record omits the collection-wide sample size and freshness TTL.
    pub fn from_record(
        record: &GroupRecord,
        sample_size: usize,
        freshness_ttl: i64,
        now: DateTime<Utc>,
    ) -> UrlMetricResult<Self> {
        Self::detached(
            record.url_metrics.clone(),
            record.minimum_viewport_width,
            record.maximum_viewport_width,
            sample_size,
            freshness_ttl,
            now,
        )
    }

    pub fn minimum_viewport_width(&self) -> i64 {
        self.minimum_viewport_width
    }

    pub fn maximum_viewport_width(&self) -> i64 {
        self.maximum_viewport_width
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn freshness_ttl(&self) -> i64 {
        self.freshness_ttl
    }

    pub fn is_viewport_width_in_range(&self, viewport_width: i64) -> bool {
        self.minimum_viewport_width <= viewport_width
            && viewport_width <= self.maximum_viewport_width
    }

    pub fn add_url_metric(&mut self, url_metric: Rc<UrlMetric>) -> UrlMetricResult<()> {
        let width = url_metric.viewport_width();
        if !self.is_viewport_width_in_range(width) {
            return Err(UrlMetricError::ViewportWidthOutOfRange {
                width,
                min: self.minimum_viewport_width,
                max: self.maximum_viewport_width,
            });
        }

        self.url_metrics.push_back(url_metric);
        while self.url_metrics.len() > self.sample_size {
            self.url_metrics.pop_front();
        }

        if let Some(cache) = self.collection_cache.upgrade() {
            cache.clear();
        }
        Ok(())
    }

    /// Full and fresh: every slot is taken and no URL Metric has outlived the TTL.
    pub fn is_complete(&self) -> bool {
        self.url_metrics.len() == self.sample_size
            && self
                .url_metrics
                .iter()
                .all(|url_metric| url_metric.is_fresh(self.now, self.freshness_ttl))
    }

    /// The LCP element every reporting URL Metric agrees on.
    ///
    /// URL Metrics without an LCP element abstain. Returns `None` when nothing
    /// reports one or when two reports differ in XPath.
    pub fn get_lcp_element(&self) -> Option<ElementRef> {
        let mut consensus: Option<ElementRef> = None;
        for lcp_element in self.url_metrics.iter().filter_map(|m| m.lcp_element()) {
            match &consensus {
                Some(previous) if previous.xpath != lcp_element.xpath => return None,
                Some(_) => {}
                None => consensus = Some(lcp_element),
            }
        }
        consensus
    }

    pub fn get_xpath_elements_map(&self) -> XpathElementsMap {
        let mut map = XpathElementsMap::new();
        for url_metric in &self.url_metrics {
            for element in url_metric.element_refs() {
                map.entry(element.xpath.clone()).or_default().push(element);
            }
        }
        map
    }

    pub fn get_all_element_max_intersection_ratios(&self) -> IntersectionRatios {
        let mut ratios = BTreeMap::new();
        for element in self.url_metrics.iter().flat_map(|m| m.elements.iter()) {
            ratios
                .entry(element.xpath.clone())
                .and_modify(|max: &mut f64| *max = max.max(element.intersection_ratio))
                .or_insert(element.intersection_ratio);
        }
        ratios
    }

    pub fn to_record(&self) -> GroupRecord {
        GroupRecord {
            lcp_element: self.get_lcp_element().map(|lcp| lcp.element().clone()),
            minimum_viewport_width: self.minimum_viewport_width,
            maximum_viewport_width: self.maximum_viewport_width,
            complete: self.is_complete(),
            url_metrics: self.url_metrics.iter().cloned().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<UrlMetric>> {
        self.url_metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.url_metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.url_metrics.is_empty()
    }
}

impl<'a> IntoIterator for &'a UrlMetricGroup {
    type Item = &'a Rc<UrlMetric>;
    type IntoIter = std::collections::vec_deque::Iter<'a, Rc<UrlMetric>>;

    fn into_iter(self) -> Self::IntoIter {
        self.url_metrics.iter()
    }
}
