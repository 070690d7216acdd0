use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{UrlMetricError, UrlMetricResult};
use crate::grouping::cache::{
    CacheKey, InitialViewportFlags, IntersectionRatios, QueryCache, XpathElementsMap,
};
use crate::grouping::events::{UrlMetricAdded, UrlMetricObserver};
use crate::grouping::record::CollectionRecord;
use crate::grouping::UrlMetricGroup;
use crate::models::{ElementRef, UrlMetric};
use crate::settings::CollectionSettings;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Largest representable viewport width; the upper bound of the last group.
pub const MAX_VIEWPORT_WIDTH: i64 = i64::MAX;

/// URL Metrics partitioned into groups by viewport width.
///
/// Breakpoints `[b1, .., bn]` produce the groups `[0, b1]`, `[b1 + 1, b2]`, ..,
/// `[bn + 1, MAX_VIEWPORT_WIDTH]`. Derived queries are memoized until a URL
/// Metric is added or [`UrlMetricGroupCollection::clear_cache`] is called.
pub struct UrlMetricGroupCollection {
    groups: Vec<UrlMetricGroup>,
    breakpoints: Vec<i64>,
    sample_size: usize,
    freshness_ttl: i64,
    now: DateTime<Utc>,
    cache: Rc<QueryCache>,
    observers: Vec<Box<dyn UrlMetricObserver>>,
}

impl UrlMetricGroupCollection {
    /// Builds the groups for `settings` and inserts `url_metrics` in order.
    ///
    /// `now` is the instant freshness is measured against.
    pub fn new<I>(
        url_metrics: I,
        settings: &CollectionSettings,
        now: DateTime<Utc>,
    ) -> UrlMetricResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<Rc<UrlMetric>>,
    {
        let mut breakpoints = settings.breakpoints.clone();
        breakpoints.sort_unstable();
        breakpoints.dedup();

        if let Some(&invalid) = breakpoints
            .iter()
            .find(|&&breakpoint| breakpoint <= 0 || breakpoint >= MAX_VIEWPORT_WIDTH)
        {
            return Err(UrlMetricError::InvalidBreakpoint(invalid));
        }
        if settings.sample_size == 0 {
            return Err(UrlMetricError::InvalidSampleSize(settings.sample_size));
        }
        if settings.freshness_ttl < 0 {
            return Err(UrlMetricError::InvalidFreshnessTtl(settings.freshness_ttl));
        }

        let cache = Rc::new(QueryCache::default());
        let groups = build_groups(
            &breakpoints,
            settings.sample_size,
            settings.freshness_ttl,
            now,
            &cache,
        )?;

        let mut collection = Self {
            groups,
            breakpoints,
            sample_size: settings.sample_size,
            freshness_ttl: settings.freshness_ttl,
            now,
            cache,
            observers: Vec::new(),
        };
        for url_metric in url_metrics {
            collection.add_url_metric(url_metric)?;
        }

        log_debug!(
            "built {} URL Metric groups holding {} URL Metrics",
            collection.groups.len(),
            collection.groups.iter().map(UrlMetricGroup::len).sum::<usize>()
        );
        Ok(collection)
    }

    /// Rehydrates a collection from its serialized record.
    pub fn from_record(record: &CollectionRecord, now: DateTime<Utc>) -> UrlMetricResult<Self> {
        let settings = CollectionSettings {
            breakpoints: record.breakpoints.clone(),
            sample_size: record.sample_size,
            freshness_ttl: record.freshness_ttl,
        };
        let url_metrics = record
            .groups
            .iter()
            .flat_map(|group| group.url_metrics.iter().cloned());
        Self::new(url_metrics, &settings, now)
    }

    pub fn breakpoints(&self) -> &[i64] {
        &self.breakpoints
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn freshness_ttl(&self) -> i64 {
        self.freshness_ttl
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Registers an observer notified after every accepted URL Metric.
    pub fn subscribe(&mut self, observer: impl UrlMetricObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Routes the URL Metric to the group covering its viewport width.
    pub fn add_url_metric(&mut self, url_metric: impl Into<Rc<UrlMetric>>) -> UrlMetricResult<()> {
        let url_metric = url_metric.into();
        let width = url_metric.viewport_width();
        let index = self
            .find_group_index(width)
            .ok_or(UrlMetricError::NoGroupForViewportWidth(width))?;

        // The group clears the shared cache once it accepts the URL Metric.
        self.groups[index].add_url_metric(Rc::clone(&url_metric))?;

        let group = &self.groups[index];
        log_debug!(
            "added URL Metric {} (viewport width {}) to group [{}, {}]",
            url_metric.uuid,
            width,
            group.minimum_viewport_width(),
            group.maximum_viewport_width()
        );

        if !self.observers.is_empty() {
            let event = UrlMetricAdded {
                id: Uuid::new_v4(),
                url_metric: &url_metric,
                group,
                collection: self,
            };
            for observer in &self.observers {
                observer.on_url_metric_added(&event);
            }
        }
        Ok(())
    }

    pub fn get_group_for_viewport_width(&self, viewport_width: i64) -> UrlMetricResult<&UrlMetricGroup> {
        let index = self
            .cache
            .try_get_or_insert_with(CacheKey::GroupForViewportWidth(viewport_width), || {
                self.find_group_index(viewport_width)
                    .ok_or(UrlMetricError::NoGroupForViewportWidth(viewport_width))
            })?;
        Ok(&self.groups[index])
    }

    pub fn get_first_group(&self) -> &UrlMetricGroup {
        &self.groups[0]
    }

    pub fn get_last_group(&self) -> &UrlMetricGroup {
        &self.groups[self.groups.len() - 1]
    }

    pub fn is_any_group_populated(&self) -> bool {
        self.cache
            .get_or_insert_with(CacheKey::IsAnyGroupPopulated, || {
                self.groups.iter().any(|group| !group.is_empty())
            })
    }

    pub fn is_every_group_populated(&self) -> bool {
        self.cache
            .get_or_insert_with(CacheKey::IsEveryGroupPopulated, || {
                self.groups.iter().all(|group| !group.is_empty())
            })
    }

    pub fn is_every_group_complete(&self) -> bool {
        self.cache
            .get_or_insert_with(CacheKey::IsEveryGroupComplete, || {
                self.groups.iter().all(UrlMetricGroup::is_complete)
            })
    }

    /// Groups whose LCP element has the given XPath.
    pub fn get_groups_by_lcp_element(&self, xpath: &str) -> Vec<&UrlMetricGroup> {
        let indices: Rc<[usize]> = self
            .cache
            .get_or_insert_with(CacheKey::GroupsByLcpElement(xpath.to_string()), || {
                self.groups
                    .iter()
                    .enumerate()
                    .filter(|(_, group)| {
                        group
                            .get_lcp_element()
                            .is_some_and(|lcp| lcp.xpath == xpath)
                    })
                    .map(|(index, _)| index)
                    .collect()
            });
        indices.iter().map(|&index| &self.groups[index]).collect()
    }

    /// The LCP element shared by every group, if there is one.
    ///
    /// An empty group, or a group whose URL Metrics disagree on the LCP element,
    /// rules out a common answer.
    pub fn get_common_lcp_element(&self) -> Option<ElementRef> {
        self.cache
            .get_or_insert_with(CacheKey::CommonLcpElement, || self.compute_common_lcp_element())
    }

    fn compute_common_lcp_element(&self) -> Option<ElementRef> {
        if !self.is_every_group_populated() {
            return None;
        }

        let mut common: Option<ElementRef> = None;
        for group in &self.groups {
            let lcp_element = group.get_lcp_element()?;
            if common
                .as_ref()
                .is_some_and(|previous| previous.xpath != lcp_element.xpath)
            {
                return None;
            }
            common.get_or_insert(lcp_element);
        }
        common
    }

    /// Every observed element keyed by XPath, groups visited in ascending width order.
    ///
    /// This walks every element of every URL Metric, so it is only ever served
    /// through the cache.
    pub fn get_xpath_elements_map(&self) -> Rc<XpathElementsMap> {
        self.cache.get_or_insert_with(CacheKey::XpathElementsMap, || {
            let mut map = XpathElementsMap::new();
            for group in &self.groups {
                for (xpath, elements) in group.get_xpath_elements_map() {
                    map.entry(xpath).or_default().extend(elements);
                }
            }
            Rc::new(map)
        })
    }

    pub fn get_all_element_max_intersection_ratios(&self) -> Rc<IntersectionRatios> {
        self.cache
            .get_or_insert_with(CacheKey::AllElementMaxIntersectionRatios, || {
                let mut ratios = IntersectionRatios::new();
                for group in &self.groups {
                    for (xpath, ratio) in group.get_all_element_max_intersection_ratios() {
                        ratios
                            .entry(xpath)
                            .and_modify(|max: &mut f64| *max = max.max(ratio))
                            .or_insert(ratio);
                    }
                }
                Rc::new(ratios)
            })
    }

    /// Whether each element's top edge fell inside the viewport for at least one capture.
    pub fn get_all_elements_positioned_in_any_initial_viewport(&self) -> Rc<InitialViewportFlags> {
        self.cache.get_or_insert_with(
            CacheKey::AllElementsPositionedInAnyInitialViewport,
            || {
                let flags = self
                    .get_xpath_elements_map()
                    .iter()
                    .map(|(xpath, elements)| {
                        let positioned = elements
                            .iter()
                            .any(ElementRef::is_positioned_in_initial_viewport);
                        (xpath.clone(), positioned)
                    })
                    .collect();
                Rc::new(flags)
            },
        )
    }

    /// `None` when no URL Metric has observed the XPath.
    pub fn get_element_max_intersection_ratio(&self, xpath: &str) -> Option<f64> {
        self.get_all_element_max_intersection_ratios()
            .get(xpath)
            .copied()
    }

    /// `None` when no URL Metric has observed the XPath.
    pub fn is_element_positioned_in_any_initial_viewport(&self, xpath: &str) -> Option<bool> {
        self.get_all_elements_positioned_in_any_initial_viewport()
            .get(xpath)
            .copied()
    }

    pub fn get_flattened_url_metrics(&self) -> Vec<Rc<UrlMetric>> {
        self.groups
            .iter()
            .flat_map(|group| group.iter().cloned())
            .collect()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of derived query results computed instead of served from the cache.
    pub fn cache_misses(&self) -> usize {
        self.cache.misses()
    }

    pub fn to_record(&self) -> CollectionRecord {
        CollectionRecord {
            breakpoints: self.breakpoints.clone(),
            freshness_ttl: self.freshness_ttl,
            sample_size: self.sample_size,
            all_element_max_intersection_ratios: (*self.get_all_element_max_intersection_ratios())
                .clone(),
            common_lcp_element: self
                .get_common_lcp_element()
                .map(|lcp| lcp.element().clone()),
            every_group_complete: self.is_every_group_complete(),
            every_group_populated: self.is_every_group_populated(),
            groups: self.groups.iter().map(UrlMetricGroup::to_record).collect(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UrlMetricGroup> {
        self.groups.iter()
    }

    /// Number of groups, always one more than the number of breakpoints.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn find_group_index(&self, viewport_width: i64) -> Option<usize> {
        self.groups
            .iter()
            .position(|group| group.is_viewport_width_in_range(viewport_width))
    }
}

fn build_groups(
    breakpoints: &[i64],
    sample_size: usize,
    freshness_ttl: i64,
    now: DateTime<Utc>,
    cache: &Rc<QueryCache>,
) -> UrlMetricResult<Vec<UrlMetricGroup>> {
    let mut groups = Vec::with_capacity(breakpoints.len() + 1);
    let mut minimum_viewport_width = 0;
    for &breakpoint in breakpoints {
        groups.push(UrlMetricGroup::new(
            Vec::new(),
            minimum_viewport_width,
            breakpoint,
            sample_size,
            freshness_ttl,
            now,
            Rc::downgrade(cache),
        )?);
        minimum_viewport_width = breakpoint + 1;
    }
    groups.push(UrlMetricGroup::new(
        Vec::new(),
        minimum_viewport_width,
        MAX_VIEWPORT_WIDTH,
        sample_size,
        freshness_ttl,
        now,
        Rc::downgrade(cache),
    )?);
    Ok(groups)
}

impl<'a> IntoIterator for &'a UrlMetricGroupCollection {
    type Item = &'a UrlMetricGroup;
    type IntoIter = std::slice::Iter<'a, UrlMetricGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

impl fmt::Debug for UrlMetricGroupCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlMetricGroupCollection")
            .field("groups", &self.groups)
            .field("breakpoints", &self.breakpoints)
            .field("sample_size", &self.sample_size)
            .field("freshness_ttl", &self.freshness_ttl)
            .field("now", &self.now)
            .field("cached_queries", &self.cache.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}
