//! URL Metric data model.
//!
//! A URL Metric is one real-user observation of a page load: the viewport it was
//! captured in and the elements that were visible. Instances are immutable once
//! built and are shared between groups, analytics and records through `Rc`.

use std::rc::Rc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Element, ElementRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlMetric {
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub viewport: Viewport,
    pub elements: Vec<Element>,
}

impl UrlMetric {
    pub fn new(
        url: impl Into<String>,
        timestamp: DateTime<Utc>,
        viewport: Viewport,
        elements: Vec<Element>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            url: url.into(),
            timestamp,
            viewport,
            elements,
        }
    }

    pub fn viewport_width(&self) -> i64 {
        self.viewport.width
    }

    /// The element the client identified as the Largest Contentful Paint, if any.
    pub fn lcp_element(self: &Rc<Self>) -> Option<ElementRef> {
        self.elements
            .iter()
            .position(|element| element.is_lcp)
            .map(|index| ElementRef::new(Rc::clone(self), index))
    }

    pub fn element_refs(self: &Rc<Self>) -> impl Iterator<Item = ElementRef> + '_ {
        (0..self.elements.len()).map(move |index| ElementRef::new(Rc::clone(self), index))
    }

    /// Fresh while `now - timestamp <= freshness_ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>, freshness_ttl_secs: i64) -> bool {
        // A TTL too large for `TimeDelta` outlives every timestamp.
        match TimeDelta::try_seconds(freshness_ttl_secs) {
            Some(ttl) => now.signed_duration_since(self.timestamp) <= ttl,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DomRect;

    fn element(xpath: &str, is_lcp: bool) -> Element {
        Element {
            xpath: xpath.to_string(),
            is_lcp,
            is_lcp_candidate: is_lcp,
            intersection_ratio: 1.0,
            intersection_rect: DomRect::default(),
            bounding_client_rect: DomRect::default(),
        }
    }

    #[test]
    fn test_lcp_element_is_first_flagged() {
        let url_metric = Rc::new(UrlMetric::new(
            "https://example.com/",
            Utc::now(),
            Viewport {
                width: 360,
                height: 640,
            },
            vec![element("/h1", false), element("/img", true), element("/p", true)],
        ));

        let lcp = url_metric.lcp_element().unwrap();
        assert_eq!(lcp.xpath, "/img");
        assert_eq!(url_metric.element_refs().count(), 3);
    }

    #[test]
    fn test_no_lcp_element() {
        let url_metric = Rc::new(UrlMetric::new(
            "https://example.com/",
            Utc::now(),
            Viewport {
                width: 360,
                height: 640,
            },
            vec![element("/h1", false)],
        ));
        assert!(url_metric.lcp_element().is_none());
    }

    #[test]
    fn test_freshness_boundary() {
        let now = Utc::now();
        let url_metric = UrlMetric::new(
            "https://example.com/",
            now - TimeDelta::seconds(60),
            Viewport {
                width: 360,
                height: 640,
            },
            Vec::new(),
        );

        assert!(url_metric.is_fresh(now, 60));
        assert!(!url_metric.is_fresh(now, 59));
        assert!(url_metric.is_fresh(now, i64::MAX));
    }

    #[test]
    fn test_zero_ttl_only_keeps_current_timestamp_fresh() {
        let now = Utc::now();
        let current = UrlMetric::new(
            "https://example.com/",
            now,
            Viewport {
                width: 360,
                height: 640,
            },
            Vec::new(),
        );
        assert!(current.is_fresh(now, 0));
        assert!(!current.is_fresh(now + TimeDelta::milliseconds(1), 0));
    }

    #[test]
    fn test_deserialize_url_metric() {
        let json = serde_json::json!({
            "url": "https://example.com/",
            "timestamp": "2026-10-01T12:00:00Z",
            "viewport": { "width": 480, "height": 800 },
            "elements": []
        });

        let url_metric: UrlMetric = serde_json::from_value(json).unwrap();
        assert_eq!(url_metric.viewport_width(), 480);
        assert!(url_metric.elements.is_empty());
        assert!(!url_metric.uuid.is_nil());
    }
}
