//! Element data model.
//!
//! An element is one DOM node observed by the client while collecting a URL Metric.
//! Elements are keyed across samples by their XPath.

use std::ops::Deref;
use std::rc::Rc;

use serde::{Deserialize, Serialize, Serializer};

use super::UrlMetric;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DomRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub xpath: String,
    #[serde(rename = "isLCP")]
    pub is_lcp: bool,
    #[serde(rename = "isLCPCandidate")]
    pub is_lcp_candidate: bool,
    pub intersection_ratio: f64,
    pub intersection_rect: DomRect,
    pub bounding_client_rect: DomRect,
}

/// An element together with the URL Metric that captured it.
///
/// The URL Metric is shared rather than owned by the element, which lets
/// analytics read the capturing viewport without copying it into every element.
#[derive(Debug, Clone)]
pub struct ElementRef {
    url_metric: Rc<UrlMetric>,
    index: usize,
}

impl ElementRef {
    /// `index` must address an element of `url_metric`.
    pub(crate) fn new(url_metric: Rc<UrlMetric>, index: usize) -> Self {
        debug_assert!(index < url_metric.elements.len());
        Self { url_metric, index }
    }

    pub fn element(&self) -> &Element {
        &self.url_metric.elements[self.index]
    }

    pub fn url_metric(&self) -> &Rc<UrlMetric> {
        &self.url_metric
    }

    /// Whether the top edge of the element sat within the height of the viewport
    /// that captured it.
    pub fn is_positioned_in_initial_viewport(&self) -> bool {
        self.element().bounding_client_rect.top < self.url_metric.viewport.height as f64
    }

    /// True when both refer to the same element of the same URL Metric instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.url_metric, &other.url_metric) && self.index == other.index
    }
}

impl Deref for ElementRef {
    type Target = Element;

    fn deref(&self) -> &Element {
        self.element()
    }
}

impl PartialEq for ElementRef {
    fn eq(&self, other: &Self) -> bool {
        self.element() == other.element()
    }
}

impl Serialize for ElementRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.element().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Viewport;
    use chrono::Utc;

    fn element(xpath: &str, top: f64) -> Element {
        Element {
            xpath: xpath.to_string(),
            is_lcp: false,
            is_lcp_candidate: false,
            intersection_ratio: 1.0,
            intersection_rect: DomRect::default(),
            bounding_client_rect: DomRect {
                top,
                left: 0.0,
                width: 100.0,
                height: 100.0,
            },
        }
    }

    #[test]
    fn test_element_json_keys() {
        let json = serde_json::json!({
            "xpath": "/*[1][self::HTML]/*[2][self::BODY]/*[1][self::IMG]",
            "isLCP": true,
            "isLCPCandidate": true,
            "intersectionRatio": 0.5,
            "intersectionRect": { "top": 0.0, "left": 0.0, "width": 10.0, "height": 10.0 },
            "boundingClientRect": { "top": 0.0, "left": 0.0, "width": 10.0, "height": 20.0 }
        });

        let element: Element = serde_json::from_value(json.clone()).unwrap();
        assert!(element.is_lcp);
        assert!(element.is_lcp_candidate);
        assert_eq!(element.intersection_ratio, 0.5);
        assert_eq!(serde_json::to_value(&element).unwrap(), json);
    }

    #[test]
    fn test_positioned_in_initial_viewport() {
        let url_metric = Rc::new(UrlMetric::new(
            "https://example.com/",
            Utc::now(),
            Viewport {
                width: 400,
                height: 700,
            },
            vec![element("/a", 699.0), element("/b", 700.0)],
        ));

        assert!(ElementRef::new(Rc::clone(&url_metric), 0).is_positioned_in_initial_viewport());
        assert!(!ElementRef::new(Rc::clone(&url_metric), 1).is_positioned_in_initial_viewport());
    }

    #[test]
    fn test_element_ref_identity() {
        let url_metric = Rc::new(UrlMetric::new(
            "https://example.com/",
            Utc::now(),
            Viewport {
                width: 400,
                height: 700,
            },
            vec![element("/a", 0.0)],
        ));
        let copy = Rc::new((*url_metric).clone());

        let first = ElementRef::new(Rc::clone(&url_metric), 0);
        let second = ElementRef::new(copy, 0);
        assert_eq!(first, second);
        assert!(!first.ptr_eq(&second));
        assert!(first.ptr_eq(&first.clone()));
        assert_eq!(first.xpath, "/a");
    }
}
