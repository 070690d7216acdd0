pub mod element;
pub mod url_metric;

pub use element::{DomRect, Element, ElementRef};
pub use url_metric::{UrlMetric, Viewport};
