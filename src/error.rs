//! Error types for URL Metric grouping.
//!
//! Every failure raised by the grouping core is an invalid argument supplied by
//! the caller: a malformed configuration scalar or a sample that no group can
//! hold. None of them are transient, so callers surface them instead of retrying.

use thiserror::Error;

pub type UrlMetricResult<T> = Result<T, UrlMetricError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlMetricError {
    #[error("invalid argument: breakpoint {0} must be a positive integer less than the maximum viewport width")]
    InvalidBreakpoint(i64),

    #[error("invalid argument: sample size must be greater than zero, got {0}")]
    InvalidSampleSize(usize),

    #[error("invalid argument: freshness TTL must be at least zero, got {0}")]
    InvalidFreshnessTtl(i64),

    #[error("invalid argument: group range [{min}, {max}] is not a valid viewport width range")]
    InvalidGroupRange { min: i64, max: i64 },

    #[error("invalid argument: viewport width {width} is outside the group range [{min}, {max}]")]
    ViewportWidthOutOfRange { width: i64, min: i64, max: i64 },

    #[error("invalid argument: no group available for viewport width {0}")]
    NoGroupForViewportWidth(i64),
}
