//! Memoization of derived collection queries.
//!
//! Results are keyed by query and, for parameterized queries, by the argument.
//! Nothing here tracks dependencies: the cache is emptied whenever a group
//! accepts a URL Metric and whenever the caller asks for it.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::rc::Rc;

use crate::models::ElementRef;

pub type XpathElementsMap = BTreeMap<String, Vec<ElementRef>>;
pub type IntersectionRatios = BTreeMap<String, f64>;
pub type InitialViewportFlags = BTreeMap<String, bool>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CacheKey {
    GroupForViewportWidth(i64),
    IsAnyGroupPopulated,
    IsEveryGroupPopulated,
    IsEveryGroupComplete,
    GroupsByLcpElement(String),
    CommonLcpElement,
    XpathElementsMap,
    AllElementMaxIntersectionRatios,
    AllElementsPositionedInAnyInitialViewport,
}

#[derive(Debug, Clone)]
pub(crate) enum CachedValue {
    Flag(bool),
    GroupIndex(usize),
    GroupIndices(Rc<[usize]>),
    Element(Option<ElementRef>),
    ElementsMap(Rc<XpathElementsMap>),
    Ratios(Rc<IntersectionRatios>),
    Flags(Rc<InitialViewportFlags>),
}

/// Conversion between a query result and its cached form.
pub(crate) trait Cacheable: Clone {
    fn into_cached(self) -> CachedValue;
    fn from_cached(value: &CachedValue) -> Option<Self>;
}

macro_rules! cacheable {
    ($ty:ty, $variant:ident) => {
        impl Cacheable for $ty {
            fn into_cached(self) -> CachedValue {
                CachedValue::$variant(self)
            }

            fn from_cached(value: &CachedValue) -> Option<Self> {
                match value {
                    CachedValue::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }
    };
}

cacheable!(bool, Flag);
cacheable!(usize, GroupIndex);
cacheable!(Rc<[usize]>, GroupIndices);
cacheable!(Option<ElementRef>, Element);
cacheable!(Rc<XpathElementsMap>, ElementsMap);
cacheable!(Rc<IntersectionRatios>, Ratios);
cacheable!(Rc<InitialViewportFlags>, Flags);

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: RefCell<HashMap<CacheKey, CachedValue>>,
    misses: Cell<usize>,
}

impl QueryCache {
    /// Returns the cached result for `key`, computing and storing it on a miss.
    ///
    /// `compute` may itself query the cache.
    pub(crate) fn get_or_insert_with<T, F>(&self, key: CacheKey, compute: F) -> T
    where
        T: Cacheable,
        F: FnOnce() -> T,
    {
        match self.try_get_or_insert_with(key, || Ok::<T, Infallible>(compute())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`QueryCache::get_or_insert_with`], but failures are returned and not cached.
    pub(crate) fn try_get_or_insert_with<T, E, F>(&self, key: CacheKey, compute: F) -> Result<T, E>
    where
        T: Cacheable,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.entries.borrow().get(&key).and_then(T::from_cached) {
            return Ok(value);
        }

        let value = compute()?;
        self.misses.set(self.misses.get() + 1);
        self.entries
            .borrow_mut()
            .insert(key, value.clone().into_cached());
        Ok(value)
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Number of results computed rather than served from the cache.
    pub fn misses(&self) -> usize {
        self.misses.get()
    }
}
