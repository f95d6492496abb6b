//! Cursor-walking pagination engine.
//!
//! Walking pages and formatting items are separate steps: [`Pages`] yields the
//! raw pages of one walk lazily, [`Paginator::collect`] drains it and routes
//! every item through a formatter. The walk stops after
//! `ceil(total / page_size)` pages, where `total` comes from the first page,
//! or earlier when a page cap is set.

use async_trait::async_trait;
use serde_json::Value;

use crate::{Error, types::Page, utils, warning};

/// Page size of playlist and album track listings.
pub const TRACK_LISTING_PAGE_SIZE: usize = 100;
/// Page size of the user's playlist, saved-album and liked-track listings.
pub const LIBRARY_PAGE_SIZE: usize = 20;

/// What a walk does when a page, chunk or item fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Degrade the failed step to an empty result, record it and continue.
    #[default]
    BestEffort,
    /// Return the first failure as an error.
    FailFast,
}

impl std::str::FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "best-effort" | "best_effort" | "besteffort" => Ok(FailurePolicy::BestEffort),
            "fail-fast" | "fail_fast" | "failfast" => Ok(FailurePolicy::FailFast),
            other => Err(Error::Config(format!("unknown failure policy: {}", other))),
        }
    }
}

/// Parameters of a single page request.
///
/// `cursor` is the `next` link of the previous page. It is absent for the
/// first page and for the page following a failed one; a source then
/// addresses the page through `offset` and `limit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub index: usize,
    pub offset: usize,
    pub limit: usize,
    pub cursor: Option<String>,
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page<Value>, Error>;
}

/// Where in a walk a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSite {
    Page(usize),
    Chunk(usize),
    Item { batch: usize, position: usize },
}

#[derive(Debug)]
pub struct Failure {
    pub site: FailureSite,
    pub error: Error,
}

/// Ordered result of a walk plus the failures absorbed along the way.
#[derive(Debug)]
pub struct Aggregate<T> {
    pub items: Vec<T>,
    pub failures: Vec<Failure>,
}

impl<T> Default for Aggregate<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> Aggregate<T> {
    /// True when no page, chunk or item was dropped.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Aggregate<U> {
        Aggregate {
            items: self.items.into_iter().map(f).collect(),
            failures: self.failures,
        }
    }

    pub fn extend(&mut self, other: Aggregate<T>) {
        self.items.extend(other.items);
        self.failures.extend(other.failures);
    }
}

/// Lazy, finite sequence of the raw pages of one walk.
pub struct Pages<'a, S: ?Sized> {
    source: &'a S,
    page_size: usize,
    max_pages: Option<usize>,
    index: usize,
    total_pages: usize,
    cursor: Option<String>,
}

impl<'a, S: PageSource + ?Sized> Pages<'a, S> {
    pub fn new(source: &'a S, page_size: usize, max_pages: Option<usize>) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            max_pages,
            index: 0,
            total_pages: 1,
            cursor: None,
        }
    }

    /// Fetches the next page, returning its 1-based index with the outcome.
    ///
    /// The first page is always requested. A failed first page counts as a
    /// page with zero total, which ends the walk.
    pub async fn next(&mut self) -> Option<(usize, Result<Page<Value>, Error>)> {
        let index = self.index + 1;
        if index > 1 {
            if index > self.total_pages {
                return None;
            }
            if self.max_pages.is_some_and(|cap| index > cap) {
                return None;
            }
        }
        self.index = index;

        let request = PageRequest {
            index,
            offset: (index - 1) * self.page_size,
            limit: self.page_size,
            cursor: self.cursor.take(),
        };

        let result = self.source.fetch_page(&request).await;
        match &result {
            Ok(page) => {
                if index == 1 {
                    self.total_pages = utils::total_pages(page.total, self.page_size);
                }
                self.cursor = page.next.clone();
            }
            Err(_) => {
                if index == 1 {
                    self.total_pages = 0;
                }
            }
        }

        Some((index, result))
    }

    /// Number of pages the walk covers, known after the first page.
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }
}

/// Configuration of a paginated aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub page_size: usize,
    pub max_pages: Option<usize>,
    pub policy: FailurePolicy,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            max_pages: None,
            policy: FailurePolicy::default(),
        }
    }

    /// Stops the walk after `max_pages` pages; the first page is always
    /// fetched.
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn pages<'a, S: PageSource + ?Sized>(&self, source: &'a S) -> Pages<'a, S> {
        Pages::new(source, self.page_size, self.max_pages)
    }

    /// Walks every page and formats every item, preserving provider order.
///
/// Authorization errors end the walk under every policy; a missing or
/// rejected bearer token would fail every later page the same way.
    pub async fn collect<S, O, F>(&self, source: &S, mut format: F) -> Result<Aggregate<O>, Error>
    where
        S: PageSource + ?Sized,
        F: FnMut(Value) -> Result<O, Error>,
    {
        let mut aggregate = Aggregate::default();
        let mut pages = self.pages(source);

        while let Some((index, result)) = pages.next().await {
            let page = match result {
                Ok(page) => page,
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    let error = Error::PageFetch {
                        page: index,
                        source: Box::new(e),
                    };
                    if self.policy == FailurePolicy::FailFast {
                        return Err(error);
                    }
                    warning!("{}", error);
                    aggregate.failures.push(Failure {
                        site: FailureSite::Page(index),
                        error,
                    });
                    continue;
                }
            };

            for (position, item) in page.items.into_iter().enumerate() {
                match format(item) {
                    Ok(item) => aggregate.items.push(item),
                    Err(e) => {
                        if self.policy == FailurePolicy::FailFast {
                            return Err(e);
                        }
                        warning!("Skipping item {} of page {}: {}", position, index, e);
                        aggregate.failures.push(Failure {
                            site: FailureSite::Item {
                                batch: index,
                                position,
                            },
                            error: e,
                        });
                    }
                }
            }
        }

        Ok(aggregate)
    }
}

/// Pass-through formatter.
pub fn raw(item: Value) -> Result<Value, Error> {
    Ok(item)
}
