//! Token-based pagination
//!
//! [`Paginator::list_all`] follows continuation tokens until a page arrives
//! without one and returns every item in page order. It is all-or-nothing:
//! a failure on any page discards what was collected. [`Paginator::pages`]
//! exposes the same walk as a stream for callers that want incremental
//! consumption.

use std::future::Future;

use futures::stream::{self, Stream};
use tabula_domain::constants::DEFAULT_MAX_PAGES;
use tabula_domain::{ApiError, Page, Reason, Result, TabulaError};
use tracing::debug;

/// Follows continuation tokens with an upper bound on pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    max_pages: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAGES)
    }
}

fn page_limit_error(max_pages: usize) -> TabulaError {
    ApiError::new(
        Reason::Internal,
        format!("listing did not terminate after {max_pages} pages"),
        "pagination",
    )
    .into()
}

fn continuation(page: &Page<impl Sized>) -> Option<String> {
    page.next_page_token.clone().filter(|token| !token.is_empty())
}

impl Paginator {
    /// A bound of zero is raised to one page.
    pub fn new(max_pages: usize) -> Self {
        Self { max_pages: max_pages.max(1) }
    }

    pub const fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Fetch every page and concatenate the items.
    ///
    /// `fetch` receives `None` for the first page and the previous page's
    /// token afterwards.
    pub async fn list_all<T, F, Fut>(&self, mut fetch: F) -> Result<Vec<T>>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Page<T>>>,
    {
        let mut items = Vec::new();
        let mut token = None;

        for fetched in 1..=self.max_pages {
            let page = fetch(token.take()).await?;
            let next = continuation(&page);
            items.extend(page.items);

            match next {
                Some(next) => token = Some(next),
                None => {
                    debug!(pages = fetched, items = items.len(), "listing complete");
                    return Ok(items);
                }
            }
        }

        Err(page_limit_error(self.max_pages))
    }

    /// Stream pages one at a time. The stream ends after the last page or the
    /// first error.
    pub fn pages<T, F, Fut>(&self, fetch: F) -> impl Stream<Item = Result<Page<T>>>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Page<T>>>,
    {
        struct Walk<F> {
            fetch: F,
            token: Option<String>,
            fetched: usize,
            finished: bool,
        }

        let max_pages = self.max_pages;
        let initial = Walk { fetch, token: None, fetched: 0, finished: false };

        stream::unfold(initial, move |mut walk| async move {
            if walk.finished {
                return None;
            }
            if walk.fetched >= max_pages {
                walk.finished = true;
                return Some((Err(page_limit_error(max_pages)), walk));
            }

            let result = (walk.fetch)(walk.token.take()).await;
            walk.fetched += 1;
            match &result {
                Ok(page) => {
                    walk.token = continuation(page);
                    walk.finished = walk.token.is_none();
                }
                Err(_) => walk.finished = true,
            }
            Some((result, walk))
        })
    }
}
