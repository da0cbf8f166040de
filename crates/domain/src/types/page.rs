//! One page of a paged listing

/// Items of one listing page plus the continuation token, absent on the
/// last page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    /// Build a page. An empty token is treated as absent.
    pub fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self { items, next_page_token: next_page_token.filter(|token| !token.is_empty()) }
    }

    /// Final page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next_page_token: None }
    }

    pub const fn is_last(&self) -> bool {
        self.next_page_token.is_none()
    }

    /// Transform the items, keeping the token.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page { items: self.items.into_iter().map(f).collect(), next_page_token: self.next_page_token }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::last(Vec::new())
    }
}
