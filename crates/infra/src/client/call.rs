//! A logical call prepared for either direct or batched execution.
//!
//! Every facade operation builds a [`PreparedCall`]: the request plus the
//! function that turns the interpreted response into the operation's result.
//! The direct path sends it on its own; the batch path enqueues it on a scope.
//! Both paths therefore share request shape and result mapping.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tabula_core::{decode, TransportRequest};
use tabula_domain::{Page, Result};

const PAGE_TOKEN_FIELD: &str = "nextPageToken";

type Outcome<T> = Box<dyn FnOnce(Result<Value>) -> Result<T> + Send + 'static>;

pub struct PreparedCall<T> {
    pub(crate) request: TransportRequest,
    pub(crate) outcome: Outcome<T>,
}

impl<T: 'static> PreparedCall<T> {
    pub fn new(
        request: TransportRequest,
        outcome: impl FnOnce(Result<Value>) -> Result<T> + Send + 'static,
    ) -> Self {
        Self { request, outcome: Box::new(outcome) }
    }

    /// Apply a further transformation to a successful result.
    pub fn and_then<U: 'static>(
        self,
        next: impl FnOnce(T) -> Result<U> + Send + 'static,
    ) -> PreparedCall<U> {
        let outcome = self.outcome;
        PreparedCall::new(self.request, move |result| outcome(result).and_then(next))
    }

    pub fn request(&self) -> &TransportRequest {
        &self.request
    }

    pub(crate) fn into_parts(self) -> (TransportRequest, Outcome<T>) {
        (self.request, self.outcome)
    }
}

impl<T: DeserializeOwned + 'static> PreparedCall<T> {
    /// Decode the response body into `T`.
    pub fn decoded(request: TransportRequest) -> Self {
        let origin = request.path.clone();
        Self::new(request, move |result| decode(result?, &origin))
    }
}

impl<T: DeserializeOwned + 'static> PreparedCall<Option<T>> {
    /// Decode the body, mapping `notFound` to `None`.
    pub fn optional(request: TransportRequest) -> Self {
        let origin = request.path.clone();
        Self::new(request, move |result| match result {
            Ok(value) => decode(value, &origin).map(Some),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        })
    }
}

impl<T: DeserializeOwned + 'static> PreparedCall<Page<T>> {
    /// One page of a listing whose items sit under `items_key`. A missing key
    /// is an empty page.
    pub fn listing(request: TransportRequest, items_key: &'static str) -> Self {
        let origin = request.path.clone();
        Self::new(request, move |result| {
            let mut value = result?;
            let items = match value.get_mut(items_key).map(Value::take) {
                None | Some(Value::Null) => Vec::new(),
                Some(items) => decode(items, &origin)?,
            };
            let token = value.get(PAGE_TOKEN_FIELD).and_then(Value::as_str).map(str::to_string);
            Ok(Page::new(items, token))
        })
    }
}

impl PreparedCall<bool> {
    /// `true` when the call succeeded, `false` on `notFound`.
    pub fn existence(request: TransportRequest) -> Self {
        Self::new(request, |result| match result {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        })
    }
}

impl<T> std::fmt::Debug for PreparedCall<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedCall").field("request", &self.request).finish_non_exhaustive()
    }
}
