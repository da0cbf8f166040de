//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use tabula_domain::TabulaError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TabulaError);

impl From<InfraError> for TabulaError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TabulaError> for InfraError {
    fn from(value: TabulaError) -> Self {
        InfraError(value)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TabulaError */
/* -------------------------------------------------------------------------- */

// Only failures without a usable response reach this point: status codes
// are returned to the caller as responses and classified by the core.
fn transport_error(err: &HttpError) -> TabulaError {
    if err.is_timeout() {
        return TabulaError::Transport("HTTP request timed out".into());
    }

    #[cfg(not(target_arch = "wasm32"))]
    if err.is_connect() {
        return TabulaError::Transport(format!("HTTP connection failure: {err}"));
    }

    if err.is_builder() {
        return TabulaError::InvalidInput(format!("invalid HTTP request: {err}"));
    }

    TabulaError::Transport(format!("HTTP error: {err}"))
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(transport_error(&value))
    }
}
