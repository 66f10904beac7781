//! Secondary "model" invocation path.
//!
//! When a registered controller cannot be constructed, or exists but neither
//! implements the requested action nor has a catch-all hook, the dispatcher
//! hands the request to a [`ModelInvoker`] and uses its output as the response
//! body. When construction failed no controller hooks run; for a missing
//! action the controller's `before` and `after` still wrap the fallback.

use anyhow::Result;

use crate::request::Request;
use crate::router::ParamVec;

/// Produces a response body for requests no controller action handled.
pub trait ModelInvoker: Send + Sync {
    /// `params` is the request's ambient parameter bag.
    ///
    /// # Errors
    ///
    /// Any error becomes a 500 for the request.
    fn invoke(&self, request: &Request, params: &ParamVec) -> Result<String>;
}

impl<F> ModelInvoker for F
where
    F: Fn(&Request, &ParamVec) -> Result<String> + Send + Sync,
{
    fn invoke(&self, request: &Request, params: &ParamVec) -> Result<String> {
        self(request, params)
    }
}
