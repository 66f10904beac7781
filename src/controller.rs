//! Controller lifecycle interface.
//!
//! A controller is created per dispatch by the factory registered in the
//! [`HandlerRegistry`](crate::registry::HandlerRegistry). The dispatcher then
//! drives it through:
//!
//! 1. [`Controller::before`]
//! 2. [`Controller::action`] for `action_<name>`, or [`Controller::catch_all`]
//!    when the action does not exist
//! 3. [`Controller::after`]
//!
//! Every step receives an [`ActionContext`] holding the request, the response
//! being built, and a handle to issue nested sub-requests.
//!
//! ```rust
//! use mvc_dispatch::controller::{ActionContext, ActionOutcome, Controller};
//!
//! struct Users;
//!
//! impl Controller for Users {
//!     fn action(
//!         &mut self,
//!         action: &str,
//!         params: &[&str],
//!         cx: &mut ActionContext<'_>,
//!     ) -> anyhow::Result<ActionOutcome> {
//!         match action {
//!             "show" => {
//!                 let id = params.first().copied().unwrap_or("0");
//!                 cx.response_mut().set_body(format!("user {id}"));
//!                 Ok(ActionOutcome::Handled)
//!             }
//!             _ => Ok(ActionOutcome::Missing),
//!         }
//!     }
//! }
//! ```

use anyhow::Result;

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::request::Request;
use crate::response::Response;
use crate::router::ParamVec;
use crate::stack::RequestStack;

/// Whether a controller implements the requested action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action ran
    Handled,
    /// No `action_<name>` exists on this controller
    Missing,
}

/// A unit implementing one or more named actions.
pub trait Controller {
    /// Runs before every action.
    fn before(&mut self, _cx: &mut ActionContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Run `action_<action>` with the route parameters in positional order.
    ///
    /// Return [`ActionOutcome::Missing`] when the controller has no such action.
    fn action(
        &mut self,
        action: &str,
        params: &[&str],
        cx: &mut ActionContext<'_>,
    ) -> Result<ActionOutcome>;

    /// Dynamic dispatch hook for actions the controller does not define.
    ///
    /// `None` means the controller has no such hook.
    fn catch_all(
        &mut self,
        _action: &str,
        _params: &ParamVec,
        _cx: &mut ActionContext<'_>,
    ) -> Option<Result<()>> {
        None
    }

    /// Runs after the action completed successfully.
    fn after(&mut self, _cx: &mut ActionContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// What a controller sees while it runs.
pub struct ActionContext<'a> {
    request: &'a Request,
    response: &'a mut Response,
    dispatcher: &'a Dispatcher,
    stack: &'a mut RequestStack,
}

impl<'a> ActionContext<'a> {
    pub(crate) fn new(
        request: &'a Request,
        response: &'a mut Response,
        dispatcher: &'a Dispatcher,
        stack: &'a mut RequestStack,
    ) -> Self {
        Self {
            request,
            response,
            dispatcher,
            stack,
        }
    }

    #[must_use]
    pub fn request(&self) -> &Request {
        self.request
    }

    #[must_use]
    pub fn response(&self) -> &Response {
        self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        self.response
    }

    /// The request stack as seen from inside this dispatch.
    #[must_use]
    pub fn stack(&self) -> &RequestStack {
        self.stack
    }

    /// Execute a sub-request synchronously on the same request stack.
    ///
    /// # Errors
    ///
    /// Returns whatever [`Dispatcher::execute`] returns for the sub-request.
    pub fn execute(&mut self, request: Request) -> Result<Response, DispatchError> {
        self.dispatcher.execute(self.stack, request)
    }
}
