//! Request stack: which request is executing, which one it interrupted, and
//! which one started the whole chain.
//!
//! A stack belongs to one logical request thread. It is passed by `&mut` into
//! [`Dispatcher::execute`](crate::dispatcher::Dispatcher::execute) and from
//! there into controllers, so nested sub-requests push onto the same stack
//! while concurrent dispatches on other threads keep their own.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::trace;

use crate::ids::RequestId;
use crate::request::Request;

/// Lightweight handle to a request held by the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRef {
    pub id: RequestId,
    pub uri: Arc<str>,
}

impl From<&Request> for RequestRef {
    fn from(request: &Request) -> Self {
        Self {
            id: request.request_id,
            uri: Arc::from(request.uri.as_str()),
        }
    }
}

impl RequestRef {
    #[must_use]
    pub fn is(&self, request: &Request) -> bool {
        self.id == request.request_id
    }
}

/// Current / previous / initial request tracking.
#[derive(Debug, Default)]
pub struct RequestStack {
    current: Option<RequestRef>,
    initial: Option<RequestRef>,
    /// `current` values saved by each push, innermost last
    saved: Vec<Option<RequestRef>>,
}

impl RequestStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack whose root request is `request`.
    #[must_use]
    pub fn with_initial(request: &Request) -> Self {
        let mut stack = Self::new();
        stack.set_initial(request);
        stack
    }

    /// Record `request` as the root request. Only the first call has effect;
    /// returns whether this call set it.
    pub fn set_initial(&mut self, request: &Request) -> bool {
        if self.initial.is_some() {
            return false;
        }
        self.initial = Some(RequestRef::from(request));
        true
    }

    #[must_use]
    pub fn current(&self) -> Option<&RequestRef> {
        self.current.as_ref()
    }

    /// The request that was current before the innermost push.
    #[must_use]
    pub fn previous(&self) -> Option<&RequestRef> {
        self.saved.last().and_then(Option::as_ref)
    }

    #[must_use]
    pub fn initial(&self) -> Option<&RequestRef> {
        self.initial.as_ref()
    }

    #[must_use]
    pub fn is_initial(&self, request: &Request) -> bool {
        self.initial.as_ref().is_some_and(|r| r.is(request))
    }

    /// Number of requests currently executing on this stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Make `request` current and return the request it replaced.
    ///
    /// Every `push` must be matched by a [`pop`](Self::pop) with the returned
    /// value; prefer [`enter`](Self::enter), which does this on drop.
    pub fn push(&mut self, request: &Request) -> Option<RequestRef> {
        let previous = self.current.replace(RequestRef::from(request));
        self.saved.push(previous.clone());
        trace!(
            uri = %request.uri,
            depth = self.saved.len(),
            "Request stack push"
        );
        previous
    }

    /// Restore `previous` as the current request.
    pub fn pop(&mut self, previous: Option<RequestRef>) {
        let saved = self.saved.pop();
        debug_assert_eq!(saved.as_ref(), Some(&previous), "unbalanced request stack");
        trace!(depth = self.saved.len(), "Request stack pop");
        self.current = previous;
    }

    /// Push `request` for the lifetime of the returned guard.
    pub fn enter(&mut self, request: &Request) -> StackGuard<'_> {
        let previous = self.push(request);
        StackGuard {
            stack: self,
            previous: Some(previous),
        }
    }
}

/// Scoped ownership of the current-request slot.
///
/// Dereferences to the underlying [`RequestStack`] so nested dispatch can keep
/// using it. Dropping the guard, on success, error return or unwind, restores
/// the previous request.
#[derive(Debug)]
pub struct StackGuard<'a> {
    stack: &'a mut RequestStack,
    previous: Option<Option<RequestRef>>,
}

impl Deref for StackGuard<'_> {
    type Target = RequestStack;

    fn deref(&self) -> &RequestStack {
        self.stack
    }
}

impl DerefMut for StackGuard<'_> {
    fn deref_mut(&mut self) -> &mut RequestStack {
        self.stack
    }
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.stack.pop(previous);
        }
    }
}
