use std::fmt;

/// Identity of one request on a [`RequestStack`](crate::stack::RequestStack).
///
/// The stack compares ids rather than URIs, so two sub-requests to the same
/// URI stay distinguishable. ULIDs sort by creation time, which keeps log
/// lines for a nested chain in order when grouped by `request_id`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct RequestId(ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
