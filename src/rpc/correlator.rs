//! Request identifier allocation.

use parking_lot::Mutex;

use super::RequestId;

/// Hands out strictly increasing request identifiers.
///
/// One correlator is shared by every client that talks over the same
/// transport. The lock covers only the read-and-increment of the counter.
#[derive(Debug, Default)]
pub struct RequestCorrelator {
    next: Mutex<u64>,
}

impl RequestCorrelator {
    /// Creates a correlator whose first identifier is `0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a correlator whose first identifier is `first`.
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Mutex::new(first),
        }
    }

    /// Allocates the next identifier.
    pub fn next_id(&self) -> RequestId {
        let mut next = self.next.lock();
        let current = *next;
        *next = current.wrapping_add(1);
        RequestId::new(current)
    }
}
