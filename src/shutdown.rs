//! Cooperative, process-wide shutdown

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A flag shared by the acceptor and every worker
///
/// Workers check it between records and between queue waits. A read that is
/// already blocked is not interrupted; the connection's read timeout bounds
/// how long it can take.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    triggered: Arc<AtomicBool>
}

impl Shutdown {
    pub fn new() -> Shutdown {
        Default::default()
    }

    /// Sets the flag, returning whether it was already set
    pub fn trigger(&self) -> bool {
        self.triggered.swap(true, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }
}
