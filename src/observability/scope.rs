//! Observation scopes: begin/complete logging around a unit of work
//!
//! - Logs `BEGIN` on creation
//! - Logs `COMPLETE` or `FAILED` with the elapsed time when closed
//! - Logs `INCOMPLETE` on drop if neither was called

use std::time::Instant;

use tracing::{error, info, warn};

/// A scope that logs the start and end of an operation
///
/// ```
/// use devicedb::observability::ObservationScope;
///
/// let scope = ObservationScope::new("audit");
/// // ... do work ...
/// scope.complete();
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    started: Instant,
    closed: bool,
}

impl<'a> ObservationScope<'a> {
    pub fn new(name: &'a str) -> Self {
        info!(target: "devicedb::scope", scope = name, "BEGIN");
        Self {
            name,
            started: Instant::now(),
            closed: false,
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    pub fn complete(mut self) {
        self.closed = true;
        info!(
            target: "devicedb::scope",
            scope = self.name,
            elapsed_ms = self.elapsed_ms() as u64,
            "COMPLETE"
        );
    }

    pub fn fail(mut self, reason: &str) {
        self.closed = true;
        error!(
            target: "devicedb::scope",
            scope = self.name,
            elapsed_ms = self.elapsed_ms() as u64,
            reason = reason,
            "FAILED"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                target: "devicedb::scope",
                scope = self.name,
                "INCOMPLETE: scope dropped without completion"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_closes() {
        let scope = ObservationScope::new("test");
        assert!(!scope.is_closed());
        scope.complete();

        let scope = ObservationScope::new("test");
        scope.fail("boom");

        // dropped without completion; only logs
        let _scope = ObservationScope::new("test");
    }
}
