//! Timing helpers for pipeline logging.

use std::time::Instant;

/// RAII timer that logs elapsed time on drop.
///
/// ```ignore
/// let _t = Timed::debug("Build grids");
/// // ... do work ...
/// // logs "Build grids: 1.234ms" when _t is dropped
/// ```
pub(crate) struct Timed {
    name: &'static str,
    start: Instant,
}

impl Timed {
    /// Create a new timer that logs at DEBUG level.
    pub(crate) fn debug(name: &'static str) -> Self {
        log::trace!("{}...", name);
        Self {
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for Timed {
    fn drop(&mut self) {
        log::debug!("{}: {:.3?}", self.name, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_measures_from_creation() {
        let t = Timed::debug("test stage");
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert_eq!(t.name, "test stage");
        assert!(t.start.elapsed() >= std::time::Duration::from_millis(2));
    }
}
