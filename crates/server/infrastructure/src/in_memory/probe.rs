use dashmap::DashMap;
use reverse_repl_domain::{PortError, PortResult};

/// Call counting and failure injection shared by the in-memory adapters.
///
/// Operations are keyed by the port method name, e.g. `"create_bucket"`.
#[derive(Debug, Default)]
pub struct PortProbe {
    /// Injected error and the 1-based call number it starts at.
    failures: DashMap<&'static str, (usize, PortError)>,
    calls: DashMap<&'static str, usize>,
}

impl PortProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call to `operation` fail with `error`.
    pub fn fail_on(&self, operation: &'static str, error: PortError) {
        self.failures.insert(operation, (0, error));
    }

    /// Lets the first `nth - 1` calls to `operation` through, then fails from
    /// call `nth` onwards.
    pub fn fail_from_call(&self, operation: &'static str, nth: usize, error: PortError) {
        self.failures.insert(operation, (nth, error));
    }

    pub fn clear_failure(&self, operation: &'static str) {
        self.failures.remove(operation);
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls.get(operation).map(|c| *c).unwrap_or(0)
    }

    /// Counts a call to `operation` and returns the injected failure, if any.
    pub fn enter(&self, operation: &'static str) -> PortResult<()> {
        let call = {
            let mut count = self.calls.entry(operation).or_insert(0);
            *count += 1;
            *count
        };
        match self.failures.get(operation) {
            Some(failure) if call >= failure.0 => Err(failure.1.clone()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_calls_and_injects_failures() {
        let probe = PortProbe::new();
        assert!(probe.enter("create_bucket").is_ok());

        probe.fail_on("create_bucket", PortError::Unavailable("down".into()));
        assert_eq!(
            probe.enter("create_bucket"),
            Err(PortError::Unavailable("down".into()))
        );
        assert_eq!(probe.call_count("create_bucket"), 2);

        probe.clear_failure("create_bucket");
        assert!(probe.enter("create_bucket").is_ok());
        assert_eq!(probe.call_count("delete_bucket"), 0);
    }

    #[test]
    fn test_fail_from_call_skips_earlier_calls() {
        let probe = PortProbe::new();
        probe.fail_from_call("launch", 2, PortError::Unavailable("second".into()));

        assert!(probe.enter("launch").is_ok());
        assert!(probe.enter("launch").is_err());
        assert!(probe.enter("launch").is_err());
    }
}
