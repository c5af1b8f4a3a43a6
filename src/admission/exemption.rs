//! Path-based exemptions from rate limiting.

use std::collections::HashSet;

use super::request::RequestMetadata;

/// Decides whether the engine should be consulted at all for a request.
///
/// Exempt paths are admitted unconditionally, before identity resolution and
/// before any store access, so they never depend on store availability. The
/// default policy exempts the health-check path.
#[derive(Debug, Clone)]
pub struct ExemptionPolicy {
    exempt_paths: HashSet<String>,
}

impl ExemptionPolicy {
    /// Create a policy exempting exactly the given paths.
    pub fn new(exempt_paths: HashSet<String>) -> Self {
        Self { exempt_paths }
    }

    /// Whether this request bypasses rate limiting.
    pub fn is_exempt(&self, request: &RequestMetadata) -> bool {
        self.exempt_paths.contains(request.path())
    }
}

impl Default for ExemptionPolicy {
    fn default() -> Self {
        let mut exempt_paths = HashSet::new();
        exempt_paths.insert("/health".to_string());
        Self { exempt_paths }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_exempts_health() {
        let policy = ExemptionPolicy::default();

        assert!(policy.is_exempt(&RequestMetadata::new("/health")));
        assert!(!policy.is_exempt(&RequestMetadata::new("/orders")));
    }

    #[test]
    fn test_match_is_exact() {
        let policy = ExemptionPolicy::default();

        assert!(!policy.is_exempt(&RequestMetadata::new("/health/live")));
        assert!(!policy.is_exempt(&RequestMetadata::new("/Health")));
    }

    #[test]
    fn test_custom_paths() {
        let mut paths = HashSet::new();
        paths.insert("/metrics".to_string());
        let policy = ExemptionPolicy::new(paths);

        assert!(policy.is_exempt(&RequestMetadata::new("/metrics")));
        assert!(!policy.is_exempt(&RequestMetadata::new("/health")));
    }
}
