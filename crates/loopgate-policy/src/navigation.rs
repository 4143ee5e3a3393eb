//! Navigation admission for the embedded webview
//!
//! Evaluated fresh for every navigation attempt; the policy holds no
//! mutable state. The caller presents the block reason to the user when a
//! verdict comes back [`NavigationVerdict::Prevent`].

use loopgate_core::AllowListConfig;

use crate::validator::{describe_block_reason, is_same_origin, is_url_allowed};

/// Outcome of a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationVerdict {
    /// Let the webview load the target
    Navigate,
    /// Cancel the load
    Prevent,
}

impl NavigationVerdict {
    pub fn is_allowed(self) -> bool {
        self == NavigationVerdict::Navigate
    }
}

/// Decides what the embedded webview may load.
///
/// The server's own origin is always reachable. Everything else must pass
/// the allow-list, and even then only an explicit user gesture may cross
/// to a different local target: automatic redirects to an allowed but
/// unrelated port stay blocked, so a page served locally cannot silently
/// steer the view somewhere else.
#[derive(Debug, Clone, Default)]
pub struct NavigationPolicy {
    allow: AllowListConfig,
}

impl NavigationPolicy {
    pub fn new(allow: AllowListConfig) -> Self {
        Self { allow }
    }

    /// Verdict for a single navigation attempt.
    pub fn decide(
        &self,
        target_url: &str,
        server_url: &str,
        user_initiated: bool,
    ) -> NavigationVerdict {
        if is_same_origin(target_url, server_url) {
            return NavigationVerdict::Navigate;
        }

        if !is_url_allowed(&self.allow, target_url) {
            return NavigationVerdict::Prevent;
        }

        if user_initiated {
            NavigationVerdict::Navigate
        } else {
            NavigationVerdict::Prevent
        }
    }

    /// Why the target would be blocked, for user presentation.
    pub fn block_reason(&self, target_url: &str) -> String {
        describe_block_reason(&self.allow, target_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER: &str = "http://localhost:3000";

    fn policy() -> NavigationPolicy {
        NavigationPolicy::default()
    }

    #[test]
    fn test_same_origin_always_navigates() {
        // Even without a user gesture
        assert_eq!(
            policy().decide(SERVER, SERVER, false),
            NavigationVerdict::Navigate
        );
        assert_eq!(
            policy().decide("http://localhost:3000/page?x=1", SERVER, false),
            NavigationVerdict::Navigate
        );
    }

    #[test]
    fn test_allowed_but_cross_origin_requires_user_gesture() {
        // Allowed host/port, different origin, programmatic -> blocked
        assert_eq!(
            policy().decide("http://localhost:8080/x", SERVER, false),
            NavigationVerdict::Prevent
        );
        // Same target with a user gesture -> allowed
        assert_eq!(
            policy().decide("http://localhost:8080/x", SERVER, true),
            NavigationVerdict::Navigate
        );
    }

    #[test]
    fn test_disallowed_target_blocked_even_when_user_initiated() {
        assert_eq!(
            policy().decide("http://evil.example", SERVER, true),
            NavigationVerdict::Prevent
        );
        assert_eq!(
            policy().decide("http://localhost:9999", SERVER, true),
            NavigationVerdict::Prevent
        );
    }

    #[test]
    fn test_malformed_target_blocked() {
        assert_eq!(
            policy().decide("not a url", SERVER, true),
            NavigationVerdict::Prevent
        );
    }

    #[test]
    fn test_block_reason_passthrough() {
        let reason = policy().block_reason("http://localhost:9999");
        assert!(reason.contains("port 9999"));
    }

    #[test]
    fn test_verdict_is_allowed() {
        assert!(NavigationVerdict::Navigate.is_allowed());
        assert!(!NavigationVerdict::Prevent.is_allowed());
    }
}
