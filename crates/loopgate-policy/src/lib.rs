//! # loopgate-policy - URL Admission and Navigation Policy
//!
//! Pure decision logic gating what the embedded webview may load. No I/O,
//! no stored state: every verdict is a function of the target URL, the
//! server's own URL, and whether a user gesture caused the attempt.
//!
//! ## Public API
//!
//! ### Validator (`validator`)
//! - [`is_url_allowed()`] - Allow-list admission (scheme, host, written port)
//! - [`describe_block_reason()`] - First failing check, human-readable
//! - [`is_same_origin()`] - Exact scheme/host/written-port equality
//!
//! ### Navigation (`navigation`)
//! - [`NavigationPolicy`] - Per-attempt verdicts
//! - [`NavigationVerdict`] - `Navigate` or `Prevent`

pub mod navigation;
pub mod validator;

pub use navigation::{NavigationPolicy, NavigationVerdict};
pub use validator::{describe_block_reason, is_same_origin, is_url_allowed};
