mod exact;
mod reanchor;

pub use exact::ExactMatcher;
pub use reanchor::{find_subsequence, ReanchorMatcher};

use gvas_core::Matcher;
use std::sync::Arc;

pub const REANCHOR: &str = "reanchor";
pub const EXACT: &str = "exact";

/// Names accepted by [`matcher_by_name`], default first.
pub const MATCHER_NAMES: &[&str] = &[REANCHOR, EXACT];

/// Resolve a search strategy from its command-line name.
pub fn matcher_by_name(name: &str) -> anyhow::Result<Arc<dyn Matcher>> {
    match name {
        REANCHOR => Ok(Arc::new(ReanchorMatcher)),
        EXACT | "memmem" => Ok(Arc::new(ExactMatcher)),
        other => anyhow::bail!(
            "unknown search strategy '{}'. Valid options: {}",
            other,
            MATCHER_NAMES.join(", ")
        ),
    }
}
