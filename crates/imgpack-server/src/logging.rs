//! Logging initialization.
//!
//! `RUST_LOG` があればそれを使い、なければ `imgpack` 系のクレートだけ info 以上を出します。

use std::sync::Once;

use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "imgpack=info,imgpack_core=info,imgpack_server=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output.
    Development,
    /// JSON structured output.
    Production,
    /// No output; tests that only need `init` to be callable.
    Test,
}

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber. Later calls are no-ops.
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| match profile {
        Profile::Development => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .init();
        }
        Profile::Production => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(env_filter())
                .with_current_span(true)
                .init();
        }
        Profile::Test => {
            tracing_subscriber::registry().init();
        }
    });
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init(Profile::Test);
        init(Profile::Test);
        init(Profile::Production);
    }
}
