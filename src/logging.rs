//! Tracing setup for binaries and tests embedding the service graph.

use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

/// Install a global fmt subscriber. `RUST_LOG` takes precedence over
/// `default_filter`. A second call is a no-op.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| Error::Config(format!("invalid log filter {default_filter:?}: {e}")))?,
    };

    // try_init fails only if a global subscriber is already set.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing("servicegraph=debug").unwrap();
        init_tracing("servicegraph=debug").unwrap();
    }
}
