//! Transcript storage infrastructure.
//!
//! Implements the `BlobStore` trait from `vision-core` on the local
//! filesystem and builds the persistence sink from configuration.

pub mod local;

pub use local::LocalBlobStore;

use vision_core::persistence::{BoxBlobStore, PersistenceSink};
use vision_types::config::PersistenceConfig;

/// Build the persistence sink described by `config`.
///
/// Without a configured directory the sink is disabled.
pub fn create_sink(config: &PersistenceConfig) -> PersistenceSink {
    match &config.dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "transcript persistence enabled");
            PersistenceSink::new(BoxBlobStore::new(LocalBlobStore::new(dir.clone())))
        }
        None => {
            tracing::info!("transcript persistence disabled (no directory configured)");
            PersistenceSink::disabled()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn create_sink_follows_config() {
        assert!(!create_sink(&PersistenceConfig::default()).is_enabled());

        let config = PersistenceConfig {
            dir: Some(PathBuf::from("/tmp/vision-transcripts")),
        };
        assert!(create_sink(&config).is_enabled());
    }
}
