//! Card reader backends selected by configuration.

pub mod lines;
pub mod pcsc;

use tapcast_config::{ReaderBackendKind, ReaderConfig};
use tapcast_core::ReaderBackend;

pub use lines::LineReader;
pub use pcsc::PcscReader;

/// Backend for `config`, or `None` when scanning is disabled.
pub fn build_backend(config: &ReaderConfig) -> Option<Box<dyn ReaderBackend>> {
    match config.backend {
        ReaderBackendKind::Pcsc => {
            Some(Box::new(PcscReader::new(config.poll_interval())))
        }
        ReaderBackendKind::Stdin => Some(Box::new(LineReader::stdin())),
        ReaderBackendKind::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(backend: ReaderBackendKind) -> ReaderConfig {
        ReaderConfig {
            backend,
            poll_interval_ms: 500,
        }
    }

    #[test]
    fn backend_follows_configured_kind() {
        assert_eq!(
            build_backend(&config(ReaderBackendKind::Pcsc)).map(|b| b.name()),
            Some("pcsc")
        );
        assert_eq!(
            build_backend(&config(ReaderBackendKind::Stdin)).map(|b| b.name()),
            Some("stdin")
        );
        assert!(build_backend(&config(ReaderBackendKind::None)).is_none());
    }
}
