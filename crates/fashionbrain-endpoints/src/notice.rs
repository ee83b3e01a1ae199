//! Operator notices raised during resolution.

/// Receives operator-facing warnings.
///
/// The resolver decides *when* to warn (at most once per resolver); a sink
/// only decides *how* the warning is shown.
pub trait NoticeSink: Send + Sync + 'static {
    fn warn(&self, message: &str);
}

/// Default sink: emits the notice as a `tracing` warning.
#[derive(Debug, Clone, Default)]
pub struct TracingNotice;

impl NoticeSink for TracingNotice {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}
