//! Self-monitoring event counting boundary.

/// Records occurrences of named internal events.
pub trait HeartbeatPort: Send + Sync {
    /// Count one occurrence of `event`.
    fn handle(&self, event: &str);
}
