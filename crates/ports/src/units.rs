//! Unit normalization boundary.

/// Maps a raw unit string to its canonical form.
pub trait UnitNormalizerPort: Send + Sync {
    /// Normalize `raw_unit`. Total: every input produces some output.
    fn parse(&self, raw_unit: &str) -> String;
}
