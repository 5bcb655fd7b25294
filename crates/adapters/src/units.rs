//! Unit normalization for `ValueMetric` units.
//!
//! Platform components report units as free text ("ms", "bytes", "req/s",
//! "percentage", ...). Monitoring backends expect UCUM-style units, so known
//! spellings map to their canonical form, ratios of known units map
//! component-wise, and anything else becomes a `{annotation}` which every
//! UCUM consumer accepts as a dimensionless count.

use nozzle_ports::UnitNormalizerPort;

/// Table-driven unit parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitParser;

impl UnitParser {
    /// New parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl UnitNormalizerPort for UnitParser {
    fn parse(&self, raw_unit: &str) -> String {
        normalize_unit(raw_unit)
    }
}

/// Normalize a raw unit string. Total: every input maps to some output.
#[must_use]
pub fn normalize_unit(raw_unit: &str) -> String {
    let unit = raw_unit.trim();
    if unit.is_empty() {
        return String::new();
    }

    if let Some(canonical) = canonical_unit(unit) {
        return canonical.to_string();
    }

    unit.split_once('/')
        .and_then(|(numerator, denominator)| {
            let top = canonical_or_annotation(numerator.trim())?;
            let bottom = canonical_unit(denominator.trim())?;
            Some(format!("{top}/{bottom}"))
        })
        .unwrap_or_else(|| annotation(unit))
}

fn canonical_or_annotation(unit: &str) -> Option<String> {
    if unit.is_empty() {
        return None;
    }
    Some(canonical_unit(unit).map_or_else(|| annotation(unit), str::to_string))
}

fn annotation(unit: &str) -> String {
    let cleaned: String = unit
        .chars()
        .filter(|ch| !matches!(ch, '{' | '}'))
        .collect();
    format!("{{{cleaned}}}")
}

fn canonical_unit(unit: &str) -> Option<&'static str> {
    let canonical = match unit.to_ascii_lowercase().as_str() {
        "ns" | "nanosecond" | "nanoseconds" => "ns",
        "us" | "µs" | "microsecond" | "microseconds" => "us",
        "ms" | "millisecond" | "milliseconds" => "ms",
        "s" | "sec" | "second" | "seconds" => "s",
        "min" | "minute" | "minutes" => "min",
        "h" | "hour" | "hours" => "h",
        "d" | "day" | "days" => "d",
        "b" | "by" | "byte" | "bytes" => "By",
        "kb" | "kby" | "kilobyte" | "kilobytes" => "kBy",
        "mb" | "mby" | "megabyte" | "megabytes" => "MBy",
        "gb" | "gby" | "gigabyte" | "gigabytes" => "GBy",
        "tb" | "tby" | "terabyte" | "terabytes" => "TBy",
        "kib" | "kiby" | "kibibyte" | "kibibytes" => "KiBy",
        "mib" | "miby" | "mebibyte" | "mebibytes" => "MiBy",
        "gib" | "giby" | "gibibyte" | "gibibytes" => "GiBy",
        "tib" | "tiby" | "tebibyte" | "tebibytes" => "TiBy",
        "bit" | "bits" => "bit",
        "%" | "percent" | "percentage" => "%",
        "count" | "1" => "1",
        _ => return None,
    };
    Some(canonical)
}
