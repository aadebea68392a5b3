//! Display helpers shared by the HTML report and the CLI summary.

use std::time::Duration;

pub fn format_bytes(b: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    const GIB: u64 = 1024 * 1024 * 1024;

    if b >= GIB {
        return format!("{:.2}GiB", (b as f64) / (GIB as f64));
    }
    if b >= MIB {
        return format!("{:.2}MiB", (b as f64) / (MIB as f64));
    }
    if b >= KIB {
        return format!("{:.2}KiB", (b as f64) / (KIB as f64));
    }

    format!("{b}B")
}

/// Milliseconds with a unit that keeps at most two decimals: `850µs`, `12.34ms`, `3.20s`.
pub fn format_ms(ms: f64) -> String {
    if !ms.is_finite() {
        return "-".to_string();
    }
    if ms >= 1_000.0 {
        return format!("{:.2}s", ms / 1_000.0);
    }
    if ms < 1.0 {
        return format!("{:.0}µs", ms * 1_000.0);
    }
    format!("{ms:.2}ms")
}

pub fn format_opt_ms(ms: Option<f64>) -> String {
    ms.map_or_else(|| "-".to_string(), format_ms)
}

pub fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.0}")
    } else {
        "0".to_string()
    }
}

/// A `0.0..=1.0` share as a percentage with two decimals.
pub fn format_pct(share: f64) -> String {
    if share.is_finite() {
        format!("{:.2}%", share * 100.0)
    } else {
        "-".to_string()
    }
}

/// One rounded component: `us`, `ms` or `s`.
pub fn format_duration_single(d: Duration) -> String {
    const NS_PER_US: u128 = 1_000;
    const NS_PER_MS: u128 = 1_000_000;
    const NS_PER_S: u128 = 1_000_000_000;

    fn round_div(value: u128, unit: u128) -> u128 {
        (value + (unit / 2)) / unit
    }

    let total_ns = d.as_nanos();
    if total_ns >= NS_PER_S {
        return format!("{}s", round_div(total_ns, NS_PER_S));
    }
    if total_ns >= NS_PER_MS {
        return format!("{}ms", round_div(total_ns, NS_PER_MS));
    }
    format!("{}us", round_div(total_ns, NS_PER_US))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_pick_binary_units() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(1536), "1.50KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00MiB");
    }

    #[test]
    fn milliseconds_scale() {
        assert_eq!(format_ms(0.25), "250µs");
        assert_eq!(format_ms(12.346), "12.35ms");
        assert_eq!(format_ms(3_200.0), "3.20s");
        assert_eq!(format_opt_ms(None), "-");
    }

    #[test]
    fn durations_round_to_one_component() {
        assert_eq!(format_duration_single(Duration::from_micros(1_499)), "1ms");
        assert_eq!(format_duration_single(Duration::from_millis(1_500)), "2s");
        assert_eq!(format_duration_single(Duration::from_micros(7)), "7us");
    }

    #[test]
    fn percentages() {
        assert_eq!(format_pct(0.005), "0.50%");
        assert_eq!(format_pct(f64::NAN), "-");
    }
}
