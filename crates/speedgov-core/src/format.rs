//! Human-readable formatting for byte rates and sizes.

const SPEED_UNITS: [&str; 4] = ["B/s", "KiB/s", "MiB/s", "GiB/s"];
const SIZE_UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Format a byte rate with a binary unit, falling back to `TiB/s` beyond the
/// table.
#[must_use]
pub fn fmt_speed(bytes_per_sec: f64) -> String {
    format_scaled(bytes_per_sec, &SPEED_UNITS, "TiB/s", 1)
}

/// Format a byte count with a binary unit, falling back to `PiB` beyond the
/// table.
#[must_use]
pub fn fmt_size(bytes: f64) -> String {
    format_scaled(bytes, &SIZE_UNITS, "PiB", 2)
}

fn format_scaled(value: f64, units: &[&str], overflow_unit: &str, precision: usize) -> String {
    if value == 0.0 {
        return format!("0 {}", units[0]);
    }
    let mut scaled = value;
    for unit in units {
        if scaled.abs() < 1024.0 {
            return format!("{scaled:.precision$} {unit}");
        }
        scaled /= 1024.0;
    }
    format!("{scaled:.precision$} {overflow_unit}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_zero() {
        assert_eq!(fmt_speed(0.0), "0 B/s");
        assert_eq!(fmt_size(0.0), "0 B");
    }

    #[test]
    fn formats_within_table() {
        assert_eq!(fmt_speed(2048.0), "2.0 KiB/s");
        assert_eq!(fmt_size(1_572_864.0), "1.50 MiB");
    }

    #[test]
    fn formats_beyond_table() {
        let huge = 1024f64.powi(5);
        assert!(fmt_speed(huge).ends_with("TiB/s"));
        let huger = 1024f64.powi(6);
        assert!(fmt_size(huger).ends_with("PiB"));
    }
}
