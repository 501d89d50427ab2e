//! Human-readable rendering of raw resource quantities

use crate::models::Observed;

const KI: u64 = 1024;
const MI: u64 = KI * 1024;
const GI: u64 = MI * 1024;
const TI: u64 = GI * 1024;

/// Bytes per GiB, the unit memory is priced in
pub const BYTES_PER_GIB: f64 = GI as f64;

/// Format bytes as a binary-unit string (`512.00Mi`, `1.50Gi`)
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= TI {
        format!("{:.2}Ti", bytes as f64 / TI as f64)
    } else if bytes >= GI {
        format!("{:.2}Gi", bytes as f64 / GI as f64)
    } else if bytes >= MI {
        format!("{:.2}Mi", bytes as f64 / MI as f64)
    } else if bytes >= KI {
        format!("{:.2}Ki", bytes as f64 / KI as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Format millicores as `250m` below one core and `1.5` cores above
pub fn format_cpu(millicores: u64) -> String {
    if millicores >= 1000 {
        format!("{:.1}", millicores as f64 / 1000.0)
    } else {
        format!("{}m", millicores)
    }
}

/// Format an optional quantity, rendering undeclared values as `-`
pub fn format_cpu_opt(millicores: Option<u64>) -> String {
    millicores.map(format_cpu).unwrap_or_else(|| "-".to_string())
}

pub fn format_bytes_opt(bytes: Option<u64>) -> String {
    bytes.map(format_bytes).unwrap_or_else(|| "-".to_string())
}

/// Format a percentage, or `n/a` when it could not be computed
pub fn format_percent(value: Observed<f64>) -> String {
    match value {
        Observed::Known(v) => format!("{:.1}%", v),
        Observed::Unavailable => "n/a".to_string(),
    }
}

/// Format currency
pub fn format_currency(amount: f64, currency: &str) -> String {
    match currency {
        "USD" => format!("${:.2}", amount),
        "EUR" => format!("€{:.2}", amount),
        "GBP" => format!("£{:.2}", amount),
        _ => format!("{:.2} {}", amount, currency),
    }
}
