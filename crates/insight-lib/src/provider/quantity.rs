//! Kubernetes resource quantity parsing
//!
//! Handles decimal SI suffixes (`n`, `u`, `m`, `k`, `M`, `G`, `T`, `P`, `E`),
//! binary suffixes (`Ki` .. `Ei`) and decimal exponents (`1e3`).

/// Parse a quantity into base units (cores or bytes)
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);
    let value: f64 = number.parse().ok()?;

    let multiplier = match suffix {
        "" => 1.0,
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024f64,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "Pi" => 1024f64.powi(5),
        "Ei" => 1024f64.powi(6),
        exp if exp.starts_with(|c| c == 'e' || c == 'E') => {
            10f64.powi(exp[1..].parse::<i32>().ok()?)
        }
        _ => return None,
    };

    let value = value * multiplier;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// CPU quantity in millicores, e.g. `250m` -> 250, `2` -> 2000
pub fn parse_cpu_milli(raw: &str) -> Option<u64> {
    parse_quantity(raw).map(|cores| (cores * 1000.0).round() as u64)
}

/// Memory quantity in bytes, e.g. `128Mi` -> 134217728
pub fn parse_memory_bytes(raw: &str) -> Option<u64> {
    parse_quantity(raw).map(|bytes| bytes.round() as u64)
}
