//! Path and argument resolution for the CLI

use std::path::PathBuf;
use std::time::Duration;

/// Resolve the kubeconfig to load
///
/// An explicit path (or `KUBECONFIG`, which clap folds into the same flag)
/// wins; a list of paths uses its first entry. Otherwise `~/.kube/config`
/// is used if it exists. `None` lets the client fall back to in-cluster
/// configuration.
pub fn kubeconfig_path(override_path: Option<&str>) -> Option<PathBuf> {
    if let Some(paths) = override_path.filter(|p| !p.is_empty()) {
        return std::env::split_paths(paths).next();
    }

    let default = dirs_next::home_dir()?.join(".kube").join("config");
    default.exists().then_some(default)
}

/// Resolve the engine configuration file
///
/// Without an explicit path, `~/.config/kinsight/config.toml` is used when
/// present and built-in defaults otherwise.
pub fn engine_config_path(override_path: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        return Some(PathBuf::from(path));
    }

    let default = dirs_next::home_dir()?
        .join(".config")
        .join("kinsight")
        .join("config.toml");
    default.exists().then_some(default)
}

/// Parse a look-back window such as `90s`, `30m`, `1h` or `2d`
pub fn parse_since(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    let amount: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{}': expected e.g. 30m, 1h, 2d", value))?;
    let seconds = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        other => return Err(format!("unknown duration unit '{}' (use s, m, h or d)", other)),
    };

    if amount == 0 {
        return Err("duration must be greater than zero".to_string());
    }
    Ok(Duration::from_secs(amount * seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_since_units() {
        assert_eq!(parse_since("90s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_since("30m"), Ok(Duration::from_secs(1800)));
        assert_eq!(parse_since("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_since("2d"), Ok(Duration::from_secs(172_800)));
        assert_eq!(parse_since("45"), Ok(Duration::from_secs(45)));
    }

    #[test]
    fn test_parse_since_rejects_garbage() {
        assert!(parse_since("h").is_err());
        assert!(parse_since("1w").is_err());
        assert!(parse_since("0m").is_err());
        assert!(parse_since("").is_err());
    }

    #[test]
    fn test_explicit_kubeconfig_wins() {
        assert_eq!(
            kubeconfig_path(Some("/tmp/kind.yaml")),
            Some(PathBuf::from("/tmp/kind.yaml"))
        );
    }

    #[test]
    fn test_explicit_engine_config_wins() {
        assert_eq!(
            engine_config_path(Some("pricing.toml")),
            Some(PathBuf::from("pricing.toml"))
        );
    }
}
