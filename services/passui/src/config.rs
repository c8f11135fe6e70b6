//! Domain discovery from the Silver configuration file.
//!
//! The Silver config is YAML, but the only value this service needs is the
//! first entry of the `domains` list. A line scan keeps the config surface
//! read-only and avoids taking a dependency on the full document structure.

use regex::Regex;
use std::{fs, path::Path, sync::OnceLock};
use tracing::{debug, warn};

fn domain_regex() -> &'static Regex {
    static DOMAIN_RE: OnceLock<Regex> = OnceLock::new();
    DOMAIN_RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*-\s*domain:\s*(.+)$").unwrap_or_else(|_| unreachable!())
    })
}

/// Read the first `- domain:` entry from the Silver configuration file.
///
/// Returns `None` when the file is missing, unreadable, or holds no domain
/// entry; callers fall back to `localhost`.
#[must_use]
pub fn domain_from_config(path: &Path) -> Option<String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!("Error reading {}: {}", path.display(), err);
            return None;
        }
    };

    domain_from_str(&content).inspect(|domain| {
        debug!("Loaded domain from config: {domain}");
    })
}

fn domain_from_str(content: &str) -> Option<String> {
    let captures = domain_regex().captures(content)?;
    let domain = captures.get(1)?.as_str().trim();
    if domain.is_empty() {
        None
    } else {
        Some(domain.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SILVER_YAML: &str = r"
mail:
  domains:
    - domain: example.com
      dkim: /etc/silver/dkim/example.com.key
    - domain: second.example.net
";

    #[test]
    fn first_domain_wins() {
        assert_eq!(
            domain_from_str(SILVER_YAML),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn whitespace_is_trimmed() {
        assert_eq!(
            domain_from_str("  - domain:    spaced.example.org   \n"),
            Some("spaced.example.org".to_string())
        );
    }

    #[test]
    fn missing_key_yields_none() {
        assert_eq!(domain_from_str("mail:\n  tls: true\n"), None);
    }

    #[test]
    fn empty_value_yields_none() {
        // A regex match requires at least one character after the colon, and a
        // whitespace-only value must not become an empty domain.
        assert_eq!(domain_from_str("- domain: \n"), None);
        assert_eq!(domain_from_str("- domain:\n"), None);
    }

    #[test]
    fn missing_file_yields_none() {
        let path = std::env::temp_dir().join("passui-config-test-missing.yaml");
        assert_eq!(domain_from_config(&path), None);
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SILVER_YAML.as_bytes()).expect("write yaml");

        assert_eq!(
            domain_from_config(file.path()),
            Some("example.com".to_string())
        );
    }
}
