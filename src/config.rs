use std::path::{Path, PathBuf};

use tracing::warn;

/// Fallback base URL when nothing else is configured.
pub(crate) const DEFAULT_API_URL: &str = "http://localhost:8001";

/// Resolves the ingestion API base URL using (in order of precedence):
/// - an explicit `url` argument
/// - the `INGEST_API_URL` environment variable
/// - a `url:` entry in a config file from `INGESTAPI_RC` or `.ingestapirc`
/// - `http://localhost:8001`
pub(crate) fn resolve_base_url(url: Option<String>) -> String {
    let env_url = std::env::var("INGEST_API_URL").ok();
    resolve(url, env_url, &rc_candidates())
}

fn resolve(url: Option<String>, env_url: Option<String>, rc_candidates: &[PathBuf]) -> String {
    if let Some(u) = non_empty(url) {
        return u;
    }
    if let Some(u) = non_empty(env_url) {
        return u;
    }

    for rc_path in rc_candidates {
        if rc_path.exists() {
            if let Some(u) = read_rc(rc_path) {
                return u;
            }
            break;
        }
    }

    DEFAULT_API_URL.to_string()
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

fn read_rc(path: &Path) -> Option<String> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("failed to read configuration file {}: {e}", path.display());
            return None;
        }
    };

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once(':') {
            if k.trim() == "url" {
                let v = strip_quotes(v.trim());
                if !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
    }

    None
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // Search order:
    // 1) INGESTAPI_RC (explicit)
    // 2) ./.ingestapirc (current working directory)
    // 3) ~/.ingestapirc
    if let Ok(p) = std::env::var("INGESTAPI_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".ingestapirc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".ingestapirc"));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_rc(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn explicit_url_wins() {
        let url = resolve(
            Some("http://one:8001".into()),
            Some("http://two:8001".into()),
            &[],
        );
        assert_eq!(url, "http://one:8001");
    }

    #[test]
    fn env_url_beats_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let rc = write_rc(dir.path(), ".ingestapirc", "url: http://three:8001\n");
        let url = resolve(None, Some("http://two:8001".into()), &[rc]);
        assert_eq!(url, "http://two:8001");
    }

    #[test]
    fn rc_file_beats_default() {
        let dir = tempfile::tempdir().unwrap();
        let rc = write_rc(
            dir.path(),
            ".ingestapirc",
            "# ingestion API\nurl: \"http://three:8001\"\n",
        );
        let url = resolve(None, None, &[rc]);
        assert_eq!(url, "http://three:8001");
    }

    #[test]
    fn falls_back_to_localhost() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join(".ingestapirc");
        assert_eq!(resolve(None, None, &[missing]), DEFAULT_API_URL);
    }

    #[test]
    fn blank_values_are_ignored() {
        assert_eq!(resolve(Some("  ".into()), None, &[]), DEFAULT_API_URL);
    }

    #[test]
    fn rc_without_url_key_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        let rc = write_rc(dir.path(), ".ingestapirc", "timeout: 60\n");
        assert_eq!(resolve(None, None, &[rc]), DEFAULT_API_URL);
    }

    #[test]
    fn quotes_are_stripped() {
        assert_eq!(strip_quotes("'http://x'"), "http://x");
        assert_eq!(strip_quotes("\"http://x\""), "http://x");
        assert_eq!(strip_quotes("http://x"), "http://x");
    }
}
