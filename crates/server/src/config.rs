use javals_fetch::PoolBudgets;
use std::env;
use std::fmt;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Credentials for a private artifact repository. The token never appears in
/// logs.
#[derive(Clone, PartialEq, Eq)]
pub struct RepoCredentials {
    pub user: String,
    pub token: String,
}

impl fmt::Debug for RepoCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoCredentials")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Pattern list selecting which workspace roots use the alternate
/// build-metadata extraction path. Each pattern is an exact match or a
/// trailing-wildcard prefix match against a root identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootPatterns {
    patterns: Vec<String>,
}

impl RootPatterns {
    pub fn parse(raw: Option<&str>) -> Self {
        let patterns = raw
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, root: &str) -> bool {
        self.patterns.iter().any(|pattern| {
            match pattern.strip_suffix('*') {
                Some(prefix) => root.starts_with(prefix),
                None => root == pattern,
            }
        })
    }
}

/// Environment-sourced configuration, read once at startup. Anything that
/// fails to parse falls back to its default; only a completely broken
/// environment is worth failing startup over, and none of these are that.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Wall-clock bound for blocking server-to-client callbacks. One global
    /// duration, not per-method.
    pub request_timeout: Duration,
    pub cache_enabled: bool,
    pub network_enabled: bool,
    pub repo_credentials: Option<RepoCredentials>,
    pub alt_build_roots: RootPatterns,
    pub pool_budgets: PoolBudgets,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            cache_enabled: true,
            network_enabled: true,
            repo_credentials: None,
            alt_build_roots: RootPatterns::default(),
            pool_budgets: PoolBudgets::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = PoolBudgets::default();
        Self {
            request_timeout: Duration::from_secs(parse_secs(
                env_value("JAVALS_REQUEST_TIMEOUT_SECS").as_deref(),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            cache_enabled: parse_toggle(env_value("JAVALS_CACHE").as_deref()),
            network_enabled: parse_toggle(env_value("JAVALS_NETWORK").as_deref()),
            repo_credentials: repo_credentials(
                env_value("JAVALS_REPO_USER"),
                env_value("JAVALS_REPO_TOKEN"),
            ),
            alt_build_roots: RootPatterns::parse(env_value("JAVALS_ALT_BUILD_ROOTS").as_deref()),
            pool_budgets: PoolBudgets {
                artifact: parse_limit(
                    env_value("JAVALS_ARTIFACT_FETCH_LIMIT").as_deref(),
                    defaults.artifact,
                ),
                file: parse_limit(env_value("JAVALS_FILE_FETCH_LIMIT").as_deref(), defaults.file),
                direct: parse_limit(
                    env_value("JAVALS_DIRECT_FETCH_LIMIT").as_deref(),
                    defaults.direct,
                ),
            }
            .clamped(),
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Toggles default to enabled; only an explicit `0`/`false` disables.
fn parse_toggle(raw: Option<&str>) -> bool {
    match raw {
        Some(value) => !(value == "0" || value.eq_ignore_ascii_case("false")),
        None => true,
    }
}

fn parse_secs(raw: Option<&str>, default_value: u64) -> u64 {
    raw.and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_REQUEST_TIMEOUT_SECS)
}

fn parse_limit(raw: Option<&str>, default_value: usize) -> usize {
    raw.and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
}

fn repo_credentials(user: Option<String>, token: Option<String>) -> Option<RepoCredentials> {
    match (user, token) {
        (Some(user), Some(token)) => Some(RepoCredentials { user, token }),
        (Some(_), None) | (None, Some(_)) => {
            log::warn!("ignoring partial repository credentials (need both user and token)");
            None
        }
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn toggles_default_on_and_only_explicit_off_disables() {
        assert!(parse_toggle(None));
        assert!(parse_toggle(Some("1")));
        assert!(parse_toggle(Some("yes")));
        assert!(!parse_toggle(Some("0")));
        assert!(!parse_toggle(Some("false")));
        assert!(!parse_toggle(Some("FALSE")));
    }

    #[test]
    fn timeout_parses_with_default_and_clamp() {
        assert_eq!(parse_secs(None, 10), 10);
        assert_eq!(parse_secs(Some("25"), 10), 25);
        assert_eq!(parse_secs(Some("abc"), 10), 10);
        assert_eq!(parse_secs(Some("0"), 10), 1);
        assert_eq!(parse_secs(Some("100000"), 10), MAX_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn root_patterns_match_exact_and_trailing_wildcard() {
        let patterns = RootPatterns::parse(Some("git://repo/a, git://repo/b/*, ,"));
        assert!(patterns.matches("git://repo/a"));
        assert!(!patterns.matches("git://repo/a/sub"));
        assert!(patterns.matches("git://repo/b/"));
        assert!(patterns.matches("git://repo/b/anything"));
        assert!(!patterns.matches("git://repo/c"));
    }

    #[test]
    fn empty_pattern_list_matches_nothing() {
        let patterns = RootPatterns::parse(None);
        assert!(patterns.is_empty());
        assert!(!patterns.matches("git://repo/a"));
    }

    #[test]
    fn partial_credentials_are_dropped() {
        assert_eq!(repo_credentials(Some("ci".into()), None), None);
        assert_eq!(repo_credentials(None, Some("tok".into())), None);
        let creds = repo_credentials(Some("ci".into()), Some("tok".into())).expect("both set");
        assert_eq!(creds.user, "ci");
        assert_eq!(format!("{creds:?}").contains("tok"), false);
    }
}
