//! Per-network proxy configuration.
//!
//! The configuration is an INI file with one section per SSID:
//!
//! ```ini
//! [HomeWifi]
//! http_proxy = http://proxy.example.com:8080
//! https_proxy = http://proxy.example.com:8080
//! ```
//!
//! Keys in a `[DEFAULT]` section are inherited by every other section.
//! Only the first file found in [`ConfigStore::search_paths`] is read.

use droxy_types::{APP_NAME, DroxyError, DroxyResult, ProxySettings};
use indexmap::IndexMap;
use ini::{Ini, ParseOption};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "droxy.ini";

const DEFAULT_SECTION: &str = "DEFAULT";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    networks: IndexMap<String, ProxySettings>,
}

impl ConfigStore {
    /// Candidate config files, highest precedence first: next to the
    /// executable, then `$XDG_CONFIG_HOME/droxy.ini`, then
    /// `$XDG_CONFIG_HOME/droxy/droxy.ini`.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(3);
        if let Ok(exe) = std::env::current_exe()
            && let Some(dir) = exe.parent()
        {
            paths.push(dir.join(CONFIG_FILE));
        }
        let config_home = config_home();
        paths.push(config_home.join(CONFIG_FILE));
        paths.push(config_home.join(APP_NAME).join(CONFIG_FILE));
        paths
    }

    /// Load the first existing file from [`ConfigStore::search_paths`].
    pub fn load() -> DroxyResult<Self> {
        Self::load_from(&Self::search_paths())
    }

    /// Load the first existing file from `candidates`.
    pub fn load_from(candidates: &[PathBuf]) -> DroxyResult<Self> {
        for path in candidates {
            if path.exists() {
                debug!("loading config {}", path.display());
                let text = std::fs::read_to_string(path).map_err(|e| DroxyError::ConfigParse {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                return Self::parse(path, &text);
            }
            debug!("no config at {}", path.display());
        }
        Err(DroxyError::ConfigNotFound {
            searched: candidates.to_vec(),
        })
    }

    /// Parse INI `text`; `path` is only recorded for diagnostics.
    pub fn parse(path: &Path, text: &str) -> DroxyResult<Self> {
        let option = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..Default::default()
        };
        let ini = Ini::load_from_str_opt(text, option).map_err(|e| DroxyError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let defaults: Vec<(&str, &str)> = ini
            .section(Some(DEFAULT_SECTION))
            .map(|props| props.iter().collect())
            .unwrap_or_default();

        let mut networks = IndexMap::new();
        for (section, props) in ini.iter() {
            let Some(ssid) = section else {
                if !props.is_empty() {
                    debug!("ignoring {} keys outside any section", props.len());
                }
                continue;
            };
            let proxies: ProxySettings = defaults.iter().copied().chain(props.iter()).collect();
            networks.insert(ssid.to_string(), proxies);
        }

        Ok(Self {
            path: path.to_path_buf(),
            networks,
        })
    }

    /// Proxy settings for `ssid`. Unknown networks and an undetermined
    /// SSID (`None`) both yield empty settings.
    pub fn lookup(&self, ssid: Option<&str>) -> ProxySettings {
        let Some(ssid) = ssid else {
            return ProxySettings::new();
        };
        self.networks.get(ssid).cloned().unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured network names in file order.
    pub fn networks(&self) -> impl Iterator<Item = &str> {
        self.networks.keys().map(String::as_str)
    }
}

/// `$XDG_CONFIG_HOME`, falling back to `$HOME/.config`, or `.config` when
/// even the home directory is unknown.
fn config_home() -> PathBuf {
    match xdg::BaseDirectories::new() {
        Ok(dirs) => dirs.get_config_home(),
        Err(err) => {
            debug!("failed get xdg directory: {err}");
            PathBuf::from(".config")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
[HomeWifi]
http_proxy = proxy.example.com

[Office]
HTTP_PROXY = http://office-proxy:3128
https_proxy = http://office-proxy:3128
no_proxy = localhost,127.0.0.1
";

    fn sample() -> ConfigStore {
        ConfigStore::parse(Path::new("droxy.ini"), SAMPLE).unwrap()
    }

    #[test]
    fn lookup_known_network() {
        let store = sample();
        let proxies = store.lookup(Some("HomeWifi"));
        assert_eq!(proxies.get("http_proxy"), Some("proxy.example.com"));
        assert_eq!(proxies.len(), 1);
    }

    #[test]
    fn keys_are_lowercased() {
        let store = sample();
        let proxies = store.lookup(Some("Office"));
        let keys: Vec<&str> = proxies.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["http_proxy", "https_proxy", "no_proxy"]);
    }

    #[test]
    fn lookup_unknown_network_is_empty() {
        let store = sample();
        assert!(store.lookup(Some("CoffeeShop")).is_empty());
        assert!(store.lookup(Some("")).is_empty());
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let store = sample();
        assert!(store.lookup(Some("homewifi")).is_empty());
    }

    #[test]
    fn lookup_absent_ssid_is_empty() {
        let store = sample();
        assert!(store.lookup(None).is_empty());
    }

    #[test]
    fn networks_in_file_order() {
        let store = sample();
        assert_eq!(store.networks().collect::<Vec<_>>(), vec!["HomeWifi", "Office"]);
    }

    #[test]
    fn default_section_is_inherited() {
        let text = "\
[DEFAULT]
no_proxy = localhost
http_proxy = http://fallback:8080

[Lab]
http_proxy = http://lab:8080
";
        let store = ConfigStore::parse(Path::new("droxy.ini"), text).unwrap();
        let lab = store.lookup(Some("Lab"));
        assert_eq!(lab.get("http_proxy"), Some("http://lab:8080"));
        assert_eq!(lab.get("no_proxy"), Some("localhost"));
        assert!(store.lookup(Some("Elsewhere")).is_empty());
    }

    #[test]
    fn backslashes_are_kept() {
        let text = "[Corp]\nhttp_proxy = http://DOMAIN\\user:pw@proxy:8080\n";
        let store = ConfigStore::parse(Path::new("droxy.ini"), text).unwrap();
        assert_eq!(
            store.lookup(Some("Corp")).get("http_proxy"),
            Some("http://DOMAIN\\user:pw@proxy:8080")
        );
    }

    #[test]
    fn first_existing_candidate_wins() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.ini");
        let first = dir.path().join("first.ini");
        let second = dir.path().join("second.ini");
        std::fs::write(&first, "[A]\nhttp_proxy = first\n").unwrap();
        std::fs::write(&second, "[A]\nhttp_proxy = second\n[B]\nhttp_proxy = b\n").unwrap();

        let store = ConfigStore::load_from(&[missing, first.clone(), second]).unwrap();
        assert_eq!(store.path(), first.as_path());
        assert_eq!(store.lookup(Some("A")).get("http_proxy"), Some("first"));
        // files are never merged
        assert!(store.lookup(Some("B")).is_empty());
    }

    #[test]
    fn not_found_reports_all_candidates() {
        let dir = TempDir::new().unwrap();
        let candidates = vec![
            dir.path().join("a.ini"),
            dir.path().join("b.ini"),
            dir.path().join("droxy").join("c.ini"),
        ];
        match ConfigStore::load_from(&candidates) {
            Err(DroxyError::ConfigNotFound { searched }) => assert_eq!(searched, candidates),
            other => panic!("expected ConfigNotFound, got {other:?}"),
        }
    }

    #[test]
    fn search_paths_order() {
        let paths = ConfigStore::search_paths();
        assert_eq!(paths.len(), 3);
        assert!(paths[0].ends_with(CONFIG_FILE));
        assert!(paths[1].ends_with(CONFIG_FILE));
        assert!(paths[2].ends_with(Path::new(APP_NAME).join(CONFIG_FILE)));
        assert_eq!(paths[1].parent(), paths[2].parent().and_then(Path::parent));
    }
}
