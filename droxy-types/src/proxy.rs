//! Proxy settings resolved for the current network.

use indexmap::IndexMap;

pub const HTTP_PROXY: &str = "http_proxy";
pub const HTTPS_PROXY: &str = "https_proxy";

/// Mapping from proxy key (`http_proxy`, `https_proxy`, `no_proxy`, ...) to its value.
///
/// Keys are stored lower-case. Upper-case variants are derived on demand by
/// [`ProxySettings::env_vars`] and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    entries: IndexMap<String, String>,
}

impl ProxySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Environment variables for a child process: every key in its lower-case
    /// form followed by its upper-case form.
    pub fn env_vars(&self) -> Vec<(String, String)> {
        let mut vars = Vec::with_capacity(self.entries.len() * 2);
        for (key, value) in &self.entries {
            vars.push((key.clone(), value.clone()));
            let upper = key.to_ascii_uppercase();
            if upper != *key {
                vars.push((upper, value.clone()));
            }
        }
        vars
    }
}

impl<K, V> FromIterator<(K, V)> for ProxySettings
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
            .collect();
        Self { entries }
    }
}
