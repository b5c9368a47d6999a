//! Command dispatch.
//!
//! Routes `droxy <command> [args...]` to a builtin when one is registered
//! under `<command>`, and to the external command fallback otherwise.

use crate::config::ConfigStore;
use crate::external;
use crate::ssid::SsidProbe;
use droxy_builtin::BuiltinRegistry;
use droxy_types::ProxySettings;
use tracing::debug;

/// Handler for commands that are not builtins.
pub type ExternalCommand = fn(cmd: &str, args: Vec<String>, proxies: &ProxySettings) -> i32;

pub struct Dispatcher<P: SsidProbe> {
    registry: BuiltinRegistry,
    store: ConfigStore,
    probe: P,
    external: ExternalCommand,
}

impl<P: SsidProbe> Dispatcher<P> {
    pub fn new(registry: BuiltinRegistry, store: ConfigStore, probe: P) -> Self {
        Self {
            registry,
            store,
            probe,
            external: external::execute,
        }
    }

    /// Replace the fallback used for unregistered commands.
    pub fn with_external(mut self, external: ExternalCommand) -> Self {
        self.external = external;
        self
    }

    /// Proxy settings for the network the machine is on right now.
    pub fn resolve_proxies(&self) -> ProxySettings {
        let ssid = self.probe.current_ssid();
        let proxies = self.store.lookup(ssid.as_deref());
        debug!("ssid {:?} -> {} proxy settings", ssid, proxies.len());
        proxies
    }

    /// Run `cmd` with `args` and return its status code.
    pub fn dispatch(&self, cmd: &str, args: Vec<String>) -> i32 {
        let proxies = self.resolve_proxies();

        if let Some(handler) = self.registry.get(cmd) {
            debug!("Dispatching builtin command: {} {:?}", cmd, args);
            handler(args, &proxies)
        } else {
            (self.external)(cmd, args, &proxies)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::path::Path;

    thread_local! {
        static CALLS: RefCell<Vec<(String, Vec<String>, ProxySettings)>> = const { RefCell::new(Vec::new()) };
    }

    fn record(kind: &str, args: Vec<String>, proxies: &ProxySettings) {
        CALLS.with(|c| c.borrow_mut().push((kind.to_string(), args, proxies.clone())));
    }

    fn take_calls() -> Vec<(String, Vec<String>, ProxySettings)> {
        CALLS.with(|c| c.borrow_mut().drain(..).collect())
    }

    fn builtin(args: Vec<String>, proxies: &ProxySettings) -> i32 {
        record("builtin", args, proxies);
        3
    }

    fn fallback(cmd: &str, args: Vec<String>, proxies: &ProxySettings) -> i32 {
        record(&format!("external:{cmd}"), args, proxies);
        9
    }

    struct FixedProbe {
        ssid: Option<String>,
        calls: Cell<usize>,
    }

    impl FixedProbe {
        fn new(ssid: Option<&str>) -> Self {
            Self {
                ssid: ssid.map(str::to_string),
                calls: Cell::new(0),
            }
        }
    }

    impl SsidProbe for FixedProbe {
        fn current_ssid(&self) -> Option<String> {
            self.calls.set(self.calls.get() + 1);
            self.ssid.clone()
        }
    }

    fn dispatcher(ssid: Option<&str>) -> Dispatcher<FixedProbe> {
        let store = ConfigStore::parse(
            Path::new("droxy.ini"),
            "[HomeWifi]\nhttp_proxy = proxy.example.com\n",
        )
        .unwrap();
        let mut registry = BuiltinRegistry::empty();
        registry.register("dummy-cmd", builtin);
        Dispatcher::new(registry, store, FixedProbe::new(ssid)).with_external(fallback)
    }

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn run(d: &Dispatcher<FixedProbe>, words: &[&str]) -> i32 {
        d.dispatch(words[0], argv(&words[1..]))
    }

    #[test]
    fn registered_command_uses_builtin() {
        take_calls();
        let d = dispatcher(Some("HomeWifi"));
        assert_eq!(run(&d, &["dummy-cmd", "-v", "x"]), 3);

        let calls = take_calls();
        assert_eq!(calls.len(), 1);
        let (kind, args, proxies) = &calls[0];
        assert_eq!(kind, "builtin");
        assert_eq!(args, &argv(&["-v", "x"]));
        assert_eq!(proxies.get("http_proxy"), Some("proxy.example.com"));
    }

    #[test]
    fn unregistered_command_uses_external() {
        take_calls();
        let d = dispatcher(Some("HomeWifi"));
        assert_eq!(run(&d, &["curl", "example.com"]), 9);

        let calls = take_calls();
        assert_eq!(calls.len(), 1);
        let (kind, args, proxies) = &calls[0];
        assert_eq!(kind, "external:curl");
        assert_eq!(args, &argv(&["example.com"]));
        assert_eq!(proxies.get("http_proxy"), Some("proxy.example.com"));
    }

    #[test]
    fn lookup_is_exact() {
        take_calls();
        let d = dispatcher(None);
        run(&d, &["Dummy-Cmd"]);
        assert_eq!(take_calls()[0].0, "external:Dummy-Cmd");
    }

    #[test]
    fn absent_ssid_dispatches_with_empty_proxies() {
        take_calls();
        let d = dispatcher(None);
        assert_eq!(run(&d, &["somecmd"]), 9);
        assert!(take_calls()[0].2.is_empty());
    }

    #[test]
    fn unknown_ssid_dispatches_with_empty_proxies() {
        take_calls();
        let d = dispatcher(Some("CoffeeShop"));
        run(&d, &["dummy-cmd"]);
        assert!(take_calls()[0].2.is_empty());
    }

    #[test]
    fn probe_runs_once_per_dispatch() {
        take_calls();
        let d = dispatcher(Some("HomeWifi"));
        run(&d, &["dummy-cmd"]);
        run(&d, &["curl"]);
        assert_eq!(d.probe.calls.get(), 2);
    }
}
