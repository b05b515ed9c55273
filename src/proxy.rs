use reqwest::{Client, Proxy, Url};
use std::env;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

pub const HTTPS_PROXY_KEY: &str = "HTTPS_PROXY";
pub const HTTP_PROXY_KEY: &str = "HTTP_PROXY";
pub const NO_PROXY_KEY: &str = "NO_PROXY";

const PLATFORM_HTTPS_PROXY_KEY: &str = "https_proxy";
const PLATFORM_HTTP_PROXY_KEY: &str = "http_proxy";
const PLATFORM_NO_PROXY_KEY: &str = "no_proxy";

/// Snapshot of the three proxy variables. Absent values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyEnv {
    pub https_proxy: String,
    pub http_proxy: String,
    pub no_proxy: String,
}

impl ProxyEnv {
    /// Read `HTTPS_PROXY`, `HTTP_PROXY` and `NO_PROXY` from the process environment.
    pub fn from_process() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_keys(&lookup, HTTPS_PROXY_KEY, HTTP_PROXY_KEY, NO_PROXY_KEY)
    }

    /// Build a snapshot from explicit key/value pairs. Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut snapshot = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                HTTPS_PROXY_KEY => snapshot.https_proxy = value.into(),
                HTTP_PROXY_KEY => snapshot.http_proxy = value.into(),
                NO_PROXY_KEY => snapshot.no_proxy = value.into(),
                _ => {}
            }
        }
        snapshot
    }

    fn from_keys<F>(lookup: &F, https_key: &str, http_key: &str, no_proxy_key: &str) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            https_proxy: lookup(https_key).unwrap_or_default(),
            http_proxy: lookup(http_key).unwrap_or_default(),
            no_proxy: lookup(no_proxy_key).unwrap_or_default(),
        }
    }

    /// The proxy URL candidate, `HTTPS_PROXY` first. Empty when neither is set.
    pub fn chosen_proxy(&self) -> &str {
        if !self.https_proxy.is_empty() {
            &self.https_proxy
        } else {
            &self.http_proxy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyDecision {
    /// Route the request through this proxy.
    Proxy(Url),
    /// Connect directly.
    Direct,
    /// No usable proxy configured; let the platform decide.
    PlatformDefault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub primary_proxy: Option<Url>,
    pub bypass_list: Vec<String>,
}

impl ProxyConfig {
    pub fn from_env(env: &ProxyEnv) -> Self {
        Self {
            primary_proxy: parse_primary_proxy(env.chosen_proxy()),
            bypass_list: parse_no_proxy(&env.no_proxy),
        }
    }

    pub fn decide(&self, host: &str) -> ProxyDecision {
        let Some(proxy) = &self.primary_proxy else {
            return ProxyDecision::PlatformDefault;
        };

        if self.bypasses(host) {
            ProxyDecision::Direct
        } else {
            ProxyDecision::Proxy(proxy.clone())
        }
    }

    /// First matching pattern wins. `*.example.com` matches subdomains only.
    pub fn bypasses(&self, host: &str) -> bool {
        self.bypass_list.iter().any(|pattern| {
            if pattern == "*" || pattern == host {
                return true;
            }
            pattern.starts_with("*.") && host.ends_with(&pattern[1..])
        })
    }
}

pub fn resolve(env: &ProxyEnv, host: &str) -> ProxyDecision {
    let decision = ProxyConfig::from_env(env).decide(host);
    tracing::trace!(host, ?decision, "resolved proxy");
    decision
}

/// Split a `NO_PROXY` value on commas. Entries are kept verbatim.
pub fn parse_no_proxy(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(',').map(str::to_string).collect()
}

fn parse_primary_proxy(value: &str) -> Option<Url> {
    if value.is_empty() {
        return None;
    }

    match Url::parse(value) {
        Ok(url) => Some(url),
        Err(err) => {
            tracing::warn!(proxy = value, error = %err, "Error parsing proxy URL");
            None
        }
    }
}

/// Fallback used when the resolver has no proxy of its own to offer.
pub trait PlatformProxy: Send + Sync {
    fn default_proxy_for(&self, host: &str) -> Option<Url>;
}

/// Honors the lowercase `https_proxy`, `http_proxy` and `no_proxy` convention.
/// Loopback hosts always connect directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvPlatformProxy;

impl PlatformProxy for EnvPlatformProxy {
    fn default_proxy_for(&self, host: &str) -> Option<Url> {
        if is_loopback(host) {
            return None;
        }

        let env = ProxyEnv::from_keys(
            &|key: &str| env::var(key).ok(),
            PLATFORM_HTTPS_PROXY_KEY,
            PLATFORM_HTTP_PROXY_KEY,
            PLATFORM_NO_PROXY_KEY,
        );
        match ProxyConfig::from_env(&env).decide(host) {
            ProxyDecision::Proxy(url) => Some(url),
            ProxyDecision::Direct | ProxyDecision::PlatformDefault => None,
        }
    }
}

fn is_loopback(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlatformProxy;

impl PlatformProxy for NoPlatformProxy {
    fn default_proxy_for(&self, _host: &str) -> Option<Url> {
        None
    }
}

/// Hostname of `url` with IPv6 brackets removed.
pub fn target_host(url: &Url) -> Option<&str> {
    url.host_str()
        .map(|host| host.trim_start_matches('[').trim_end_matches(']'))
}

/// The proxy a request to `url` should use, or `None` to connect directly.
pub fn proxy_for_url(env: &ProxyEnv, platform: &dyn PlatformProxy, url: &Url) -> Option<Url> {
    let host = target_host(url)?;
    match resolve(env, host) {
        ProxyDecision::Proxy(proxy) => Some(proxy),
        ProxyDecision::Direct => None,
        ProxyDecision::PlatformDefault => platform.default_proxy_for(host),
    }
}

/// Build an outbound client. The environment is re-read for every request it sends.
pub fn build_http_client(
    platform: Arc<dyn PlatformProxy>,
    timeout: Duration,
) -> reqwest::Result<Client> {
    let proxy = Proxy::custom(move |url| {
        proxy_for_url(&ProxyEnv::from_process(), platform.as_ref(), url)
    });

    Client::builder().proxy(proxy).timeout(timeout).build()
}
