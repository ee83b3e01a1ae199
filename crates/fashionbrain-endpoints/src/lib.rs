//! Backend base-URL resolution.
//!
//! [`EndpointResolver`] turns an [`EnvironmentSnapshot`] plus a hostname
//! mapping table into exactly one base URL. Sources are tried in order and
//! the first match wins:
//!
//! 1. explicit override
//! 2. hostname mapping table
//! 3. build-time `FASHIONBRAIN_API_BASE`
//! 4. `localhost` / `127.0.0.1` (or no hostname) → `http://localhost:8000`
//! 5. cloud-IDE hostnames → port-selector rewrite
//! 6. anything else → `<protocol>//<hostname>:8000`, with a one-time operator warning
//! 7. no page location at all → `http://localhost:8000`
//!
//! The returned URL never ends with `/`, and resolution never fails.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use fashionbrain_config::ApiConfig;
use regex::Regex;
use url::Url;

pub mod location;
pub mod notice;

pub use location::{EnvironmentSnapshot, PageLocation, BUILD_BASE_URL};
pub use notice::{NoticeSink, TracingNotice};

/// Base URL used when nothing better is known.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Port the backend listens on in development setups.
pub const BACKEND_PORT: u16 = 8000;

/// Hostname fragments identifying a cloud IDE preview domain.
const CLOUD_IDE_MARKERS: [&str; 3] = ["replit.dev", "repl.co", "replit.app"];

/// Which rule produced a resolved base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointSource {
    Override,
    HostnameMapping,
    BuildTime,
    Localhost,
    CloudIde,
    HostnameGuess,
    NoBrowserContext,
}

impl EndpointSource {
    /// Whether the URL came from configuration rather than a heuristic.
    pub fn is_configured(&self) -> bool {
        matches!(
            self,
            Self::Override | Self::HostnameMapping | Self::BuildTime
        )
    }
}

impl fmt::Display for EndpointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Override => "override",
            Self::HostnameMapping => "hostname-mapping",
            Self::BuildTime => "build-time",
            Self::Localhost => "localhost",
            Self::CloudIde => "cloud-ide",
            Self::HostnameGuess => "hostname-guess",
            Self::NoBrowserContext => "no-browser-context",
        };
        f.write_str(s)
    }
}

/// A resolved backend base URL and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    /// Origin without a trailing slash, e.g. `https://api.example.com`.
    pub base_url: String,
    pub source: EndpointSource,
}

impl ResolvedEndpoint {
    fn new<S: Into<String>>(base_url: S, source: EndpointSource) -> Self {
        Self {
            base_url: base_url.into(),
            source,
        }
    }

    fn fallback() -> Self {
        Self::new(DEFAULT_BASE_URL, EndpointSource::NoBrowserContext)
    }
}

/// Resolves, and then memoizes, the backend base URL for one session.
///
/// Build one per process (or per test) and share it by reference. The first
/// call to [`base_url`](Self::base_url) fixes the URL for the lifetime of the
/// resolver.
pub struct EndpointResolver {
    snapshot: EnvironmentSnapshot,
    hostname_mappings: BTreeMap<String, String>,
    notice: Arc<dyn NoticeSink>,

    /// Set once the hostname-guess warning has been shown.
    warned: AtomicBool,

    resolved: OnceLock<ResolvedEndpoint>,
}

impl EndpointResolver {
    /// Create a resolver over an explicit snapshot and mapping table.
    ///
    /// Mapping keys are matched case-insensitively.
    pub fn new(snapshot: EnvironmentSnapshot, hostname_mappings: BTreeMap<String, String>) -> Self {
        let hostname_mappings = hostname_mappings
            .into_iter()
            .map(|(host, url)| (host.trim().to_ascii_lowercase(), url))
            .collect();
        Self {
            snapshot,
            hostname_mappings,
            notice: Arc::new(TracingNotice),
            warned: AtomicBool::new(false),
            resolved: OnceLock::new(),
        }
    }

    /// Create a resolver from the `[api]` config section and the page the
    /// client is running behind, if any.
    pub fn from_config(api: &ApiConfig, location: Option<PageLocation>) -> Self {
        let snapshot = EnvironmentSnapshot::capture(api.base_url.clone(), location);
        Self::new(snapshot, api.hostname_mappings.clone())
    }

    /// Route operator warnings to a custom sink.
    pub fn with_notice(mut self, notice: Arc<dyn NoticeSink>) -> Self {
        self.notice = notice;
        self
    }

    pub fn snapshot(&self) -> &EnvironmentSnapshot {
        &self.snapshot
    }

    /// The session's endpoint, resolved on first use and fixed afterwards.
    pub fn endpoint(&self) -> &ResolvedEndpoint {
        self.resolved.get_or_init(|| {
            let endpoint = self.resolve();
            tracing::debug!(
                "resolved backend base URL {} (source: {})",
                endpoint.base_url,
                endpoint.source
            );
            endpoint
        })
    }

    /// Shorthand for `self.endpoint().base_url`.
    pub fn base_url(&self) -> &str {
        &self.endpoint().base_url
    }

    /// Run the resolution rules against the snapshot.
    ///
    /// Unlike [`endpoint`](Self::endpoint) this is not memoized, but the
    /// hostname-guess warning is still raised at most once per resolver.
    pub fn resolve(&self) -> ResolvedEndpoint {
        if let Some(url) = non_empty(self.snapshot.override_url.as_deref()) {
            return ResolvedEndpoint::new(strip_trailing_slash(url), EndpointSource::Override);
        }

        let location = self.snapshot.location.as_ref();

        if let Some(mapped) = location
            .and_then(|loc| self.hostname_mappings.get(loc.hostname()))
            .and_then(|url| non_empty(Some(url.as_str())))
        {
            return ResolvedEndpoint::new(
                strip_trailing_slash(mapped),
                EndpointSource::HostnameMapping,
            );
        }

        if let Some(url) = non_empty(self.snapshot.build_base_url.as_deref()) {
            return ResolvedEndpoint::new(strip_trailing_slash(url), EndpointSource::BuildTime);
        }

        match location {
            Some(loc) => self.guess_from_location(loc),
            None => ResolvedEndpoint::fallback(),
        }
    }

    fn guess_from_location(&self, loc: &PageLocation) -> ResolvedEndpoint {
        let hostname = loc.hostname();

        if hostname.is_empty() || hostname == "localhost" || hostname == "127.0.0.1" {
            return ResolvedEndpoint::new(DEFAULT_BASE_URL, EndpointSource::Localhost);
        }

        let candidate = if is_cloud_ide_host(hostname) {
            let base_host = port_selector().replace(hostname, "");
            ResolvedEndpoint::new(
                format!("{}//{}--{}", loc.protocol(), base_host, BACKEND_PORT),
                EndpointSource::CloudIde,
            )
        } else {
            ResolvedEndpoint::new(
                format!("{}//{}:{}", loc.protocol(), hostname, BACKEND_PORT),
                EndpointSource::HostnameGuess,
            )
        };

        // Location data that cannot form a URL is treated as no location.
        if let Err(err) = Url::parse(&candidate.base_url) {
            tracing::debug!(
                "ignoring unusable page location '{}//{}': {}",
                loc.protocol(),
                hostname,
                err
            );
            return ResolvedEndpoint::fallback();
        }

        if candidate.source == EndpointSource::HostnameGuess {
            self.warn_once(hostname, &candidate.base_url);
        }

        candidate
    }

    fn warn_once(&self, hostname: &str, guessed: &str) {
        if self.warned.swap(true, Ordering::SeqCst) {
            return;
        }

        self.notice.warn(&format!(
            "backend base URL is not configured for hostname '{}'; guessing {}, which is unlikely \
             to work in a real deployment. Set api.base_url, add an [api.hostname_mappings] entry, \
             or build with FASHIONBRAIN_API_BASE.",
            hostname, guessed
        ));
    }
}

impl fmt::Debug for EndpointResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointResolver")
            .field("snapshot", &self.snapshot)
            .field("hostname_mappings", &self.hostname_mappings)
            .field("resolved", &self.resolved.get())
            .finish()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn strip_trailing_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn is_cloud_ide_host(hostname: &str) -> bool {
    CLOUD_IDE_MARKERS
        .iter()
        .any(|marker| hostname.contains(marker))
}

/// Matches the `--<port>` token cloud IDEs embed in preview hostnames.
fn port_selector() -> &'static Regex {
    static PORT_SELECTOR: OnceLock<Regex> = OnceLock::new();
    PORT_SELECTOR.get_or_init(|| Regex::new(r"--\d+").expect("port selector pattern is valid"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingNotice {
        count: AtomicUsize,
        last: std::sync::Mutex<Option<String>>,
    }

    impl NoticeSink for CountingNotice {
        fn warn(&self, message: &str) {
            self.count.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(message.to_string());
        }
    }

    fn resolver(snapshot: EnvironmentSnapshot) -> EndpointResolver {
        EndpointResolver::new(snapshot, BTreeMap::new())
    }

    fn at(protocol: &str, hostname: &str) -> EnvironmentSnapshot {
        EnvironmentSnapshot::default().with_location(PageLocation::new(protocol, hostname))
    }

    #[test]
    fn override_wins_regardless_of_hostname() {
        for host in ["localhost", "shop.example.app", "x--3000.replit.dev", ""] {
            let r = resolver(
                at("https:", host)
                    .with_override("https://api.example.com/")
                    .with_build_base_url("https://build.example.com"),
            );
            let resolved = r.resolve();
            assert_eq!(resolved.base_url, "https://api.example.com");
            assert_eq!(resolved.source, EndpointSource::Override);
        }
    }

    #[test]
    fn override_without_location() {
        let r = resolver(EnvironmentSnapshot::default().with_override("http://10.0.0.5:9000//"));
        assert_eq!(r.base_url(), "http://10.0.0.5:9000");
    }

    #[test]
    fn blank_override_is_ignored() {
        let r = resolver(at("http:", "localhost").with_override("   "));
        assert_eq!(r.resolve().source, EndpointSource::Localhost);
    }

    #[test]
    fn hostname_mapping_beats_build_time_value() {
        let mut mappings = BTreeMap::new();
        mappings.insert(
            "shop.example.app".to_string(),
            "https://api.example.com/".to_string(),
        );
        let r = EndpointResolver::new(
            at("https:", "shop.example.app").with_build_base_url("https://build.example.com"),
            mappings,
        );
        let resolved = r.resolve();
        assert_eq!(resolved.base_url, "https://api.example.com");
        assert_eq!(resolved.source, EndpointSource::HostnameMapping);
    }

    #[test]
    fn hostname_mapping_ignores_case() {
        let mut mappings = BTreeMap::new();
        mappings.insert(
            "Shop.Example.App".to_string(),
            "https://api.example.com".to_string(),
        );
        for location in [
            PageLocation::new("https:", "SHOP.example.app"),
            PageLocation::parse("https://shop.EXAMPLE.app/feed").unwrap(),
        ] {
            let r = EndpointResolver::new(
                EnvironmentSnapshot::default().with_location(location),
                mappings.clone(),
            );
            assert_eq!(r.resolve().source, EndpointSource::HostnameMapping);
            assert_eq!(r.base_url(), "https://api.example.com");
        }
    }

    #[test]
    fn build_time_value_used_when_no_mapping() {
        let r = resolver(at("https:", "other.example.app").with_build_base_url("https://build.example.com/"));
        let resolved = r.resolve();
        assert_eq!(resolved.base_url, "https://build.example.com");
        assert_eq!(resolved.source, EndpointSource::BuildTime);
    }

    #[test]
    fn build_time_value_used_without_location() {
        let r = resolver(EnvironmentSnapshot::default().with_build_base_url("https://build.example.com"));
        assert_eq!(r.resolve().source, EndpointSource::BuildTime);
    }

    #[test]
    fn localhost_hosts_use_default() {
        for host in ["localhost", "127.0.0.1", ""] {
            let resolved = resolver(at("https:", host)).resolve();
            assert_eq!(resolved.base_url, "http://localhost:8000");
            assert_eq!(resolved.source, EndpointSource::Localhost);
        }
    }

    #[test]
    fn cloud_ide_host_is_rewritten() {
        let resolved = resolver(at("https:", "myapp--5173.alice.replit.dev")).resolve();
        assert_eq!(resolved.base_url, "https://myapp.alice.replit.dev--8000");
        assert_eq!(resolved.source, EndpointSource::CloudIde);
    }

    #[test]
    fn cloud_ide_host_without_port_token() {
        let resolved = resolver(at("https:", "myapp.alice.repl.co")).resolve();
        assert_eq!(resolved.base_url, "https://myapp.alice.repl.co--8000");
    }

    #[test]
    fn cloud_ide_does_not_warn() {
        let notice = Arc::new(CountingNotice::default());
        let r = resolver(at("https:", "myapp.replit.app")).with_notice(notice.clone());
        r.resolve();
        assert_eq!(notice.count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_host_guesses_port_and_warns_once() {
        let notice = Arc::new(CountingNotice::default());
        let r = resolver(at("https:", "shop.example.app")).with_notice(notice.clone());

        for _ in 0..5 {
            let resolved = r.resolve();
            assert_eq!(resolved.base_url, "https://shop.example.app:8000");
            assert_eq!(resolved.source, EndpointSource::HostnameGuess);
        }
        assert_eq!(r.base_url(), "https://shop.example.app:8000");

        assert_eq!(notice.count.load(Ordering::SeqCst), 1);
        let message = notice.last.lock().unwrap().clone().unwrap();
        assert!(message.contains("shop.example.app"));
    }

    #[test]
    fn fresh_resolver_warns_again() {
        let notice = Arc::new(CountingNotice::default());
        resolver(at("http:", "a.example")).with_notice(notice.clone()).resolve();
        resolver(at("http:", "a.example")).with_notice(notice.clone()).resolve();
        assert_eq!(notice.count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn no_location_uses_default() {
        let resolved = resolver(EnvironmentSnapshot::default()).resolve();
        assert_eq!(resolved.base_url, "http://localhost:8000");
        assert_eq!(resolved.source, EndpointSource::NoBrowserContext);
    }

    #[test]
    fn unusable_hostname_falls_back_to_default() {
        let notice = Arc::new(CountingNotice::default());
        let r = resolver(at("https:", "bad host name")).with_notice(notice.clone());
        let resolved = r.resolve();
        assert_eq!(resolved.base_url, DEFAULT_BASE_URL);
        assert_eq!(resolved.source, EndpointSource::NoBrowserContext);
        assert_eq!(notice.count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn base_url_is_memoized() {
        let r = resolver(at("http:", "localhost"));
        let first = r.base_url() as *const str;
        let second = r.base_url() as *const str;
        assert_eq!(first, second);
        assert!(!r.base_url().ends_with('/'));
    }

    #[test]
    fn from_config_uses_api_section() {
        let mut api = ApiConfig::default();
        api.hostname_mappings.insert(
            "shop.example.app".to_string(),
            "https://api.example.com".to_string(),
        );
        let r = EndpointResolver::from_config(
            &api,
            Some(PageLocation::new("https:", "shop.example.app")),
        );
        assert_eq!(r.base_url(), "https://api.example.com");
        assert_eq!(r.endpoint().source, EndpointSource::HostnameMapping);
    }

    #[test]
    fn source_classification() {
        assert!(EndpointSource::Override.is_configured());
        assert!(!EndpointSource::HostnameGuess.is_configured());
        assert_eq!(EndpointSource::CloudIde.to_string(), "cloud-ide");
    }
}
