//! Inputs to base-URL resolution.

use url::Url;

/// Backend base URL captured from the build environment, if any.
///
/// Set `FASHIONBRAIN_API_BASE` when compiling to bake a deployment's backend
/// into the binary.
pub const BUILD_BASE_URL: Option<&str> = option_env!("FASHIONBRAIN_API_BASE");

/// Where the frontend is being served from, as a browser would report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    /// Scheme with its trailing colon, e.g. `"https:"`.
    protocol: String,
    hostname: String,
}

impl PageLocation {
    /// Build a location from a protocol and hostname.
    ///
    /// The protocol may be given with or without its trailing colon; an
    /// empty protocol is treated as `http:`. Both parts are lowercased, as
    /// hostnames are case-insensitive.
    pub fn new<P: AsRef<str>, H: Into<String>>(protocol: P, hostname: H) -> Self {
        let protocol = protocol.as_ref().trim().trim_end_matches(':');
        let protocol = if protocol.is_empty() {
            "http:".to_string()
        } else {
            format!("{}:", protocol.to_ascii_lowercase())
        };

        Self {
            protocol,
            hostname: hostname.into().trim().to_ascii_lowercase(),
        }
    }

    /// Parse a full page URL such as `https://shop.example.app/feed`.
    ///
    /// URLs without a host (e.g. `file:` URLs) yield an empty hostname.
    pub fn parse(page_url: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(page_url.trim())?;
        Ok(Self::new(url.scheme(), url.host_str().unwrap_or_default()))
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

/// Everything resolution looks at, captured once per session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    /// Explicitly configured backend, highest priority.
    pub override_url: Option<String>,

    /// Backend injected at build time.
    pub build_base_url: Option<String>,

    /// `None` when not running behind a page at all.
    pub location: Option<PageLocation>,
}

impl EnvironmentSnapshot {
    /// Snapshot the current environment, taking the build-time value from
    /// [`BUILD_BASE_URL`].
    pub fn capture(override_url: Option<String>, location: Option<PageLocation>) -> Self {
        Self {
            override_url,
            build_base_url: BUILD_BASE_URL.map(str::to_string),
            location,
        }
    }

    pub fn with_override<S: Into<String>>(mut self, url: S) -> Self {
        self.override_url = Some(url.into());
        self
    }

    pub fn with_build_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.build_base_url = Some(url.into());
        self
    }

    pub fn with_location(mut self, location: PageLocation) -> Self {
        self.location = Some(location);
        self
    }
}
