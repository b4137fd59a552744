//! Endpoint description and URL path composition.
//!
//! [`append_path`] is the single place where path fragments are joined. Every
//! setter on [`Endpoint`] routes through it, so the composed path never carries
//! a doubled `/` and never misses one at a fragment boundary.

use std::net::Ipv6Addr;
use url::Url;

use crate::errors::{RestError, RestResult};

const ONE_SLASH: char = '/';

/// Appends `addition` to `path`, normalizing the separator at the boundary.
///
/// Empty and `"/"` additions leave `path` untouched. An empty or `"/"` path is
/// reset so the result always starts with exactly one `/`.
pub fn append_path(path: &mut String, addition: &str) {
    if addition.is_empty() || addition == "/" {
        return;
    }

    let addition_has_slash = addition.starts_with(ONE_SLASH);

    if path.is_empty() || path == "/" {
        path.clear();
        if !addition_has_slash {
            path.push(ONE_SLASH);
        }
    } else {
        let path_has_slash = path.ends_with(ONE_SLASH);
        if path_has_slash && addition_has_slash {
            path.pop();
        } else if !path_has_slash && !addition_has_slash {
            path.push(ONE_SLASH);
        }
    }

    path.push_str(addition);
}

/// Returns `base` joined with `addition` as a new string.
pub fn join_path(base: &str, addition: &str) -> String {
    let mut path = base.to_string();
    append_path(&mut path, addition);
    path
}

/// Scheme, authority and path parts of a REST target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    scheme: String,
    host: String,
    port: Option<u16>,
    base_path: String,
    path: String,
    query: Vec<(String, String)>,
    fragment: String,
}

impl Endpoint {
    /// Creates an endpoint from explicit parts.
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        port: Option<u16>,
        base_path: &str,
    ) -> Self {
        let mut endpoint = Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
            ..Default::default()
        };
        endpoint.set_base_path(base_path);
        endpoint
    }

    /// Creates an endpoint for `host:port`, using `https` for port 443 and
    /// `http` otherwise.
    pub fn for_host(host: impl Into<String>, port: u16) -> Self {
        Self::new(scheme_for_port(Some(port)), host, Some(port), "")
    }

    /// Returns the scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port, `None` meaning the scheme default.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Returns the normalized base path.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns the normalized resource path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the query pairs in insertion order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Returns the fragment.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Sets the scheme.
    pub fn set_scheme(&mut self, scheme: impl Into<String>) {
        self.scheme = scheme.into();
    }

    /// Sets the host.
    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = host.into();
    }

    /// Sets the port.
    pub fn set_port(&mut self, port: Option<u16>) {
        self.port = port;
    }

    /// Adopts scheme, host and port of `url`; its path becomes the base path.
    ///
    /// The resource path, query and fragment configured on this endpoint are
    /// kept.
    pub fn set_url(&mut self, url: &Url) {
        self.scheme = url.scheme().to_string();
        self.host = url.host_str().unwrap_or_default().to_string();
        self.port = url.port();
        self.base_path = url.path().to_string();
    }

    /// Replaces the base path.
    pub fn set_base_path(&mut self, base_path: &str) {
        self.base_path.clear();
        append_path(&mut self.base_path, base_path);
    }

    /// Replaces the base path with `segments` joined by `/`.
    pub fn set_base_path_segments<S: AsRef<str>>(&mut self, segments: &[S]) {
        self.set_base_path(&join_segments(segments));
    }

    /// Clears the base path.
    pub fn clear_base_path(&mut self) {
        self.base_path.clear();
    }

    /// Replaces the resource path.
    pub fn set_path(&mut self, path: &str) {
        self.path.clear();
        append_path(&mut self.path, path);
    }

    /// Replaces the resource path with `segments` joined by `/`.
    pub fn set_path_segments<S: AsRef<str>>(&mut self, segments: &[S]) {
        self.set_path(&join_segments(segments));
    }

    /// Appends to the resource path.
    pub fn append_path(&mut self, path: &str) {
        append_path(&mut self.path, path);
    }

    /// Appends `segments` joined by `/` to the resource path.
    pub fn append_path_segments<S: AsRef<str>>(&mut self, segments: &[S]) {
        append_path(&mut self.path, &join_segments(segments));
    }

    /// Clears the resource path.
    pub fn clear_path(&mut self) {
        self.path.clear();
    }

    /// Replaces the query pairs.
    pub fn set_query<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
    }

    /// Sets the fragment; an empty string removes it.
    pub fn set_fragment(&mut self, fragment: impl Into<String>) {
        self.fragment = fragment.into();
    }

    /// Returns base path and resource path joined.
    pub fn full_path(&self) -> String {
        join_path(&self.base_path, &self.path)
    }

    /// Composes the target URL.
    pub fn url(&self) -> RestResult<Url> {
        if self.scheme.is_empty() {
            return Err(RestError::configuration("scheme must not be empty"));
        }
        if self.host.is_empty() {
            return Err(RestError::configuration("host must not be empty"));
        }

        let mut url = Url::parse(&format!("{}://{}", self.scheme, authority_host(&self.host)))?;
        url.set_port(self.port)
            .map_err(|_| RestError::configuration(format!("scheme {} does not take a port", self.scheme)))?;
        url.set_path(&self.full_path());

        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        if !self.fragment.is_empty() {
            url.set_fragment(Some(&self.fragment));
        }

        Ok(url)
    }
}

/// Default scheme for a port: `https` on 443, `http` otherwise.
pub(crate) fn scheme_for_port(port: Option<u16>) -> &'static str {
    if port == Some(443) {
        "https"
    } else {
        "http"
    }
}

fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("/")
}

// Bare IPv6 literals need brackets inside an authority.
fn authority_host(host: &str) -> String {
    if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}
