//! Where requests go: scheme, host and port of the LoginTC admin API.

use std::fmt;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheme, host and port every request path is resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
        }
    }

    /// Value for the `Host` header. The port is included unless it is the
    /// scheme's default.
    pub fn host_header(&self) -> String {
        if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Absolute URL for `path` with an optional raw query string.
    ///
    /// Paths are not validated beyond what URL syntax requires; characters
    /// that are not allowed in a path are percent-encoded.
    pub fn url(&self, path: &str, query: Option<&str>) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!("{}://{}:{}", self.scheme, self.host, self.port))?;
        url.set_path(path);
        url.set_query(query);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_default_port_is_omitted_from_host_header() {
        let endpoint = Endpoint::new(Scheme::Https, "example.com", 443);
        assert_eq!(endpoint.host_header(), "example.com");
    }

    #[test]
    fn https_custom_port_is_kept_in_host_header() {
        let endpoint = Endpoint::new(Scheme::Https, "example.com", 8443);
        assert_eq!(endpoint.host_header(), "example.com:8443");
    }

    #[test]
    fn http_ports_follow_the_same_rule() {
        assert_eq!(Endpoint::new(Scheme::Http, "example.com", 80).host_header(), "example.com");
        assert_eq!(
            Endpoint::new(Scheme::Http, "example.com", 443).host_header(),
            "example.com:443"
        );
        assert_eq!(
            Endpoint::new(Scheme::Https, "example.com", 80).host_header(),
            "example.com:80"
        );
    }

    #[test]
    fn url_joins_path_and_query() {
        let endpoint = Endpoint::new(Scheme::Http, "10.0.10.20", 3333);
        let url = endpoint.url("/api/domains/abc/users", Some("page=2")).unwrap();
        assert_eq!(url.as_str(), "http://10.0.10.20:3333/api/domains/abc/users?page=2");
    }

    #[test]
    fn url_drops_default_port() {
        let endpoint = Endpoint::new(Scheme::Https, "cloud.logintc.com", 443);
        let url = endpoint.url("/api/ping", None).unwrap();
        assert_eq!(url.as_str(), "https://cloud.logintc.com/api/ping");
    }

    #[test]
    fn url_percent_encodes_path() {
        let endpoint = Endpoint::new(Scheme::Https, "cloud.logintc.com", 443);
        let url = endpoint.url("/api/users/a b", None).unwrap();
        assert_eq!(url.path(), "/api/users/a%20b");
    }

    #[test]
    fn malformed_host_is_rejected() {
        let endpoint = Endpoint::new(Scheme::Https, "bad host", 443);
        assert!(endpoint.url("/api/ping", None).is_err());
    }
}
