//! Input resolution for address bar
//!
//! 1. Valid URL → navigate
//! 2. Anything else → search

use std::net::IpAddr;
use url::{form_urlencoded, Url};

use tandem_tabs::HOMEPAGE_SENTINEL;

/// Result of resolving address bar input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResolution {
    /// Navigate to a URL
    Navigate(String),
    /// Perform a search
    Search(String),
}

impl InputResolution {
    pub fn url(&self) -> &str {
        match self {
            InputResolution::Navigate(url) | InputResolution::Search(url) => url,
        }
    }

    pub fn into_url(self) -> String {
        match self {
            InputResolution::Navigate(url) | InputResolution::Search(url) => url,
        }
    }
}

pub struct InputResolver {
    /// Search engine URL template (%s replaced with query)
    search_template: String,
}

impl InputResolver {
    pub fn new() -> Self {
        Self {
            search_template: "https://duckduckgo.com/?q=%s".to_string(),
        }
    }

    pub fn with_search_engine(template: String) -> Self {
        Self {
            search_template: template,
        }
    }

    pub fn search_template(&self) -> &str {
        &self.search_template
    }

    /// Resolve user input into an action
    pub fn resolve(&self, input: &str) -> InputResolution {
        let input = input.trim();

        if input.is_empty() {
            return InputResolution::Navigate(HOMEPAGE_SENTINEL.to_string());
        }

        if let Some(url) = self.try_parse_url(input) {
            return InputResolution::Navigate(url);
        }

        InputResolution::Search(self.build_search_url(input))
    }

    /// Try to parse input as a valid URL
    fn try_parse_url(&self, input: &str) -> Option<String> {
        // Direct URL with scheme
        if (input.starts_with("http://") || input.starts_with("https://"))
            && Url::parse(input).is_ok()
        {
            return Some(input.to_string());
        }

        // Special protocols
        if input.starts_with("file://")
            || input.starts_with("about:")
            || input.starts_with("data:")
            || input == HOMEPAGE_SENTINEL
        {
            return Some(input.to_string());
        }

        // URL without scheme - check if it looks like a domain
        if self.looks_like_url(input) {
            let (host, rest) = split_host_and_rest(input);
            let with_https = if is_ipv6_host(host) && !host.starts_with('[') {
                format!("https://[{}]{}", host, rest)
            } else {
                format!("https://{}{}", host, rest)
            };

            if Url::parse(&with_https).is_ok() {
                return Some(with_https);
            }
        }

        None
    }

    /// Heuristic check if input looks like a URL
    fn looks_like_url(&self, input: &str) -> bool {
        if input.contains(' ') {
            return false;
        }

        // localhost or IP address
        if input.starts_with("localhost") || is_ip_address(input) {
            return true;
        }

        // Domain-like pattern
        let (host, _) = split_host_and_rest(input);
        let host = host.split(':').next().unwrap_or(host);
        match host.rsplit_once('.') {
            Some((name, tld)) => {
                !name.is_empty()
                    && (2..=6).contains(&tld.len())
                    && tld.chars().all(|c| c.is_alphabetic())
            }
            None => false,
        }
    }

    /// Build search URL from query
    fn build_search_url(&self, query: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
        self.search_template.replace("%s", &encoded)
    }
}

impl Default for InputResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn is_ip_address(input: &str) -> bool {
    let (host, _) = split_host_and_rest(input);
    parse_ip_host(host).is_some()
}

fn is_ipv6_host(host: &str) -> bool {
    matches!(parse_ip_host(host), Some(IpAddr::V6(_)))
}

fn parse_ip_host(host: &str) -> Option<IpAddr> {
    let host = host.trim();
    if host.is_empty() {
        return None;
    }

    let host = if host.starts_with('[') {
        host.strip_prefix('[')
            .and_then(|s| s.split(']').next())
            .unwrap_or(host)
    } else if host.matches(':').count() == 1 {
        host.split(':').next().unwrap_or(host)
    } else {
        host
    };

    host.parse().ok()
}

fn split_host_and_rest(input: &str) -> (&str, &str) {
    let cut = input.find(&['/', '?', '#'][..]).unwrap_or(input.len());
    input.split_at(cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let resolver = InputResolver::new();

        assert_eq!(
            resolver.resolve("https://example.com"),
            InputResolution::Navigate("https://example.com".to_string())
        );
        assert_eq!(
            resolver.resolve("example.com/docs"),
            InputResolution::Navigate("https://example.com/docs".to_string())
        );
        assert_eq!(
            resolver.resolve("localhost:8080"),
            InputResolution::Navigate("https://localhost:8080".to_string())
        );
        assert_eq!(
            resolver.resolve("file:///tmp/a.txt"),
            InputResolution::Navigate("file:///tmp/a.txt".to_string())
        );
    }

    #[test]
    fn test_resolve_search() {
        let resolver = InputResolver::new();

        match resolver.resolve("rust programming") {
            InputResolution::Search(url) => {
                assert!(url.starts_with("https://duckduckgo.com/?q="));
                assert!(url.ends_with("rust+programming"));
            }
            other => panic!("Expected Search, got {:?}", other),
        }

        let custom = InputResolver::with_search_engine("https://search.example/?q=%s".to_string());
        assert_eq!(
            custom.resolve("a&b").into_url(),
            "https://search.example/?q=a%26b"
        );
    }

    #[test]
    fn test_empty_input_goes_home() {
        let resolver = InputResolver::new();
        assert_eq!(resolver.resolve("   ").url(), HOMEPAGE_SENTINEL);
    }

    #[test]
    fn test_resolve_ipv6() {
        let resolver = InputResolver::new();

        assert_eq!(resolver.resolve("::1").into_url(), "https://[::1]");
        assert_eq!(resolver.resolve("[::1]:8080").into_url(), "https://[::1]:8080");
        assert_eq!(
            resolver.resolve("2001:db8::1/path").into_url(),
            "https://[2001:db8::1]/path"
        );
    }
}
