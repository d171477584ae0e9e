use std::fmt;

use url::Url;

/// A URL reduced to the parts used for citation matching.
///
/// `domain` is the lowercased host (no `www.` stripping). `path` is the
/// lowercased path without query, fragment or trailing slashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NormalizedUrl {
    pub domain: String,
    pub path: String,
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.domain.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "https://{}{}", self.domain, self.path)
        }
    }
}

/// Normalize a URL string into `(domain, path)`.
///
/// Never fails: text that is not an absolute URL yields an empty domain and
/// the raw text (minus query and fragment) as the path.
pub fn normalize(raw: &str) -> NormalizedUrl {
    let raw = raw.trim();

    if let Ok(url) = Url::parse(raw) {
        return NormalizedUrl {
            domain: url.host_str().unwrap_or_default().to_lowercase(),
            path: clean_path(url.path()),
        };
    }

    // Scheme-relative ("//host/path") still carries an authority
    if let Some(rest) = raw.strip_prefix("//") {
        if let Ok(url) = Url::parse(&format!("https://{rest}")) {
            return NormalizedUrl {
                domain: url.host_str().unwrap_or_default().to_lowercase(),
                path: clean_path(url.path()),
            };
        }
    }

    let path = raw.split(['?', '#']).next().unwrap_or_default();
    NormalizedUrl {
        domain: String::new(),
        path: clean_path(path),
    }
}

fn clean_path(path: &str) -> String {
    path.trim_end_matches('/').to_lowercase()
}

/// Toggle the `www.` prefix: strip it when present, prepend it otherwise.
pub fn www_variant(domain: &str) -> String {
    match domain.strip_prefix("www.") {
        Some(bare) => bare.to_string(),
        None => format!("www.{domain}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_strips() {
        let n = normalize("HTTPS://Example.COM/Docs/Page/?utm=1#top");
        assert_eq!(n.domain, "example.com");
        assert_eq!(n.path, "/docs/page");
    }

    #[test]
    fn test_root_path_becomes_empty() {
        assert_eq!(normalize("https://example.com/").path, "");
        assert_eq!(normalize("https://example.com").path, "");
    }

    #[test]
    fn test_keeps_www_prefix() {
        assert_eq!(normalize("https://www.example.com/a").domain, "www.example.com");
    }

    #[test]
    fn test_missing_scheme_yields_empty_domain() {
        let n = normalize("example.com/a/?q=1");
        assert_eq!(n.domain, "");
        assert_eq!(n.path, "example.com/a");
    }

    #[test]
    fn test_scheme_relative_keeps_host() {
        let n = normalize("//Example.com/A/");
        assert_eq!(n.domain, "example.com");
        assert_eq!(n.path, "/a");
    }

    #[test]
    fn test_garbage_is_total() {
        assert_eq!(normalize(""), NormalizedUrl::default());
        assert_eq!(normalize("   ").domain, "");
        assert_eq!(normalize("not a url at all").domain, "");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            "https://example.com/a/",
            "https://WWW.Example.com/A/b//?x=1#frag",
            "http://example.com",
            "https://example.com/a%20b/",
            "mailto:someone@example.com",
            "example.com/path/",
            "//cdn.example.com/x",
            "",
        ];
        for input in inputs {
            let once = normalize(input);
            let twice = normalize(&once.to_string());
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_www_variant_toggles() {
        assert_eq!(www_variant("www.example.com"), "example.com");
        assert_eq!(www_variant("example.com"), "www.example.com");
    }
}
