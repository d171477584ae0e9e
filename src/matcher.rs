use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::normalize::{normalize, www_variant, NormalizedUrl};

/// The three per-row citation outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CitationFlags {
    /// An exact target URL is cited.
    pub exact_cited: bool,
    /// Any URL on a target domain is cited.
    pub any_domain_cited: bool,
    /// A target-domain URL other than the listed targets is cited.
    pub other_domain_cited: bool,
}

/// Y/N rendering used by the spreadsheet columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YesNo(pub bool);

impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0 { "Y" } else { "N" })
    }
}

impl YesNo {
    pub fn parse(value: &str) -> bool {
        value.trim().eq_ignore_ascii_case("y")
    }
}

/// Split a Sources cell into trimmed, non-empty citations.
pub fn split_sources(sources: &str) -> impl Iterator<Item = &str> {
    sources.split(';').map(str::trim).filter(|s| !s.is_empty())
}

/// Hosts of the given target URLs, skipping those without one.
pub fn target_domains<S: AsRef<str>>(target_urls: &[S]) -> BTreeSet<String> {
    target_urls
        .iter()
        .map(|url| normalize(url.as_ref()).domain)
        .filter(|domain| !domain.is_empty())
        .collect()
}

fn exclusion_set<S: AsRef<str>>(target_urls: &[S]) -> HashSet<NormalizedUrl> {
    let mut excluded = HashSet::new();
    for url in target_urls {
        let target = normalize(url.as_ref());
        excluded.insert(NormalizedUrl {
            domain: www_variant(&target.domain),
            path: target.path.clone(),
        });
        excluded.insert(target);
    }
    excluded
}

pub fn is_exact_cited<S: AsRef<str>>(sources: Option<&str>, target_urls: &[S]) -> bool {
    let Some(sources) = sources else {
        return false;
    };
    let targets: Vec<NormalizedUrl> =
        target_urls.iter().map(|u| normalize(u.as_ref())).collect();
    split_sources(sources).any(|source| targets.contains(&normalize(source)))
}

/// Exact match against one target URL.
pub fn is_url_cited(sources: Option<&str>, target_url: &str) -> bool {
    is_exact_cited(sources, &[target_url])
}

pub fn is_any_domain_cited(sources: Option<&str>, target_domains: &BTreeSet<String>) -> bool {
    let Some(sources) = sources else {
        return false;
    };
    split_sources(sources).any(|source| target_domains.contains(&normalize(source).domain))
}

pub fn is_other_domain_cited<S: AsRef<str>>(
    sources: Option<&str>,
    target_domains: &BTreeSet<String>,
    target_urls: &[S],
) -> bool {
    let Some(sources) = sources else {
        return false;
    };
    let excluded = exclusion_set(target_urls);
    split_sources(sources).any(|source| {
        let source = normalize(source);
        target_domains.contains(&source.domain) && !excluded.contains(&source)
    })
}

/// Target URLs with their derived lookup structures, built once per run.
///
/// With no target URLs every flag is false; results are only meaningful for a
/// non-empty list of absolute URLs.
#[derive(Debug, Clone)]
pub struct CitationTargets {
    urls: Vec<String>,
    normalized: Vec<NormalizedUrl>,
    domains: BTreeSet<String>,
    excluded: HashSet<NormalizedUrl>,
}

impl CitationTargets {
    pub fn new(urls: Vec<String>) -> Self {
        let normalized = urls.iter().map(|u| normalize(u)).collect();
        let domains = target_domains(&urls);
        let excluded = exclusion_set(&urls);
        Self {
            urls,
            normalized,
            domains,
            excluded,
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn domains(&self) -> &BTreeSet<String> {
        &self.domains
    }

    /// All three flags for one Sources cell, parsing each citation once.
    pub fn flags(&self, sources: Option<&str>) -> CitationFlags {
        let mut flags = CitationFlags::default();
        let Some(sources) = sources else {
            return flags;
        };

        for source in split_sources(sources).map(normalize) {
            if self.normalized.contains(&source) {
                flags.exact_cited = true;
            }
            if self.domains.contains(&source.domain) {
                flags.any_domain_cited = true;
                if !self.excluded.contains(&source) {
                    flags.other_domain_cited = true;
                }
            }
        }
        flags
    }
}
