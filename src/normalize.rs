//! Link canonicalization and fingerprinting.
//!
//! Every row id is `hex(sha256(normalize(link)))`. Two links that only differ
//! in tracking parameters, fragment, trailing slash, or scheme/host casing
//! must normalize to the same string, otherwise the same article would be
//! ingested again on the next run.
//!
//! Normalization is pure and never fails: a link that cannot be parsed is
//! passed through unchanged and flagged, because a stable id matters more than
//! a perfect canonical form.

use clap::ValueEnum;
use sha2::{Digest, Sha256};
use url::Url;

/// How the query string of a link is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum QueryPolicy {
    /// Drop the whole query string.
    #[default]
    DropAll,
    /// Drop only known tracking parameters and keep the rest in order.
    DropTracking,
}

/// Exact parameter names stripped under [`QueryPolicy::DropTracking`].
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "dclid",
    "mc_cid",
    "mc_eid",
    "guccounter",
    "guce_referrer",
    "guce_referrer_sig",
    "ncid",
    "soc_src",
    "soc_trk",
    "yptr",
    ".tsrc",
    "ref",
    "cmpid",
];

/// Redirect wrappers: (host suffix, path, parameters carrying the target).
const REDIRECTORS: &[(&str, &str, &[&str])] = &[
    ("google.com", "/url", &["q", "url"]),
    ("l.facebook.com", "/l.php", &["u"]),
];

/// Bounds nested redirect wrappers.
const MAX_UNWRAP: usize = 3;

/// Result of normalizing one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLink {
    pub link: String,
    /// `false` when the input could not be parsed and was passed through.
    pub canonical: bool,
}

/// Canonicalize `raw`, resolving it against `base` first when it is relative.
pub fn normalize_link(raw: &str, base: Option<&Url>, policy: QueryPolicy) -> NormalizedLink {
    let trimmed = raw.trim();
    let parsed = match base {
        Some(base) => base.join(trimmed),
        None => Url::parse(trimmed),
    };

    let Ok(mut url) = parsed else {
        return NormalizedLink {
            link: raw.to_string(),
            canonical: false,
        };
    };

    for _ in 0..MAX_UNWRAP {
        match redirect_target(&url) {
            Some(target) => url = target,
            None => break,
        }
    }

    url.set_fragment(None);
    match policy {
        QueryPolicy::DropAll => url.set_query(None),
        QueryPolicy::DropTracking => strip_tracking(&mut url),
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        url.set_path(&trimmed);
    }

    NormalizedLink {
        link: url.to_string(),
        canonical: true,
    }
}

/// `hex(sha256(normalized_link))`, lowercase, 64 characters.
pub fn fingerprint(normalized_link: &str) -> String {
    hex::encode(Sha256::digest(normalized_link.as_bytes()))
}

fn is_tracking_param(name: &str) -> bool {
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name)
}

fn strip_tracking(url: &mut Url) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}

fn redirect_target(url: &Url) -> Option<Url> {
    let host = url.host_str()?;
    let (_, _, params) = REDIRECTORS.iter().find(|(suffix, path, _)| {
        (host == *suffix || host.ends_with(&format!(".{suffix}"))) && url.path() == *path
    })?;

    url.query_pairs()
        .find(|(k, _)| params.contains(&&**k))
        .and_then(|(_, v)| Url::parse(&v).ok())
        .filter(|target| matches!(target.scheme(), "http" | "https"))
}
