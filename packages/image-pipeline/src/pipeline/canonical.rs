//! URL canonicalization for duplicate detection.
//!
//! Sites routinely serve one logical image under several derived URLs:
//! thumbnails, `@2x` density variants, CDN resize folders. The canonical key
//! strips those markers so the deduplicator sees a single image. Two distinct
//! images whose paths collide after stripping are merged; recall wins over
//! precision here.

use lazy_static::lazy_static;
use regex::Regex;
use url::{Origin, Url};

lazy_static! {
    /// Size and variant markers removed from anywhere in the path.
    static ref SUFFIX_PATTERNS: Vec<Regex> = vec![
        // Dimension suffixes: -300x200, _1024x768, 640x480
        Regex::new(r"(?i)[-_]?[0-9]+x[0-9]+").unwrap(),
        // Named size variants
        Regex::new(r"(?i)[-_](thumb|small|medium|large)").unwrap(),
        // Density suffixes: @2x
        Regex::new(r"(?i)@[0-9]+x").unwrap(),
        Regex::new(r"(?i)[-_](preview|scaled)").unwrap(),
        // Width / height hints: -w300, _h200
        Regex::new(r"(?i)[-_]w[0-9]+").unwrap(),
        Regex::new(r"(?i)[-_]h[0-9]+").unwrap(),
    ];

    /// CDN-style size folders, collapsed to a single `/`.
    static ref FOLDER_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)/[0-9]+x[0-9]+/").unwrap(),
        Regex::new(r"(?i)/(thumb|small|medium|large)/").unwrap(),
    ];

    /// Empty segments left behind once a marker is removed.
    static ref REPEATED_SLASHES: Regex = Regex::new(r"/{2,}").unwrap();
}

/// Map a raw image URL to the key used for identity comparisons.
///
/// Total: input that does not parse as a URL with a host falls back to a
/// lower-cased copy with trailing slashes removed.
///
/// Every trailing slash is trimmed, not just one, so canonicalizing a key
/// again returns it unchanged (`a//` would otherwise become `a/`, then `a`).
pub fn canonicalize(raw: &str) -> String {
    let key = match Url::parse(raw) {
        Ok(url) => match url.origin() {
            origin @ Origin::Tuple(..) => {
                format!("{}{}", origin.ascii_serialization(), strip_size_markers(url.path()))
            }
            Origin::Opaque(_) => raw.to_string(),
        },
        Err(_) => raw.to_string(),
    };

    key.to_lowercase().trim_end_matches('/').to_string()
}

/// Remove size markers from a URL path.
///
/// Size folders go first, before the suffix patterns can eat their
/// digits. Removing one marker can expose another (`/1-thumbx2` becomes
/// `/1x2`), so passes repeat until the path stops changing.
fn strip_size_markers(path: &str) -> String {
    let mut current = path.to_string();
    loop {
        let mut next = current.clone();
        for pattern in FOLDER_PATTERNS.iter() {
            next = pattern.replace_all(&next, "/").into_owned();
        }
        for pattern in SUFFIX_PATTERNS.iter() {
            next = pattern.replace_all(&next, "").into_owned();
        }
        next = REPEATED_SLASHES.replace_all(&next, "/").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}
