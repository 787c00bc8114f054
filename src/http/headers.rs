//! Ordered, duplicate-preserving header collection and its JSON codec.
//!
//! # Responsibilities
//! - Hold headers exactly as they appeared on the wire (order + repeats)
//! - Provide mitmproxy-style get/set/remove semantics on top of that list
//! - Serialize into `headers_list` (authoritative) and `headers` (last-win view)
//!
//! # Design Decisions
//! - `HeaderMap` groups values by name, so it cannot be the authoritative
//!   representation; it is only produced at the edges when talking to hyper/reqwest
//! - Values stay as raw `HeaderValue` bytes; lossy text decoding only happens
//!   when serializing for a report
//! - Known limitation: hyper hands over parsed headers as a `HeaderMap`, which
//!   groups values by name. Duplicates and per-name order survive, but the
//!   relative order of interleaved names does not: `a, b, a` arrives as
//!   `a, a, b`

use std::collections::BTreeMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

/// Connection-scoped headers that must not be relayed between hops.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// An ordered sequence of `(name, value)` pairs where names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over every pair, duplicates included, in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Append a pair without touching existing values of the same name.
    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        self.entries.push((name, value));
    }

    pub fn contains(&self, name: &HeaderName) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    /// All values for `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a HeaderName) -> impl Iterator<Item = &'a HeaderValue> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Single-value view of `name`: repeated values are folded with `", "`.
    pub fn get(&self, name: &HeaderName) -> Option<HeaderValue> {
        let mut values = self.get_all(name);
        let first = values.next()?.clone();
        let mut joined = first.as_bytes().to_vec();
        let mut folded = false;
        for value in values {
            joined.extend_from_slice(b", ");
            joined.extend_from_slice(value.as_bytes());
            folded = true;
        }
        if !folded {
            return Some(first);
        }
        HeaderValue::from_bytes(&joined).ok()
    }

    /// Set `name` to exactly one value.
    ///
    /// The first existing occurrence is replaced in place and later ones are
    /// dropped; when the name is absent the pair is appended.
    pub fn set(&mut self, name: HeaderName, value: HeaderValue) {
        let mut value = Some(value);
        self.entries.retain_mut(|(k, v)| {
            if *k != name {
                return true;
            }
            match value.take() {
                Some(new) => {
                    *v = new;
                    true
                }
                None => false,
            }
        });
        if let Some(value) = value {
            self.entries.push((name, value));
        }
    }

    /// Remove every occurrence of `name`, returning the removed values in order.
    pub fn remove(&mut self, name: &HeaderName) -> Vec<HeaderValue> {
        let mut removed = Vec::new();
        self.entries.retain(|(k, v)| {
            if k == name {
                removed.push(v.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Drop connection-scoped headers plus `content-length`.
    ///
    /// Bodies are fully buffered, so framing is recomputed by whoever sends them.
    pub fn strip_hop_by_hop(&mut self) {
        self.entries.retain(|(k, _)| {
            let name = k.as_str();
            name != "content-length" && !HOP_BY_HOP.contains(&name)
        });
    }

    /// Convert into a `HeaderMap`, keeping duplicates via `append`.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (k, v) in &self.entries {
            map.append(k.clone(), v.clone());
        }
        map
    }
}

/// Values of one name stay in order; distinct names follow `HeaderMap` order.
impl From<&HeaderMap> for HeaderList {
    fn from(map: &HeaderMap) -> Self {
        Self {
            entries: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

impl FromIterator<(HeaderName, HeaderValue)> for HeaderList {
    fn from_iter<I: IntoIterator<Item = (HeaderName, HeaderValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// JSON-ready form of a [`HeaderList`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SerializedHeaders {
    /// Every pair in stored order, duplicates preserved.
    pub pairs: Vec<(String, String)>,
    /// Last occurrence wins. Lossy; never authoritative.
    pub last_win: BTreeMap<String, String>,
}

/// Serialize a header collection into its pair list and last-win map.
pub fn serialize_headers(headers: &HeaderList) -> SerializedHeaders {
    let mut out = SerializedHeaders::default();
    for (name, value) in headers.iter() {
        let name = name.as_str().to_string();
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.last_win.insert(name.clone(), value.clone());
        out.pairs.push((name, value));
    }
    out
}
