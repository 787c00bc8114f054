//! `Content-Encoding` removal for report bodies.
//!
//! Only report snapshots are decoded; the client keeps the origin's bytes.
//! Codings are undone last-applied first. An unknown coding, corrupt data or
//! output past [`MAX_DECODED_BYTES`] leaves the body exactly as received.

use std::borrow::Cow;
use std::io::Read;

use axum::http::header::CONTENT_ENCODING;
use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};

use crate::http::headers::HeaderList;

/// Upper bound on a decoded report body.
pub const MAX_DECODED_BYTES: u64 = 16 * 1024 * 1024;

const BROTLI_BUFFER: usize = 4096;

/// The body with every `Content-Encoding` in `headers` undone.
pub fn decoded_body<'a>(headers: &HeaderList, body: &'a [u8]) -> Cow<'a, [u8]> {
    let codings: Vec<String> = headers
        .get_all(&CONTENT_ENCODING)
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|coding| coding.trim().to_ascii_lowercase())
        .filter(|coding| !coding.is_empty() && coding != "identity")
        .collect();
    if codings.is_empty() || body.is_empty() {
        return Cow::Borrowed(body);
    }

    let mut current = body.to_vec();
    for coding in codings.iter().rev() {
        match decode_one(coding, &current) {
            Some(decoded) => current = decoded,
            None => {
                tracing::debug!(coding = %coding, "Could not decode report body, keeping raw bytes");
                return Cow::Borrowed(body);
            }
        }
    }
    Cow::Owned(current)
}

fn decode_one(coding: &str, data: &[u8]) -> Option<Vec<u8>> {
    match coding {
        "gzip" | "x-gzip" => read_bounded(MultiGzDecoder::new(data)),
        // Servers disagree on whether deflate means zlib-wrapped or raw.
        "deflate" => {
            read_bounded(ZlibDecoder::new(data)).or_else(|| read_bounded(DeflateDecoder::new(data)))
        }
        "br" => read_bounded(brotli::Decompressor::new(data, BROTLI_BUFFER)),
        _ => None,
    }
}

fn read_bounded(reader: impl Read) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    reader
        .take(MAX_DECODED_BYTES + 1)
        .read_to_end(&mut out)
        .ok()?;
    (out.len() as u64 <= MAX_DECODED_BYTES).then_some(out)
}
