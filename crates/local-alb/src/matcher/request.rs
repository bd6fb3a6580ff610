//! Request attribute extraction for condition evaluation.
//!
//! Every accessor is total: a missing or undecodable attribute reads as the
//! empty string, so evaluation never fails at request time.

use hyper::header::HOST;
use hyper::Request;
use std::borrow::Cow;

/// `Host` header as sent (including any port), falling back to the URI authority.
pub fn host<B>(req: &Request<B>) -> &str {
    req.headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
        .unwrap_or("")
}

/// Percent-decoded request path. An undecodable path is matched as received.
pub fn path<B>(req: &Request<B>) -> Cow<'_, str> {
    let raw = req.uri().path();
    if !raw.contains('%') {
        return Cow::Borrowed(raw);
    }
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

/// First value of the named header.
pub fn header_value<'a, B>(req: &'a Request<B>, name: &hyper::header::HeaderName) -> &'a str {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Decoded value of the first occurrence of `key` in the query string.
pub fn query_param<'a, B>(req: &'a Request<B>, key: &str) -> Cow<'a, str> {
    let Some(query) = req.uri().query() else {
        return Cow::Borrowed("");
    };

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        if decode_component(raw_key) == key {
            return decode_component(raw_value);
        }
    }

    Cow::Borrowed("")
}

/// Form-style decoding: `+` is a space, then percent-decoding. Invalid
/// sequences are kept verbatim.
fn decode_component(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['+', '%']) {
        return Cow::Borrowed(raw);
    }
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => Cow::Owned(spaced),
    }
}
