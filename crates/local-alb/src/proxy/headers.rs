//! Identity and forwarding header helpers.
//!
//! Header names are compile-time constants, so inserting them never needs a
//! runtime `.parse().unwrap()`.

use crate::auth::AuthContext;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};

/// Username of the authenticated user
pub static X_AMZN_OIDC_IDENTITY: HeaderName = HeaderName::from_static("x-amzn-oidc-identity");
/// Access token issued by the identity provider
pub static X_AMZN_OIDC_ACCESSTOKEN: HeaderName =
    HeaderName::from_static("x-amzn-oidc-accesstoken");
/// User claims
pub static X_AMZN_OIDC_DATA: HeaderName = HeaderName::from_static("x-amzn-oidc-data");

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Headers only the load balancer may set. Inbound copies are always removed
/// before a request is forwarded.
pub fn identity_headers() -> [&'static HeaderName; 3] {
    [
        &X_AMZN_OIDC_ACCESSTOKEN,
        &X_AMZN_OIDC_IDENTITY,
        &X_AMZN_OIDC_DATA,
    ]
}

/// Hop-by-hop headers that must not be passed through a proxy.
pub static HOP_BY_HOP: [HeaderName; 7] = [
    HeaderName::from_static("connection"),
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    HeaderName::from_static("te"),
    HeaderName::from_static("trailer"),
    HeaderName::from_static("transfer-encoding"),
    HeaderName::from_static("upgrade"),
];

pub fn strip_identity_headers(headers: &mut HeaderMap) {
    for name in identity_headers() {
        headers.remove(name);
    }
}

/// Replace any identity headers with the ones carried by `auth`.
pub fn apply_identity(
    headers: &mut HeaderMap,
    auth: Option<&AuthContext>,
) -> Result<(), InvalidHeaderValue> {
    strip_identity_headers(headers);

    let Some(auth) = auth else {
        return Ok(());
    };

    headers.insert(
        X_AMZN_OIDC_IDENTITY.clone(),
        HeaderValue::from_str(&auth.username)?,
    );
    if let Some(token) = &auth.access_token {
        headers.insert(X_AMZN_OIDC_ACCESSTOKEN.clone(), HeaderValue::from_str(token)?);
    }
    if let Some(claims) = &auth.claims {
        headers.insert(X_AMZN_OIDC_DATA.clone(), HeaderValue::from_str(claims)?);
    }
    Ok(())
}

pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spoofed() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-amzn-oidc-identity", HeaderValue::from_static("admin"));
        headers.insert("x-amzn-oidc-accesstoken", HeaderValue::from_static("tok"));
        headers.insert("x-amzn-oidc-data", HeaderValue::from_static("claims"));
        headers.insert("accept", HeaderValue::from_static("*/*"));
        headers
    }

    #[test]
    fn test_strip_without_auth() {
        let mut headers = spoofed();
        apply_identity(&mut headers, None).unwrap();
        for name in identity_headers() {
            assert!(headers.get(name).is_none(), "{name} survived");
        }
        assert_eq!(headers.get("accept").unwrap(), "*/*");
    }

    #[test]
    fn test_inject_replaces_spoofed_identity() {
        let mut headers = spoofed();
        apply_identity(&mut headers, Some(&AuthContext::new("alice"))).unwrap();
        assert_eq!(headers.get(&X_AMZN_OIDC_IDENTITY).unwrap(), "alice");
        assert_eq!(headers.get_all(&X_AMZN_OIDC_IDENTITY).iter().count(), 1);
        assert!(headers.get(&X_AMZN_OIDC_ACCESSTOKEN).is_none());
        assert!(headers.get(&X_AMZN_OIDC_DATA).is_none());
    }

    #[test]
    fn test_inject_optional_headers() {
        let mut headers = HeaderMap::new();
        let auth = AuthContext {
            username: "bob".to_string(),
            access_token: Some("abc".to_string()),
            claims: Some("e30".to_string()),
        };
        apply_identity(&mut headers, Some(&auth)).unwrap();
        assert_eq!(headers.get(&X_AMZN_OIDC_ACCESSTOKEN).unwrap(), "abc");
        assert_eq!(headers.get(&X_AMZN_OIDC_DATA).unwrap(), "e30");
    }

    #[test]
    fn test_invalid_username_is_an_error() {
        let mut headers = HeaderMap::new();
        assert!(apply_identity(&mut headers, Some(&AuthContext::new("bad\nname"))).is_err());
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("close"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("x-keep", HeaderValue::from_static("1"));
        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
    }
}
