//! AWS Signature Version 4 request signing.
//!
//! Bedrock rejects unsigned requests.  [`RequestSigner`] produces the
//! `Authorization`, `x-amz-date` and (for temporary credentials)
//! `x-amz-security-token` headers for one request.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use url::Url;

use crate::credentials::Credentials;
use crate::utils::time::{amz_date, date_stamp};
use crate::{Error, Result};

/// The signing algorithm identifier.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// The service name Bedrock runtime requests are signed for.
pub const BEDROCK_SERVICE: &str = "bedrock";

type HmacSha256 = Hmac<Sha256>;

/// Headers to attach to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// Value of the `Authorization` header.
    pub authorization: String,
    /// Value of the `x-amz-date` header.
    pub amz_date: String,
    /// Value of the `x-amz-security-token` header, for temporary credentials.
    pub security_token: Option<String>,
}

/// Signs requests for one region and service.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: Credentials,
    region: String,
    service: String,
}

impl RequestSigner {
    /// Creates a signer.
    pub fn new(
        credentials: Credentials,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: service.into(),
        }
    }

    /// The region requests are signed for.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Signs a request.
    ///
    /// `headers` are the additional headers to sign (beyond `host`,
    /// `x-amz-date` and the security token), and must be sent unchanged.  The
    /// URL path must already be percent-encoded the way it will be sent.
    ///
    /// # Errors
    ///
    /// Returns an authentication error when the access key id or secret is
    /// missing, and a URL error when the URL has no host.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        headers: &[(&str, &str)],
        payload: &[u8],
        now: OffsetDateTime,
    ) -> Result<SignedHeaders> {
        let (access_key_id, secret_access_key) = self.credentials.require()?;
        let amz_date = amz_date(now);
        let date = date_stamp(now);

        let mut canonical_headers: Vec<(String, String)> = headers
            .iter()
            .map(|(name, value)| (name.to_lowercase(), canonical_header_value(value)))
            .collect();
        canonical_headers.push(("host".to_string(), host_header(url)?));
        canonical_headers.push(("x-amz-date".to_string(), amz_date.clone()));
        if let Some(token) = self.credentials.session_token() {
            canonical_headers.push(("x-amz-security-token".to_string(), token.to_string()));
        }
        canonical_headers.sort();

        let canonical = canonical_request(method, url, &canonical_headers, payload);
        let scope = format!(
            "{date}/{region}/{service}/aws4_request",
            region = self.region,
            service = self.service
        );
        let to_sign = string_to_sign(&amz_date, &scope, &canonical);
        let key = signing_key(secret_access_key, &date, &self.region, &self.service);
        let signature = hex::encode(hmac(&key, to_sign.as_bytes()));

        let signed_headers = signed_header_names(&canonical_headers);
        let authorization = format!(
            "{ALGORITHM} Credential={access_key_id}/{scope}, SignedHeaders={signed_headers}, Signature={signature}"
        );
        Ok(SignedHeaders {
            authorization,
            amz_date,
            security_token: self.credentials.session_token().map(str::to_string),
        })
    }
}

/// Percent-encodes a string the way SigV4 expects.
///
/// Unreserved characters (`A-Z a-z 0-9 - _ . ~`) pass through; everything
/// else becomes `%XX` with upper-case hex.  Slashes are kept only when
/// `encode_slash` is false.
pub fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b'/' if !encode_slash => encoded.push('/'),
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

/// Hex-encoded SHA-256 of a payload.
pub fn sha256_hex(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Derives the SigV4 signing key for a date, region and service.
pub fn signing_key(secret_access_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_secret = format!("AWS4{secret_access_key}");
    let k_date = hmac(k_secret.as_bytes(), date.as_bytes());
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, service.as_bytes());
    hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn host_header(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::url(format!("URL has no host: {url}"), None))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn canonical_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn signed_header_names(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

/// Canonical URI: every path segment encoded again, since the path is
/// already encoded once on the wire.
fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }
    path.split('/')
        .map(|segment| uri_encode(segment, true))
        .collect::<Vec<_>>()
        .join("/")
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k, true), uri_encode(&v, true)))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn canonical_request(
    method: &str,
    url: &Url,
    sorted_headers: &[(String, String)],
    payload: &[u8],
) -> String {
    let mut canonical = String::new();
    canonical.push_str(method);
    canonical.push('\n');
    canonical.push_str(&canonical_uri(url));
    canonical.push('\n');
    canonical.push_str(&canonical_query(url));
    canonical.push('\n');
    for (name, value) in sorted_headers {
        canonical.push_str(name);
        canonical.push(':');
        canonical.push_str(value);
        canonical.push('\n');
    }
    canonical.push('\n');
    canonical.push_str(&signed_header_names(sorted_headers));
    canonical.push('\n');
    canonical.push_str(&sha256_hex(payload));
    canonical
}

pub(crate) fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    )
}
