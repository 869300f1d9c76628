//! AWS Signature Version 4 request signing
//!
//! Only what model invocation needs: header-based signing of a single
//! request with a known body.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::ai::error::AiError;
use crate::ai::http_client::WireRequest;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

pub(crate) struct SigningParams<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub session_token: Option<&'a str>,
    pub region: &'a str,
    pub service: &'a str,
}

/// Sign `request` in place: adds `x-amz-date`, the optional security token
/// and the `authorization` header.
pub(crate) fn sign(request: &mut WireRequest, params: &SigningParams<'_>, now: DateTime<Utc>) -> Result<(), AiError> {
    let url = reqwest::Url::parse(&request.url)
        .map_err(|e| AiError::InvalidRequest(format!("invalid endpoint {}: {}", request.url, e)))?;
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => return Err(AiError::InvalidRequest(format!("endpoint has no host: {}", request.url))),
    };

    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();

    request.headers.retain(|(k, _)| {
        !k.eq_ignore_ascii_case("x-amz-date")
            && !k.eq_ignore_ascii_case("authorization")
            && !k.eq_ignore_ascii_case("x-amz-security-token")
    });
    request.headers.push(("x-amz-date".to_string(), amz_date.clone()));
    if let Some(token) = params.session_token {
        request.headers.push(("x-amz-security-token".to_string(), token.to_string()));
    }

    // host is signed but left for the HTTP stack to send
    let mut signed: Vec<(String, String)> = request
        .headers
        .iter()
        .map(|(k, v)| (k.to_lowercase(), canonical_header_value(v)))
        .chain(std::iter::once(("host".to_string(), host)))
        .collect();
    signed.sort();

    let canonical_headers: String = signed.iter().map(|(k, v)| format!("{}:{}\n", k, v)).collect();
    let signed_headers = signed.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>().join(";");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        canonical_uri(url.path()),
        canonical_query(url.query()),
        canonical_headers,
        signed_headers,
        hex::encode(Sha256::digest(&request.body)),
    );

    let scope = format!("{}/{}/{}/aws4_request", date, params.region, params.service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes())),
    );

    let key = signing_key(params.secret_access_key, &date, params.region, params.service)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    request.headers.push((
        "authorization".to_string(),
        format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, params.access_key_id, scope, signed_headers, signature
        ),
    ));

    Ok(())
}

fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<[u8; 32], AiError> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; 32], AiError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| AiError::InvalidRequest(format!("signing key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Each path segment is encoded again (non-S3 services sign the
/// already-encoded path).
fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

fn canonical_query(query: Option<&str>) -> String {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return String::new();
    };
    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (uri_encode(k), uri_encode(v))
        })
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn uri_encode(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn canonical_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
