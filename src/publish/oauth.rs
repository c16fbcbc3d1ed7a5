//! OAuth 1.0a (HMAC-SHA1) request signing for the X API user context.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::distr::Alphanumeric;
use rand::Rng;
use sha1::Sha1;

use crate::config::TwitterCredentials;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 percent-encoding: only `A-Z a-z 0-9 - . _ ~` stay literal.
pub fn percent_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Per-request values that must differ between calls.
#[derive(Debug, Clone)]
pub struct Nonce {
    pub nonce: String,
    pub timestamp: i64,
}

impl Nonce {
    pub fn fresh() -> Self {
        let nonce: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        Self {
            nonce,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Sorted, encoded `k=v&...` parameter string.
fn parameter_string(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&parameter_string(params))
    )
}

pub fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    // HMAC accepts keys of any length.
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("hmac takes any key length");
    mac.update(base.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// `Authorization` header value for one request.
///
/// `extra_params` are the query/form parameters that take part in the
/// signature. JSON bodies are not signed.
pub fn authorization_header(
    creds: &TwitterCredentials,
    method: &str,
    url: &str,
    extra_params: &[(&str, &str)],
    nonce: &Nonce,
) -> String {
    let timestamp = nonce.timestamp.to_string();
    let oauth: Vec<(String, String)> = vec![
        ("oauth_consumer_key".into(), creds.api_key.clone()),
        ("oauth_nonce".into(), nonce.nonce.clone()),
        ("oauth_signature_method".into(), "HMAC-SHA1".into()),
        ("oauth_timestamp".into(), timestamp),
        ("oauth_token".into(), creds.access_token.clone()),
        ("oauth_version".into(), "1.0".into()),
    ];

    let mut all = oauth.clone();
    all.extend(
        extra_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string())),
    );
    let base = signature_base_string(method, url, &all);
    let signature = sign(&base, &creds.api_secret, &creds.access_token_secret);

    let mut header_params = oauth;
    header_params.push(("oauth_signature".into(), signature));
    header_params.sort();
    let fields = header_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {fields}")
}
