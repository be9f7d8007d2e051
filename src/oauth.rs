//! OAuth 1.0a request signing for the posting service.
//!
//! Twitter's v2 endpoints accept OAuth 1.0a user context: every request
//! carries an `Authorization: OAuth ...` header holding an HMAC-SHA1
//! signature over the method, URL, and normalized parameters (RFC 5849).
//! Timestamps and nonces come from injected providers so signing is
//! deterministic under test.

use crate::config::TwitterKeys;
use crate::providers::{NonceProvider, SystemTimeProvider, TimeProvider, UuidNonceProvider};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::borrow::Cow;

type HmacSha1 = Hmac<Sha1>;

/// Signs outbound requests with the four posting-service credentials.
pub struct RequestSigner {
    keys: TwitterKeys,
    time: Box<dyn TimeProvider>,
    nonce: Box<dyn NonceProvider>,
}

impl RequestSigner {
    pub fn new(keys: TwitterKeys) -> Self {
        Self::with_providers(
            keys,
            Box::new(SystemTimeProvider),
            Box::new(UuidNonceProvider),
        )
    }

    /// Creates a signer with custom time and nonce sources (for testing).
    pub fn with_providers(
        keys: TwitterKeys,
        time: Box<dyn TimeProvider>,
        nonce: Box<dyn NonceProvider>,
    ) -> Self {
        Self { keys, time, nonce }
    }

    /// Builds the `Authorization` header value for one request.
    ///
    /// `extra_params` carries any query or form parameters that take part in
    /// the signature; JSON request bodies contribute nothing.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        extra_params: &[(&str, &str)],
    ) -> String {
        let timestamp = self.time.now().to_string();
        let nonce = self.nonce.nonce();

        let oauth_params: [(&str, &str); 6] = [
            ("oauth_consumer_key", &self.keys.api_key),
            ("oauth_nonce", &nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", &timestamp),
            ("oauth_token", &self.keys.access_token),
            ("oauth_version", "1.0"),
        ];

        let all_params: Vec<(&str, &str)> = oauth_params
            .iter()
            .copied()
            .chain(extra_params.iter().copied())
            .collect();
        let signature = self.sign(method, url, &all_params);

        // Header parameters: the oauth_* set plus the signature, each value
        // percent-encoded, sorted by name.
        let mut header_params: Vec<(&str, String)> = oauth_params
            .iter()
            .map(|(k, v)| (*k, percent_encode(v).into_owned()))
            .collect();
        header_params.push(("oauth_signature", percent_encode(&signature).into_owned()));
        header_params.sort();

        let serialized = header_params
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {serialized}")
    }

    fn sign(&self, method: &str, url: &str, params: &[(&str, &str)]) -> String {
        let base = signature_base(method, url, params);
        let signing_key = format!(
            "{}&{}",
            percent_encode(&self.keys.api_secret),
            percent_encode(&self.keys.access_secret)
        );
        // HMAC accepts keys of any length, so this cannot fail.
        let mut mac =
            HmacSha1::new_from_slice(signing_key.as_bytes()).expect("HMAC key of any length");
        mac.update(base.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }
}

/// RFC 3986 percent encoding over the unreserved set.
fn percent_encode(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

/// Builds the signature base string: method, URL, and the normalized
/// parameter list, each percent-encoded and joined with `&`. Parameters are
/// sorted by encoded name, then value.
fn signature_base(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| {
            (
                percent_encode(k).into_owned(),
                percent_encode(v).into_owned(),
            )
        })
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&normalized)
    )
}
