use actix_web::http::header::HeaderMap;
use hmac::{Hmac, Mac as _};
use sha2::Sha256;

pub const HEADER: &str = "X-Hub-Signature-256";
const PREFIX: &[u8] = b"sha256=";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("`X-Hub-Signature-256` header isn't found")]
    HeaderNotFound,
    #[error("`X-Hub-Signature-256` must be `sha256=` followed by 64 hex digits")]
    Malformed,
}

/// HMAC-SHA256 digest of the request body, as claimed by the sender.
#[derive(Debug, Clone)]
pub struct Signature([u8; 32]);

impl Signature {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, Error> {
        let value = headers.get(HEADER).ok_or(Error::HeaderNotFound)?.as_bytes();
        Self::parse(value)
    }

    fn parse(value: &[u8]) -> Result<Self, Error> {
        let digits = value.strip_prefix(PREFIX).ok_or(Error::Malformed)?;
        hex::FromHex::from_hex(digits)
            .map(Self)
            .map_err(|_| Error::Malformed)
    }

    /// Constant-time comparison against the digest of `body` under `key`.
    pub fn matches(&self, key: &[u8], body: &[u8]) -> bool {
        // HMAC accepts keys of any length
        let mut mac = match Hmac::<Sha256>::new_from_slice(key) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(body);
        mac.verify_slice(&self.0).is_ok()
    }
}

#[cfg(test)]
pub fn sign(key: &[u8], body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
