use secstr::{SecStr, SecUtf8};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub username: String,
    #[serde(deserialize_with = "deserialize_secutf8")]
    pub password: SecUtf8,
    #[serde(deserialize_with = "deserialize_base_url")]
    pub reviewboard_url: String,
    #[serde(default, deserialize_with = "deserialize_opt_secutf8")]
    pub secret_key: Option<SecUtf8>,
    #[serde(default, deserialize_with = "deserialize_opt_secstr")]
    pub webhook_secret: Option<SecStr>,
    #[serde(default = "enabled")]
    pub branch_filter: bool,
    #[serde(default = "enabled")]
    pub include_description: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_payload_limit")]
    pub payload_limit: usize,
}

fn enabled() -> bool {
    true
}

fn default_bind() -> String {
    "127.0.0.1:8080".into()
}

fn default_payload_limit() -> usize {
    5 * 1024 * 1024
}

/// Both the API endpoint and the review pattern are built by appending to the
/// base URL, so it must end with a slash.
fn deserialize_base_url<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(de).map(|mut url| {
        if !url.ends_with('/') {
            url.push('/');
        }
        url
    })
}

fn deserialize_secutf8<'de, D>(de: D) -> Result<SecUtf8, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(de).map(SecUtf8::from)
}

fn deserialize_opt_secutf8<'de, D>(de: D) -> Result<Option<SecUtf8>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(|o| o.map(SecUtf8::from))
}

fn deserialize_opt_secstr<'de, D>(de: D) -> Result<Option<SecStr>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(|o| o.map(|s| SecStr::new(s.into_bytes())))
}
