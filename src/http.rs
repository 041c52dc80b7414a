use actix_web::{
    dev::Payload, error::ResponseError, http::StatusCode, web, web::Bytes, FromRequest,
    HttpMessage as _, HttpRequest,
};
use futures::future::{self, FutureExt as _, LocalBoxFuture};
use secstr::{SecStr, SecUtf8};

use crate::signature::{self, Signature};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// JSON body of a webhook delivery, either sent raw or wrapped in the
/// `payload` field of a form-encoded body.
#[derive(Debug, Clone)]
pub struct Webhook<T>(pub T);

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Invalid secret key.")]
    InvalidSecretKey,
    #[error("failed parsing signature: {0}")]
    SignatureParseError(#[from] signature::Error),
    #[error("signature doesn't match")]
    InvalidSignature,
    #[error("failed reading request data: {0}")]
    ActixError(#[from] actix_web::Error),
    #[error("invalid form body: {0}")]
    FormError(#[from] serde_urlencoded::de::Error),
    #[error("form body has no `payload` field")]
    NoPayloadField,
    #[error("invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ResponseError for WebhookError {
    fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSecretKey => StatusCode::FORBIDDEN,
            WebhookError::SignatureParseError(_) => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature => StatusCode::FORBIDDEN,
            WebhookError::ActixError(err) => err.as_response_error().status_code(),
            WebhookError::FormError(_) => StatusCode::BAD_REQUEST,
            WebhookError::NoPayloadField => StatusCode::BAD_REQUEST,
            WebhookError::JsonError(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Authentication requirements for incoming webhooks. Both checks are
/// skipped when their key is unset.
#[derive(Debug, Default, Clone)]
pub struct WebhookConfig {
    /// Compared with the `secret_key` query parameter or form field.
    pub secret_key: Option<SecUtf8>,
    /// HMAC key for `X-Hub-Signature-256`.
    pub signing_key: Option<SecStr>,
}

#[derive(Debug, serde::Deserialize)]
struct SecretParams {
    secret_key: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct FormBody {
    payload: Option<String>,
    secret_key: Option<String>,
}

impl WebhookConfig {
    /// Checks the `secret_key` query parameter without touching the body.
    /// Returns the key still to be matched against the form field when a
    /// form-encoded request carries no query parameter.
    fn check_query_secret(&self, req: &HttpRequest) -> Result<Option<SecUtf8>, WebhookError> {
        let expected = match &self.secret_key {
            Some(expected) => expected,
            None => return Ok(None),
        };

        let provided = web::Query::<SecretParams>::from_query(req.query_string())
            .ok()
            .and_then(|params| params.into_inner().secret_key);

        match provided {
            Some(provided) if SecUtf8::from(provided.clone()) == *expected => Ok(None),
            Some(_) => Err(WebhookError::InvalidSecretKey),
            None if is_form(req) => Ok(Some(expected.clone())),
            None => Err(WebhookError::InvalidSecretKey),
        }
    }

    fn check_signature(&self, req: &HttpRequest, body: &[u8]) -> Result<(), WebhookError> {
        let key = match &self.signing_key {
            Some(key) => key,
            None => return Ok(()),
        };

        if Signature::from_headers(req.headers())?.matches(key.unsecure(), body) {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }
}

impl<T> FromRequest for Webhook<T>
where
    T: serde::de::DeserializeOwned + 'static,
{
    type Error = WebhookError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        let default_config = WebhookConfig::default();
        let config = req
            .app_data::<WebhookConfig>()
            .unwrap_or(&default_config);
        let form_secret = match config.check_query_secret(&req) {
            Ok(form_secret) => form_secret,
            Err(err) => return Box::pin(future::err(err)),
        };

        Box::pin(Bytes::from_request(&req, payload).map(
            move |bytes| -> Result<Self, Self::Error> {
                let default_config = WebhookConfig::default();
                let config = req
                    .app_data::<WebhookConfig>()
                    .unwrap_or(&default_config);

                let bytes = bytes?;
                let form = if is_form(&req) {
                    Some(serde_urlencoded::from_bytes::<FormBody>(&bytes))
                } else {
                    None
                };

                if let Some(expected) = form_secret {
                    let provided = form
                        .as_ref()
                        .and_then(|form| form.as_ref().ok())
                        .and_then(|form| form.secret_key.clone());
                    if provided.map(SecUtf8::from) != Some(expected) {
                        return Err(WebhookError::InvalidSecretKey);
                    }
                }
                config.check_signature(&req, &bytes)?;

                let value = match form {
                    Some(form) => {
                        let payload = form?.payload.ok_or(WebhookError::NoPayloadField)?;
                        serde_json::from_str(&payload)?
                    }
                    None => serde_json::from_slice(&bytes)?,
                };
                Ok(Self(value))
            },
        ))
    }
}

fn is_form(req: &HttpRequest) -> bool {
    req.content_type() == FORM_CONTENT_TYPE
}
