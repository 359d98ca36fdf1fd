//! Form body extraction that never rejects a request.
//!
//! URL-encoded and `multipart/form-data` bodies are read into name/value
//! pairs in body order. Any other content type, or a body that cannot be
//! read, yields no pairs; validation then turns that into a rejection, so
//! the response is the same redirect either way.

use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use tracing::debug;

/// Posted fields in body order, repeated keys included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(pub Vec<(String, String)>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    UrlEncoded,
    Multipart,
    Other,
}

fn body_kind(req: &Request) -> BodyKind {
    let Some(content_type) = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return BodyKind::Other;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "application/x-www-form-urlencoded" => BodyKind::UrlEncoded,
        "multipart/form-data" => BodyKind::Multipart,
        _ => BodyKind::Other,
    }
}

impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let pairs = match body_kind(&req) {
            BodyKind::UrlEncoded => read_url_encoded(req, state).await,
            BodyKind::Multipart => read_multipart(req, state).await,
            BodyKind::Other => {
                debug!("Ignoring body without a form content type");
                Vec::new()
            }
        };
        Ok(Self(pairs))
    }
}

async fn read_url_encoded<S: Send + Sync>(req: Request, state: &S) -> Vec<(String, String)> {
    let bytes = match Bytes::from_request(req, state).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Unreadable form body: {}", e);
            return Vec::new();
        }
    };
    serde_urlencoded::from_bytes(&bytes).unwrap_or_else(|e| {
        debug!("Malformed form body: {}", e);
        Vec::new()
    })
}

/// Text fields only; file parts are skipped.
async fn read_multipart<S: Send + Sync>(req: Request, state: &S) -> Vec<(String, String)> {
    let mut multipart = match Multipart::from_request(req, state).await {
        Ok(multipart) => multipart,
        Err(e) => {
            debug!("Unreadable multipart body: {}", e);
            return Vec::new();
        }
    };

    let mut pairs = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped reading multipart body: {}", e);
                break;
            }
        };
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match field.text().await {
            Ok(value) => pairs.push((name, value)),
            Err(e) => {
                debug!("Stopped reading multipart field {}: {}", name, e);
                break;
            }
        }
    }
    pairs
}
