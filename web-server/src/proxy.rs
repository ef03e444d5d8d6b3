// web-server/src/proxy.rs
use actix_web::http::{header, Method, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder};
use futures_util::StreamExt;
use roadnet_common::{Config, ConfigurationError, Envelope};
use serde_json::Value;
use std::fmt;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use url::Url;

use crate::error::GatewayError;

const JSON: &str = "application/json";
const DEGRADED_NOTICE: &str = "Backend service is unavailable; showing no results";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Patch,
    Delete,
}

impl Verb {
    /// Method used to match inbound requests
    pub fn method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Patch => Method::PATCH,
            Verb::Delete => Method::DELETE,
        }
    }

    fn outbound(self) -> reqwest::Method {
        match self {
            Verb::Get => reqwest::Method::GET,
            Verb::Post => reqwest::Method::POST,
            Verb::Patch => reqwest::Method::PATCH,
            Verb::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method().as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Reject with 401 before any outbound call
    Required,
    /// Forward regardless and let the backend decide
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    Empty,
    Json,
    /// Streamed through unparsed with the inbound boundary
    Multipart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Re-serialize JSON bodies
    Json,
    /// Opaque bytes, passed through unchanged
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreachablePolicy {
    Fail,
    /// Answer 200 with an empty list so list views keep rendering
    DegradeToEmptyList,
}

/// One gateway route: where it listens and how it forwards
#[derive(Debug)]
pub struct ResourceRoute {
    /// Inbound path under `/api`, actix pattern syntax
    pub path: &'static str,
    pub verb: Verb,
    /// Backend path template; `{name}` segments are filled from the inbound match
    pub backend: &'static str,
    pub auth: AuthPolicy,
    pub body: BodyMode,
    pub response: ResponseMode,
    pub unreachable: UnreachablePolicy,
}

impl ResourceRoute {
    pub fn backend_url<'a, F>(&self, base: &Url, params: F, query: &str) -> Result<Url, ConfigurationError>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ConfigurationError::InvalidBackendUrl {
                    value: base.to_string(),
                    source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
                })?;
            segments.pop_if_empty();
            for segment in self.backend.split('/').filter(|s| !s.is_empty()) {
                let value = segment
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .and_then(|name| params(name))
                    .unwrap_or(segment);
                segments.push(value);
            }
        }
        url.set_query(if query.is_empty() { None } else { Some(query) });
        Ok(url)
    }
}

/// Shared outbound client plus the resolved backend origin
pub struct Gateway {
    client: reqwest::Client,
    backend: Result<Url, ConfigurationError>,
    max_body_bytes: usize,
}

impl Gateway {
    pub fn new(backend: Result<Url, ConfigurationError>, timeout: Duration, max_body_bytes: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build gateway client, using defaults without timeout: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            backend,
            max_body_bytes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let backend = config.backend.base_url();
        match &backend {
            Ok(url) => tracing::info!("Gateway forwarding to {}", url),
            Err(e) => tracing::error!("Gateway misconfigured, every proxy route will fail: {}", e),
        }
        Self::new(
            backend,
            Duration::from_secs(config.backend.timeout_secs),
            config.backend.max_body_bytes,
        )
    }

    pub fn backend(&self) -> Result<&Url, GatewayError> {
        self.backend.as_ref().map_err(|e| GatewayError::Configuration(e.clone()))
    }
}

/// Forward one inbound request according to `route` and relay the backend's answer
pub async fn forward(
    route: &'static ResourceRoute,
    req: HttpRequest,
    payload: web::Payload,
    gateway: web::Data<Gateway>,
) -> Result<HttpResponse, GatewayError> {
    let base = gateway.backend()?;

    let authorization = req.headers().get(header::AUTHORIZATION).cloned();
    if route.auth == AuthPolicy::Required && authorization.is_none() {
        tracing::debug!("Rejecting {} {} without Authorization", route.verb, req.path());
        return Err(GatewayError::MissingAuthorization);
    }

    let url = route.backend_url(base, |name| req.match_info().get(name), req.query_string())?;
    tracing::debug!("Forwarding {} {} to {}", route.verb, req.path(), url);

    let mut outbound = gateway.client.request(route.verb.outbound(), url);
    if let Some(value) = authorization {
        outbound = outbound.header(reqwest::header::AUTHORIZATION, value.as_bytes());
    }

    outbound = match route.body {
        BodyMode::Empty => json_headers(outbound),
        BodyMode::Json => {
            let body = read_body(payload, gateway.max_body_bytes).await?;
            let outbound = json_headers(outbound);
            if body.is_empty() {
                outbound
            } else {
                outbound.body(body)
            }
        },
        BodyMode::Multipart => {
            let mut outbound = outbound;
            if let Some(content_type) = req.headers().get(header::CONTENT_TYPE) {
                outbound = outbound.header(reqwest::header::CONTENT_TYPE, content_type.as_bytes());
            }
            outbound.body(stream_payload(payload))
        }
    };

    let response = match outbound.send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Backend unreachable for {} {}: {}", route.verb, req.path(), e);
            return match route.unreachable {
                UnreachablePolicy::DegradeToEmptyList => {
                    Ok(HttpResponse::Ok().json(Envelope::empty_list(DEGRADED_NOTICE)))
                },
                UnreachablePolicy::Fail => Err(GatewayError::Transport(e)),
            };
        }
    };

    relay(route.response, response).await
}

fn json_headers(outbound: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    outbound
        .header(reqwest::header::CONTENT_TYPE, JSON)
        .header(reqwest::header::ACCEPT, JSON)
}

async fn read_body(mut payload: web::Payload, limit: usize) -> Result<web::Bytes, GatewayError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| GatewayError::Payload(e.to_string()))?;
        if body.len() + chunk.len() > limit {
            return Err(GatewayError::PayloadTooLarge(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

// The inbound payload is not Send, so a local task pumps it into a channel
// that backs the outbound body.
fn stream_payload(mut payload: web::Payload) -> reqwest::Body {
    let (tx, rx) = mpsc::channel::<Result<web::Bytes, io::Error>>(16);

    actix_web::rt::spawn(async move {
        while let Some(chunk) = payload.next().await {
            let chunk = chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()));
            let failed = chunk.is_err();
            if tx.send(chunk).await.is_err() || failed {
                break;
            }
        }
    });

    reqwest::Body::wrap_stream(ReceiverStream::new(rx))
}

async fn relay(mode: ResponseMode, response: reqwest::Response) -> Result<HttpResponse, GatewayError> {
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let body = response.bytes().await.map_err(GatewayError::UpstreamBody)?;

    let mut builder = HttpResponse::build(status);
    if body.is_empty() {
        return Ok(builder.finish());
    }

    match mode {
        ResponseMode::Json => match serde_json::from_slice::<Value>(&body) {
            Ok(value) => Ok(builder.json(value)),
            Err(_) => {
                tracing::debug!("Backend body is not JSON, relaying unchanged");
                Ok(raw(builder, content_type, body))
            }
        },
        ResponseMode::Text => Ok(raw(builder, content_type, body)),
    }
}

fn raw(mut builder: HttpResponseBuilder, content_type: Option<String>, body: web::Bytes) -> HttpResponse {
    let content_type = content_type.unwrap_or_else(|| "text/plain; charset=utf-8".to_string());
    builder.insert_header((header::CONTENT_TYPE, content_type));
    builder.body(body)
}
