// web-server/tests/support/mod.rs
#![allow(dead_code)]

use actix_web::dev::ServerHandle;
use actix_web::http::header::{self, HeaderName};
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use roadnet_web::proxy::Gateway;
use serde_json::json;
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Stub of the real backend, bound on an ephemeral port
pub struct Backend {
    pub url: String,
    hits: Arc<AtomicUsize>,
    handle: ServerHandle,
}

impl Backend {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub async fn stop(self) {
        self.handle.stop(true).await;
    }
}

async fn echo(req: HttpRequest, body: web::Bytes, hits: web::Data<Arc<AtomicUsize>>) -> HttpResponse {
    hits.fetch_add(1, Ordering::SeqCst);
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    HttpResponse::Ok().json(json!({
        "method": req.method().as_str(),
        "path": req.path(),
        "query": req.query_string(),
        "authorization": header(header::AUTHORIZATION),
        "contentType": header(header::CONTENT_TYPE),
        "accept": header(header::ACCEPT),
        "body": String::from_utf8_lossy(&body),
    }))
}

pub async fn spawn_backend() -> Backend {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(counter.clone()))
            .route("/attributes", web::get().to(|| async {
                HttpResponse::Ok().json(json!({ "a": 1 }))
            }))
            .route("/space-types", web::get().to(|| async {
                HttpResponse::Ok()
                    .content_type("text/plain; charset=utf-8")
                    .body("pavement\nbridge\n")
            }))
            .route("/users/{action}", web::post().to(|| async {
                HttpResponse::Conflict()
                    .content_type("text/plain")
                    .body("user already active")
            }))
            .route("/roles/{id}", web::get().to(|| async {
                HttpResponse::NotFound().json(json!({
                    "meta": { "status": "Error", "messages": [{ "text": "Role not found", "type": "error" }] },
                    "data": null
                }))
            }))
            .route("/inspection-types/{id}", web::delete().to(|| async {
                HttpResponse::NoContent().finish()
            }))
            .default_service(web::to(echo))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind stub backend");

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    Backend {
        url: format!("http://{}", addr),
        hits,
        handle,
    }
}

/// Stub backend answering every request with `200 {"a":1}`
pub async fn spawn_constant_backend() -> Backend {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let server = HttpServer::new(move || {
        let counter = counter.clone();
        App::new().default_service(web::to(move |_body: web::Bytes| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { HttpResponse::Ok().json(json!({ "a": 1 })) }
        }))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind stub backend");

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    Backend {
        url: format!("http://{}", addr),
        hits,
        handle,
    }
}

/// A URL on a port nothing is listening on
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let port = listener.local_addr().expect("probe addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

pub fn gateway(base: &str) -> web::Data<Gateway> {
    gateway_with_limit(base, 1024 * 1024)
}

pub fn gateway_with_limit(base: &str, max_body_bytes: usize) -> web::Data<Gateway> {
    web::Data::new(Gateway::new(
        Ok(Url::parse(base).expect("valid base url")),
        Duration::from_secs(5),
        max_body_bytes,
    ))
}
