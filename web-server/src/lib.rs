// web-server/src/lib.rs
pub mod api;
pub mod detection_registry;
pub mod error;
pub mod middleware;
pub mod proxy;

use actix_web::{get, HttpResponse, Responder};

#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Roadnet Web Server")
}
