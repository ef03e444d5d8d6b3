// web-server/src/api/mod.rs
pub mod detection;
pub mod resources;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(detection::upload)
            .service(detection::get_result)
            .configure(resources::configure)
    );
}
