// web-server/src/main.rs
use actix::Actor;
use actix_web::{web, App, HttpServer};
use roadnet_common::{setup_tracing, Config};
use roadnet_web::detection_registry::DetectionRegistryActor;
use roadnet_web::middleware::TokenGate;
use roadnet_web::proxy::Gateway;
use roadnet_web::{api, index};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Setup tracing
    setup_tracing();

    // Load configuration
    let config = Config::from_env();

    // Save address before handing config pieces to the server factory
    let server_addr = config.web_server_addr.clone();

    tracing::info!("Starting Web Server on {}", server_addr);

    // Shared gateway client and detection store
    let gateway = web::Data::new(Gateway::from_config(&config));
    let registry = web::Data::new(DetectionRegistryActor::new().start());
    let gate_config = config.auth_gate.clone();

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .wrap(TokenGate::from_config(&gate_config))
            .app_data(gateway.clone())
            .app_data(registry.clone())
            .service(index)
            .configure(api::configure)
    })
    .bind(&server_addr)?
    .run()
    .await
}
