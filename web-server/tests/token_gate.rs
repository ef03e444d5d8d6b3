// web-server/tests/token_gate.rs
use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App, HttpResponse};
use roadnet_web::middleware::TokenGate;

macro_rules! app {
    () => {
        test::init_service(
            App::new()
                .wrap(TokenGate::new(vec!["/dashboard".into(), "/assets".into()], "/login"))
                .route("/dashboard", web::get().to(|| async { HttpResponse::Ok().body("dashboard") }))
                .route("/assets/{id}", web::get().to(|| async { HttpResponse::Ok().body("asset") }))
                .route("/login", web::get().to(|| async { HttpResponse::Ok().body("login") }))
                .route("/api/assets", web::get().to(|| async { HttpResponse::Ok().body("api") })),
        )
        .await
    };
}

#[actix_web::test]
async fn test_protected_page_without_cookie_redirects() {
    let app = app!();

    for uri in ["/dashboard", "/assets/7"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT, "{}", uri);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
    }
}

#[actix_web::test]
async fn test_empty_cookie_counts_as_signed_out() {
    let app = app!();

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .cookie(Cookie::new("token", ""))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
}

#[actix_web::test]
async fn test_protected_page_with_cookie_passes() {
    let app = app!();

    let req = test::TestRequest::get()
        .uri("/assets/7")
        .cookie(Cookie::new("token", "tok-1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await, "asset");
}

#[actix_web::test]
async fn test_login_and_api_are_open() {
    let app = app!();

    for uri in ["/login", "/api/assets"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
    }
}
