// web-server/src/api/resources.rs
use actix_web::{web, HttpRequest};

use crate::proxy::{
    self, AuthPolicy::*, BodyMode, Gateway, ResourceRoute, ResponseMode, UnreachablePolicy::*, Verb::*,
};

const fn route(
    path: &'static str,
    verb: proxy::Verb,
    backend: &'static str,
    auth: proxy::AuthPolicy,
    body: BodyMode,
    unreachable: proxy::UnreachablePolicy,
) -> ResourceRoute {
    ResourceRoute {
        path,
        verb,
        backend,
        auth,
        body,
        response: ResponseMode::Json,
        unreachable,
    }
}

const fn text(mut route: ResourceRoute) -> ResourceRoute {
    route.response = ResponseMode::Text;
    route
}

/// Every backend resource the gateway exposes under `/api`
pub static ROUTES: &[ResourceRoute] = &[
    route("/login", Post, "/auth/login", Optional, BodyMode::Json, Fail),
    // organizations
    route("/organizations", Get, "/organizations", Required, BodyMode::Empty, DegradeToEmptyList),
    route("/organization", Post, "/organizations", Required, BodyMode::Json, Fail),
    route("/organization/{id}", Get, "/organizations/{id}", Required, BodyMode::Empty, Fail),
    route("/organization/{id}", Patch, "/organizations/{id}", Required, BodyMode::Json, Fail),
    route("/organization/{id}", Delete, "/organizations/{id}", Required, BodyMode::Empty, Fail),
    // attributes
    route("/attributes", Get, "/attributes", Optional, BodyMode::Empty, DegradeToEmptyList),
    route("/attribute", Post, "/attributes", Required, BodyMode::Json, Fail),
    route("/attribute/{id}", Patch, "/attributes/{id}", Required, BodyMode::Json, Fail),
    route("/attribute/{id}", Delete, "/attributes/{id}", Required, BodyMode::Empty, Fail),
    // roles
    route("/roles", Get, "/roles", Optional, BodyMode::Empty, DegradeToEmptyList),
    route("/role/{id}", Get, "/roles/{id}", Required, BodyMode::Empty, Fail),
    // inspection types
    route("/inspection-type", Get, "/inspection-types", Optional, BodyMode::Empty, DegradeToEmptyList),
    route("/inspection-type", Post, "/inspection-types", Required, BodyMode::Json, Fail),
    route("/inspection-type/{id}", Patch, "/inspection-types/{id}", Required, BodyMode::Json, Fail),
    route("/inspection-type/{id}", Delete, "/inspection-types/{id}", Required, BodyMode::Empty, Fail),
    // assets; creation carries the photo upload
    route("/asset", Post, "/assets", Required, BodyMode::Multipart, Fail),
    route("/asset/{id}", Get, "/assets/{id}", Required, BodyMode::Empty, Fail),
    route("/asset/{id}", Patch, "/assets/{id}", Required, BodyMode::Json, Fail),
    route("/asset/{id}", Delete, "/assets/{id}", Required, BodyMode::Empty, Fail),
    // spaces
    route("/space", Get, "/spaces", Optional, BodyMode::Empty, DegradeToEmptyList),
    route("/space", Post, "/spaces", Required, BodyMode::Json, Fail),
    route("/space/{id}", Get, "/spaces/{id}", Required, BodyMode::Empty, Fail),
    route("/space/{id}", Patch, "/spaces/{id}", Required, BodyMode::Json, Fail),
    route("/space/{id}", Delete, "/spaces/{id}", Required, BodyMode::Empty, Fail),
    // space types; the listing backend answers in plain text
    text(route("/space-type", Get, "/space-types", Optional, BodyMode::Empty, Fail)),
    route("/space-type", Post, "/space-types", Required, BodyMode::Json, Fail),
    // user actions (invite, activate, deactivate, reset-password, ...)
    text(route("/user/{action}", Post, "/users/{action}", Required, BodyMode::Json, Fail)),
];

/// Register one actix resource per distinct path, with a route per verb
pub fn configure(cfg: &mut web::ServiceConfig) {
    let mut paths: Vec<&'static str> = Vec::new();
    for route in ROUTES {
        if !paths.contains(&route.path) {
            paths.push(route.path);
        }
    }

    for path in paths {
        let mut resource = web::resource(path);
        for route in ROUTES.iter().filter(|r| r.path == path) {
            resource = resource.route(web::method(route.verb.method()).to(
                move |req: HttpRequest, payload: web::Payload, gateway: web::Data<Gateway>| {
                    proxy::forward(route, req, payload, gateway)
                },
            ));
        }
        cfg.service(resource);
    }
}
