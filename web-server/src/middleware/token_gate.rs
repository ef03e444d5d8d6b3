// web-server/src/middleware/token_gate.rs
use std::rc::Rc;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage, HttpResponse,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use roadnet_common::session::TOKEN_COOKIE_NAME;
use roadnet_common::AuthGateConfig;

/// Redirects requests for protected pages to the login page
/// unless they carry a non-empty `token` cookie.
#[derive(Debug, Clone)]
pub struct TokenGate {
    inner: Rc<GateRules>,
}

#[derive(Debug)]
struct GateRules {
    protected_paths: Vec<String>,
    login_path: String,
}

impl GateRules {
    fn is_protected(&self, path: &str) -> bool {
        // The gateway applies its own auth policy
        if path == "/api" || path.starts_with("/api/") {
            return false;
        }
        if path == self.login_path {
            return false;
        }
        self.protected_paths.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .map_or(false, |rest| rest.starts_with('/'))
        })
    }
}

impl TokenGate {
    pub fn new(protected_paths: Vec<String>, login_path: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(GateRules {
                protected_paths,
                login_path: login_path.into(),
            }),
        }
    }

    pub fn from_config(config: &AuthGateConfig) -> Self {
        Self::new(config.protected_paths.clone(), config.login_path.clone())
    }
}

impl<S, B> Transform<S, ServiceRequest> for TokenGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = TokenGateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TokenGateMiddleware {
            service,
            rules: self.inner.clone(),
        }))
    }
}

pub struct TokenGateMiddleware<S> {
    service: S,
    rules: Rc<GateRules>,
}

impl<S, B> Service<ServiceRequest> for TokenGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.rules.is_protected(req.path()) {
            let has_token = req
                .cookie(TOKEN_COOKIE_NAME)
                .map_or(false, |cookie| !cookie.value().is_empty());

            if !has_token {
                tracing::debug!("No session token for {}, redirecting to login", req.path());

                let response = HttpResponse::TemporaryRedirect()
                    .insert_header((header::LOCATION, self.rules.login_path.as_str()))
                    .finish()
                    .map_into_right_body();
                let (req, _) = req.into_parts();
                return Box::pin(async move { Ok(ServiceResponse::new(req, response)) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            fut.await.map(ServiceResponse::map_into_left_body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> GateRules {
        GateRules {
            protected_paths: vec!["/dashboard".into(), "/assets".into()],
            login_path: "/login".into(),
        }
    }

    #[test]
    fn test_prefix_matching_respects_segments() {
        let rules = rules();
        assert!(rules.is_protected("/dashboard"));
        assert!(rules.is_protected("/assets/12/edit"));
        assert!(!rules.is_protected("/assets-public"));
        assert!(!rules.is_protected("/login"));
        assert!(!rules.is_protected("/"));
    }

    #[test]
    fn test_api_is_never_gated() {
        let rules = GateRules {
            protected_paths: vec!["/api".into()],
            login_path: "/login".into(),
        };
        assert!(!rules.is_protected("/api/organizations"));
    }
}
