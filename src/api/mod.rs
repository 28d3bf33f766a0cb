use crate::{
    api::handlers::auth::AuthState,
    federated::IdentityVerifier,
    store::PgUserStore,
    token::TokenIssuer,
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    Extension, Router,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_axum::router::OpenApiRouter;

pub mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// The full application: routes, request ids, tracing and shared state.
///
/// CORS is left to the caller since it depends on deployment configuration.
pub fn app(auth_state: Arc<AuthState>) -> Router {
    let (router, _openapi) = router().split_for_parts();
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(auth_state)),
    )
}

/// Start the server
/// # Errors
/// Return error if failed to connect to the database or bind the port
pub async fn new(
    port: u16,
    dsn: &SecretString,
    tokens: TokenIssuer,
    identity_verifier: Option<Arc<dyn IdentityVerifier>>,
    frontend_base_url: Option<&str>,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    let store = PgUserStore::new(pool);
    store
        .ensure_schema()
        .await
        .context("Failed to apply database schema")?;

    let mut auth_state = AuthState::new(Arc::new(store), tokens);
    if let Some(verifier) = identity_verifier {
        auth_state = auth_state.with_identity_verifier(verifier);
    } else {
        info!("Google sign-in disabled: no client id configured");
    }

    let app = app(Arc::new(auth_state)).layer(cors(frontend_base_url)?);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn cors(frontend_base_url: Option<&str>) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST]);

    // Bearer tokens travel in headers, not cookies, so no credentials mode.
    Ok(match frontend_base_url {
        Some(url) => cors.allow_origin(AllowOrigin::exact(frontend_origin(url)?)),
        None => cors.allow_origin(Any),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryUserStore;
    use anyhow::Result;
    use axum::{body::to_bytes, http::StatusCode};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let tokens = TokenIssuer::new(&SecretString::from(
            "test-signing-secret-0123456789abcdef".to_string(),
        ));
        app(Arc::new(AuthState::new(
            Arc::new(MemoryUserStore::new()),
            tokens,
        )))
    }

    async fn send(app: Router, request: Request<Body>) -> Result<(StatusCode, serde_json::Value)> {
        let response = app.oneshot(request).await?;
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&body)?))
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Result<Request<Body>> {
        Ok(Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body)?))?)
    }

    #[test]
    fn frontend_origin_strips_path() -> Result<()> {
        let origin = frontend_origin("https://coastalwatch.app/analysis/")?;
        assert_eq!(origin, "https://coastalwatch.app");

        let origin = frontend_origin("http://localhost:8080")?;
        assert_eq!(origin, "http://localhost:8080");

        assert!(frontend_origin("not a url").is_err());
        Ok(())
    }

    #[tokio::test]
    async fn register_duplicate_and_login_over_http() -> Result<()> {
        let app = test_app();
        let credentials = serde_json::json!({ "email": "a@x.com", "password": "pw123456" });

        let (status, body) = send(app.clone(), post_json("/api/auth/register", &credentials)?).await?;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(body["user"], serde_json::json!({ "email": "a@x.com" }));

        let (status, body) = send(app.clone(), post_json("/api/auth/register", &credentials)?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "error": "User already exists" }));

        let wrong = serde_json::json!({ "email": "a@x.com", "password": "wrong" });
        let (status, body) = send(app.clone(), post_json("/api/auth/login", &wrong)?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "error": "Invalid credentials" }));

        let (status, body) = send(app, post_json("/api/auth/login", &credentials)?).await?;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().is_some());
        Ok(())
    }

    #[tokio::test]
    async fn missing_payload_is_validation_error() -> Result<()> {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .body(Body::empty())?;
        let (status, body) = send(test_app(), request).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "error": "Missing payload" }));
        Ok(())
    }

    #[tokio::test]
    async fn google_without_client_id_is_rejected() -> Result<()> {
        let body = serde_json::json!({ "idToken": "whatever" });
        let (status, body) = send(test_app(), post_json("/api/auth/google", &body)?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            serde_json::json!({ "error": "Google sign-in is not configured" })
        );
        Ok(())
    }

    #[tokio::test]
    async fn refresh_status_codes() -> Result<()> {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/refresh")
            .body(Body::empty())?;
        let (status, body) = send(test_app(), request).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({ "error": "Missing token" }));

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/refresh")
            .header(AUTHORIZATION, "Bearer not-a-token")
            .body(Body::empty())?;
        let (status, body) = send(test_app(), request).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({ "error": "Invalid token" }));
        Ok(())
    }

    #[tokio::test]
    async fn health_route_and_request_id() -> Result<()> {
        let request = Request::builder()
            .method("GET")
            .uri("/api/health")
            .header("x-request-id", "req-123")
            .body(Body::empty())?;
        let response = test_app().oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok()),
            Some("req-123")
        );
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let payload: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(payload, serde_json::json!({ "ok": true }));
        Ok(())
    }
}
