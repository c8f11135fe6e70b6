use crate::{thunder::ThunderClient, tls, userdb::UserStore};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri,
        header::{HOST, LOCATION},
    },
    response::{IntoResponse, Response},
    routing::{any, options},
};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    services::ServeDir,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use ulid::Ulid;
use utoipa::openapi::{InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

pub mod handlers;
use handlers::{health, proxy, status};

/// Generate the OpenAPI document for the documented routes.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// The Thunder proxy is registered outside of this router on purpose: it
/// relays an external API surface and is intentionally not documented here.
fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(status::check_password_status));

    let mut tag = Tag::new("passui");
    tag.description = Some("Password change UI API".to_string());
    router.get_openapi_mut().tags = Some(vec![tag]);

    router
}

// Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(Some(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    let identifier = env!("CARGO_PKG_LICENSE");
    if !identifier.is_empty() {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        info.license = Some(license);
    }

    OpenApiBuilder::new().info(info).build()
}

/// Options resolved by the CLI layer before serving.
pub struct ServerOptions {
    pub port: u16,
    pub https_port: u16,
    pub assets: PathBuf,
    pub cert_paths: Option<tls::CertPaths>,
    pub thunder: Arc<ThunderClient>,
    pub store: Arc<UserStore>,
}

/// Build the application router with middleware and static asset serving.
#[must_use]
pub fn app(thunder: Arc<ThunderClient>, store: Arc<UserStore>, assets: &Path) -> Router {
    let cors = CorsLayer::new()
        // allow `GET` and `POST` when accessing the resource
        .allow_methods([Method::GET, Method::POST])
        // allow requests from any origin
        .allow_origin(Any);

    let (router, _openapi) = api_router().split_for_parts();

    router
        .route("/api/thunder/{*path}", any(proxy::thunder))
        .route("/health", options(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(thunder))
                .layer(Extension(store)),
        )
        .fallback_service(ServeDir::new(assets))
}

/// Start the server, HTTPS when a certificate pair was discovered.
/// # Errors
/// Returns an error if TLS material cannot be loaded or a listener fails.
pub async fn new(options: ServerOptions) -> Result<()> {
    let app = app(options.thunder, options.store, &options.assets);

    match options.cert_paths {
        Some(paths) => serve_https(app, options.port, options.https_port, &paths).await,
        None => serve_http(app, options.port).await,
    }
}

async fn serve_http(app: Router, port: u16) -> Result<()> {
    let listener = TcpListener::bind(format!("[::]:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{port}");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

async fn serve_https(app: Router, port: u16, https_port: u16, paths: &tls::CertPaths) -> Result<()> {
    let server_config = tls::load_server_config(paths)?;
    let rustls_config =
        axum_server::tls_rustls::RustlsConfig::from_config(Arc::new(server_config));

    let addr: SocketAddr = format!("[::]:{https_port}")
        .parse()
        .context("Invalid HTTPS listen address")?;

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_handle.graceful_shutdown(Some(Duration::from_secs(30)));
    });

    info!("Listening on [::]:{https_port} (https)");

    let https = axum_server::bind_rustls(addr, rustls_config)
        .handle(handle)
        .serve(app.into_make_service());

    // The plain HTTP port only redirects; the original keeps it alive so old
    // bookmarks land on the HTTPS listener.
    if port == https_port {
        https.await?;
        return Ok(());
    }

    let redirect = redirect_app(https_port);
    let listener = TcpListener::bind(format!("[::]:{port}"))
        .await
        .with_context(|| format!("Failed to bind redirect port {port}"))?;

    info!("HTTP redirect enabled on port {port} -> HTTPS port {https_port}");

    let redirect_server = axum::serve(listener, redirect.into_make_service())
        .with_graceful_shutdown(async {
            shutdown_signal().await;
        });

    tokio::try_join!(
        async { https.await.context("HTTPS server failed") },
        async { redirect_server.await.context("Redirect server failed") },
    )?;

    info!("Gracefully shutdown");

    Ok(())
}

fn redirect_app(https_port: u16) -> Router {
    Router::new()
        .fallback(redirect_to_https)
        .layer(Extension(HttpsPort(https_port)))
}

#[derive(Debug, Clone, Copy)]
struct HttpsPort(u16);

async fn redirect_to_https(
    Extension(HttpsPort(https_port)): Extension<HttpsPort>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(':').next())
        .unwrap_or("localhost");

    let location = format!("https://{host}:{https_port}{uri}");

    match HeaderValue::from_str(&location) {
        Ok(location) => {
            (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response()
        }
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to install SIGINT handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

// span
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_documented_routes() {
        let spec = openapi();
        let paths = &spec.paths.paths;
        assert!(paths.contains_key("/health"));
        assert!(paths.contains_key("/api/check-password-status"));
        // The proxy stays undocumented on purpose.
        assert!(!paths.keys().any(|path| path.contains("thunder")));
    }

    #[tokio::test]
    async fn redirect_preserves_path_and_query() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("mail.example.com:3001"));

        let response = redirect_to_https(
            Extension(HttpsPort(3443)),
            headers,
            Uri::from_static("/reset?step=2"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers().get(LOCATION),
            Some(&HeaderValue::from_static(
                "https://mail.example.com:3443/reset?step=2"
            ))
        );
    }
}
