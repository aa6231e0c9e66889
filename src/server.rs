use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};

use axum::{http::Method, middleware, routing::get, Router};
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::cors::{AllowHeaders, Any, CorsLayer};

use crate::{
    config::{Config, DEFAULT_HOST},
    health::health,
    json_body::parse_json_body,
    logger::SleepLog,
    sleep::sleep,
    timing::RequestTimingLayer,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub log: SleepLog,
}

impl AppState {
    pub fn new(log: SleepLog) -> Self {
        AppState { log }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/sleep", get(sleep))
        .layer(middleware::from_fn(parse_json_body))
        .layer(cors())
        .layer(RequestTimingLayer::new())
        .with_state(state)
}

/// Any origin, the usual methods, and whatever headers a preflight asks for.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}

/// Binds the configured address. The default `::` falls back to `0.0.0.0` on
/// hosts without IPv6.
async fn listen(config: &Config) -> io::Result<TcpListener> {
    match TcpListener::bind(SocketAddr::new(config.host, config.port)).await {
        Err(err) if config.host == DEFAULT_HOST => {
            tracing::debug!("IPv6 bind failed ({err}), retrying on IPv4");
            let ipv4 = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
            TcpListener::bind(SocketAddr::new(ipv4, config.port)).await
        }
        result => result,
    }
}

/// A bound, listening server. Constructing one is the only way to get a
/// listener, so an existing `SleepServer` is always accepting connections.
pub struct SleepServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Router,
}

impl SleepServer {
    pub async fn bind(config: &Config) -> io::Result<Self> {
        let state = AppState::new(SleepLog::new(&config.log_path));
        let listener = listen(config).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            log = %config.log_path.display(),
            "✅ Sleep API running at http://localhost:{}",
            local_addr.port()
        );

        Ok(SleepServer {
            listener,
            local_addr,
            router: router(state),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until the process ends.
    pub async fn serve(self) -> io::Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    pub fn spawn(self) -> ServerHandle {
        let local_addr = self.local_addr;
        ServerHandle {
            local_addr,
            task: tokio::spawn(self.serve()),
        }
    }
}

pub struct ServerHandle {
    local_addr: SocketAddr,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections. Requests already being handled are not
    /// drained or waited for.
    pub async fn stop(self) {
        self.task.abort();
        if let Ok(Err(err)) = self.task.await {
            tracing::warn!("server stopped with error: {err}");
        }
    }
}
