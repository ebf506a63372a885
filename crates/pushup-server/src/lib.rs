//! Pushup Player Web Server - Axum transport
//!
//! Exposes the player's resources over HTTP so a referee can reach them:
//! commands go to a dedicated control thread that owns the
//! [`ControlSurface`], count changes fan out to WebSocket observers through
//! a broadcast channel.

pub mod api;
pub mod ws;

use axum::http::{header, HeaderValue};
use axum::Router;
use pushup_core::stats::store::ScoreHistory;
use pushup_core::{CommandError, ControlStatus, ControlSurface, NotificationSink, Response};
use std::future::Future;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, oneshot};
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

/// Requests sent to the control thread
pub enum ControlRequest {
    Dispatch {
        resource: String,
        payload: Vec<u8>,
        reply: oneshot::Sender<Result<Response, CommandError>>,
    },
    Status {
        reply: oneshot::Sender<ControlStatus>,
    },
    History {
        reply: oneshot::Sender<ScoreHistory>,
    },
}

/// Handle to communicate with the control thread
///
/// The thread handles one request at a time, which serializes every command
/// reaching the control surface. It exits once the last handle is dropped,
/// stopping the surface's background loops on the way out.
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlRequest>,
}

impl ControlHandle {
    /// Move the control surface onto a dedicated thread and return a handle
    pub fn spawn(surface: ControlSurface) -> std::io::Result<Self> {
        let (tx, mut rx) = mpsc::channel::<ControlRequest>(32);

        std::thread::Builder::new()
            .name("pushup-control".to_string())
            .spawn(move || {
                while let Some(request) = rx.blocking_recv() {
                    match request {
                        ControlRequest::Dispatch {
                            resource,
                            payload,
                            reply,
                        } => {
                            let _ = reply.send(surface.dispatch(&resource, &payload));
                        }
                        ControlRequest::Status { reply } => {
                            let _ = reply.send(surface.status());
                        }
                        ControlRequest::History { reply } => {
                            let _ = reply.send(surface.session().history());
                        }
                    }
                }
                tracing::debug!("Control thread exiting");
            })?;

        Ok(Self { tx })
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ControlRequest,
    ) -> anyhow::Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| anyhow::anyhow!("Control thread died"))?;
        rx.await.map_err(|_| anyhow::anyhow!("Control thread died"))
    }

    /// Forward a raw request for `resource`
    ///
    /// The outer error means the control thread is gone; the inner one is
    /// the command being rejected.
    pub async fn dispatch(
        &self,
        resource: &str,
        payload: Vec<u8>,
    ) -> anyhow::Result<Result<Response, CommandError>> {
        let resource = resource.to_string();
        self.request(|reply| ControlRequest::Dispatch {
            resource,
            payload,
            reply,
        })
        .await
    }

    pub async fn status(&self) -> anyhow::Result<ControlStatus> {
        self.request(|reply| ControlRequest::Status { reply }).await
    }

    pub async fn history(&self) -> anyhow::Result<ScoreHistory> {
        self.request(|reply| ControlRequest::History { reply }).await
    }
}

/// Notification sink publishing counts on a broadcast channel
#[derive(Clone, Debug)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<u32>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn sender(&self) -> broadcast::Sender<u32> {
        self.tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<u32> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl NotificationSink for BroadcastNotifier {
    fn notify(&self, count: u32) {
        // No observers is fine
        if self.tx.send(count).is_err() {
            tracing::trace!(count, "Count not delivered, no observers");
        }
    }
}

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    /// Handle to the control thread
    pub control: ControlHandle,
    /// Count notifications for observers
    pub count_tx: broadcast::Sender<u32>,
    /// Server configuration
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(control: ControlHandle, notifier: &BroadcastNotifier, config: ServerConfig) -> Self {
        Self {
            control,
            count_tx: notifier.sender(),
            config,
        }
    }
}

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Bind address
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5683,
            bind_addr: "0.0.0.0".to_string(),
        }
    }
}

/// Build the Axum router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Player resources
        .route("/.well-known/core", axum::routing::get(api::well_known_core))
        .route("/assign_color", axum::routing::put(api::assign_color))
        .route("/count", axum::routing::get(api::get_count))
        .route("/count/observe", axum::routing::get(ws::observe_handler))
        .route("/{resource}", axum::routing::post(api::post_command))
        // Status API
        .route("/api/v1/status", axum::routing::get(api::get_status))
        .route("/api/v1/history", axum::routing::get(api::get_history))
        .layer(CorsLayer::permissive())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Start the web server on the configured address
pub async fn start_server(
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.bind_addr, state.config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Pushup player listening");

    serve(listener, state, shutdown).await?;
    tracing::info!("Pushup player server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5683);
        assert_eq!(config.bind_addr, "0.0.0.0");
    }

    #[test]
    fn test_broadcast_notifier_without_observers() {
        let notifier = BroadcastNotifier::default();
        notifier.notify(7);
    }

    #[test]
    fn test_broadcast_notifier_delivers() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe();
        notifier.notify(1);
        notifier.notify(2);
        assert_eq!(rx.try_recv(), Ok(1));
        assert_eq!(rx.try_recv(), Ok(2));
    }
}
