//! HTTP transport adapter for Warden.
//!
//! Decodes call envelopes from HTTP requests, hands them to the
//! [`Dispatcher`](warden_dispatch::Dispatcher), and encodes the result
//! envelope with a status code matching the failure kind.
//!
//! # Example
//!
//! ```ignore
//! use warden_server::{Server, ServerConfig};
//!
//! let objects = ObjectHost::new().with_object(Arc::new(Greeter::default()));
//! let config = ServerConfig::new().with_bind_address("127.0.0.1:7300".parse()?);
//!
//! let server = Server::new(dispatcher, objects, config);
//! server.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{DEFAULT_MAX_BODY_SIZE, ServerConfig};
pub use error::{ErrorResponse, Result, ServerError, dispatch_status};
pub use routes::{HealthResponse, ListFunctionsResponse};
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use warden_dispatch::{Dispatcher, ObjectHost};

/// The Warden HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a new server.
    pub fn new(dispatcher: Dispatcher, objects: ObjectHost, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(dispatcher, objects, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        use axum::routing::get;

        let router = Router::new()
            .merge(routes::health_routes())
            .route(
                "/rpc/{object}",
                get(routes::list_functions_handler).post(routes::call_handler),
            )
            .layer(DefaultBodyLimit::max(self.state.config.max_body_size));

        let router = if self.state.config.request_logging {
            router.layer(TraceLayer::new_for_http())
        } else {
            router
        };

        router.with_state(self.state.clone())
    }

    /// Run the server until the process is stopped.
    pub async fn run(self) -> Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Run the server until `shutdown` completes, then drain open requests.
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.state.config.bind_address;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(format!("Listener has no address: {e}")))?;
        info!(
            addr = %local_addr,
            objects = self.state.objects.len(),
            channel_protection = %self.state.config.channel_protection,
            "Starting server"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {e}")))?;

        info!("Server stopped");
        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }

    /// Get the application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}
