//! # proxy-server
//!
//! HTTP server for the SAML discovery proxy.
//!
//! To Service Providers the proxy is one SAML IdP; to university IdPs it is
//! an SP. In between, the user picks a university on the discovery page.
//!
//! ## Flow
//!
//! 1. SP sends an AuthnRequest to `/saml/sso`; a session is created.
//! 2. The user searches for and selects a university at `/discovery`.
//! 3. `/sp/initiate` sends a signed AuthnRequest to the university.
//! 4. The university posts its Response to `/sp/acs`, where it is
//!    validated and re-signed for the SP.
//!
//! ## Usage
//!
//! ```ignore
//! use proxy_server::{ProxyConfig, Server};
//!
//! let config = ProxyConfig::from_env()?;
//! Server::new(config).run().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attributes;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::ProxyConfig;
pub use error::{AppError, AppResult};
pub use router::app;
pub use state::AppState;

use tokio::net::TcpListener;

/// The discovery proxy server.
pub struct Server {
    config: ProxyConfig,
}

impl Server {
    /// Creates a new server instance.
    #[must_use]
    pub const fn new(config: ProxyConfig) -> Self {
        Self { config }
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Runs the server.
    ///
    /// Starts the background tasks, then serves until a shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.bind_address();
        let state = AppState::new(self.config)?;

        tokio::spawn(proxy_session::session_cleanup_task(state.sessions.clone()));
        tokio::spawn(proxy_discovery::federation_index_task(
            state.federation_index.clone(),
        ));

        let app = app(state);

        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
