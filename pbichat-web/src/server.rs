//! Pbichat Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Main chat web server
pub struct ChatServer {
    config: WebConfig,
    state: AppState,
}

impl ChatServer {
    /// Create a new chat server
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let state = AppState::new(config.clone()).await?;

        Ok(Self { config, state })
    }

    /// Start the web server
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!("🚀 Starting Pbichat Web Server");
        info!("📍 Server address: http://{}", address);

        let app = create_app(self.state.clone());

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("✅ Server listening on http://{}", address);

        if let Err(e) = serve(listener, app).await {
            error!("❌ Server error: {}", e);
            return Err(WebError::Server(e));
        }

        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Builder for ChatServer
pub struct ChatServerBuilder {
    config: WebConfig,
}

impl ChatServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self {
            config: WebConfig::default(),
        }
    }

    /// Set the server host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the service config file path
    pub fn config_path<S: Into<String>>(mut self, config_path: S) -> Self {
        self.config.config_path = Some(config_path.into());
        self
    }

    /// Build the server
    pub async fn build(self) -> WebResult<ChatServer> {
        ChatServer::new(self.config).await
    }
}

impl Default for ChatServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to start a server with default configuration
pub async fn start_server() -> WebResult<()> {
    let config = WebConfig::from_env();
    let server = ChatServer::new(config).await?;
    server.start().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let builder = ChatServerBuilder::new()
            .host("0.0.0.0")
            .port(9000)
            .config_path("pbichat.toml");

        assert_eq!(builder.config.host, "0.0.0.0");
        assert_eq!(builder.config.port, 9000);
        assert_eq!(builder.config.config_path.as_deref(), Some("pbichat.toml"));
        assert_eq!(builder.config.address(), "0.0.0.0:9000");
    }
}
