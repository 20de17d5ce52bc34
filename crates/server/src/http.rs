use crate::config::ServerConfig;
use axum::Router;
use std::io;
use tokio::net::TcpListener;
use tracing::info;

pub struct HttpServer {
    router: Router,
    addr: String,
}

impl HttpServer {
    pub fn new(router: Router, config: &ServerConfig) -> Self {
        Self {
            router,
            addr: config.addr(),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Serve until Ctrl-C, then let in-flight requests finish.
    pub async fn start(self) -> io::Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
