pub mod config;
pub mod cors;
pub mod error;
pub mod fs;
pub mod http;
pub mod router;

pub use config::ServerConfig;
pub use error::ApiError;
pub use http::HttpServer;
pub use router::router;
