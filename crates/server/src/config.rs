use crate::fs::UiRoot;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding a built UI. Static serving is off when unset.
    pub ui_dir: Option<PathBuf>,
    pub index_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
            ui_dir: None,
            index_file: "index.html".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn set_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    pub fn set_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn set_ui_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.ui_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn ui_root(&self) -> Option<UiRoot> {
        self.ui_dir
            .as_ref()
            .map(|dir| UiRoot::new(dir.clone(), self.index_file.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.addr(), "localhost:3000");
        assert!(cfg.ui_root().is_none());
    }

    #[test]
    fn setters_chain() {
        let cfg = ServerConfig::default()
            .set_host("0.0.0.0")
            .set_port(8080)
            .set_ui_dir("dist-ui");
        assert_eq!(cfg.addr(), "0.0.0.0:8080");
        assert_eq!(cfg.ui_root().unwrap().index_path(), PathBuf::from("dist-ui/index.html"));
    }
}
