use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// A file read from the UI directory.
#[derive(Debug)]
pub struct StaticFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

#[derive(Clone, Debug)]
pub struct UiRoot {
    root: PathBuf,
    index_file: String,
}

impl UiRoot {
    /// `root` is the built UI directory and `index_file` the document served
    /// for `/` and for directories (e.g. "index.html").
    pub fn new(root: PathBuf, index_file: String) -> Self {
        Self { root, index_file }
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(&self.index_file)
    }

    /// Map a request path onto the UI directory. Returns `None` when the
    /// path would step outside it.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let rel = Path::new(request_path.trim_start_matches('/'));
        if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.root.join(rel))
    }

    /// Read the file behind `request_path`; `Ok(None)` when there is none.
    pub async fn read(&self, request_path: &str) -> io::Result<Option<StaticFile>> {
        let Some(mut path) = self.resolve(request_path) else {
            return Ok(None);
        };
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => path.push(&self.index_file),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        }
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(StaticFile {
                bytes,
                content_type: content_type(&path),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") | Some("map") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("wasm") => "application/wasm",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
