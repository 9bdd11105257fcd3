//! Static-asset fallback.
//!
//! Requests that match no declared route, or whose method a route does not
//! declare, may still name a file under the asset prefix. Those are read from
//! disk and returned as-is. No pipeline runs for them.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use http::StatusCode;
use tracing::error;

use crate::config::AssetsConfig;
use crate::method::Method;
use crate::response::{ContentType, Response};

#[derive(Clone, Debug)]
pub(crate) struct Assets {
    folder: PathBuf,
    prefix: String,
}

impl Assets {
    pub(crate) fn new(config: &AssetsConfig) -> Self {
        Self { folder: config.folder.clone(), prefix: config.prefix() }
    }

    /// Whether this request is the asset handler's to answer.
    pub(crate) fn claims(&self, method: Method, path: &str) -> bool {
        matches!(method, Method::Get | Method::Head) && path.starts_with(&self.prefix)
    }

    /// Serves the file named by `path`. Call only after [`claims`](Self::claims).
    pub(crate) async fn serve(&self, path: &str) -> Response {
        let Some(file) = self.resolve(path) else {
            return Response::status(StatusCode::NOT_FOUND);
        };

        match tokio::fs::read(&file).await {
            Ok(bytes) => {
                let content_type = file.extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(ContentType::OctetStream, ContentType::from_extension);
                // hyper drops the body itself when answering HEAD.
                Response::builder().bytes(content_type, bytes)
            }
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
                Response::status(StatusCode::NOT_FOUND)
            }
            Err(e) => {
                error!(file = %file.display(), "asset read failed: {e}");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Maps a URL path to a file under the asset folder. Rejects anything
    /// that is not a plain relative path (`..`, absolute, drive prefixes).
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.strip_prefix(&self.prefix)?);
        if relative.as_os_str().is_empty()
            || !relative.components().all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.folder.join(relative))
    }
}
