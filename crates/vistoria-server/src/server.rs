use crate::{Error, Result};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Static file server bound to loopback, serving the application under test.
#[derive(Debug)]
pub struct StaticServer {
    root: PathBuf,
    listener: TcpListener,
}

impl StaticServer {
    /// Bind to `127.0.0.1:port` (0 for an ephemeral port). The server is
    /// ready to accept as soon as this returns.
    pub async fn bind(root: PathBuf, port: u16) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::Server(format!(
                "document root is not a directory: {}",
                root.display()
            )));
        }
        let addr: SocketAddr = ([127, 0, 0, 1], port).into();
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(
            "Static server listening on http://{} serving {}",
            listener.local_addr()?,
            root.display()
        );
        Ok(Self { root, listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop until the shutdown future completes.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Static server shutting down");
                    break;
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    let root = self.root.clone();
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service =
                            service_fn(move |req| respond(root.clone(), req));
                        if let Err(e) = hyper::server::conn::http1::Builder::new()
                            .serve_connection(io, service)
                            .await
                        {
                            tracing::debug!("Connection error from {}: {}", peer, e);
                        }
                    });
                }
            }
        }
        Ok(())
    }

    /// Run in the background, returning a handle for explicit termination.
    pub fn spawn(self) -> Result<StaticServerHandle> {
        let addr = self.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            self.run_until(async {
                let _ = shutdown_rx.await;
            })
            .await
        });
        Ok(StaticServerHandle {
            addr,
            shutdown_tx,
            task,
        })
    }
}

/// Handle to a background [`StaticServer`]; dropping it without calling
/// [`StaticServerHandle::shutdown`] aborts the server task.
pub struct StaticServerHandle {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<Result<()>>,
}

impl StaticServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        self.task
            .await
            .map_err(|e| Error::Server(format!("server task panicked: {}", e)))?
    }
}

async fn respond(
    root: PathBuf,
    req: Request<hyper::body::Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, std::convert::Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if method != Method::GET && method != Method::HEAD {
        return Ok(status_response(StatusCode::METHOD_NOT_ALLOWED));
    }

    let Some(file_path) = resolve_path(&root, &path) else {
        tracing::debug!("{} {} -> 404 (rejected path)", method, path);
        return Ok(status_response(StatusCode::NOT_FOUND));
    };

    match tokio::fs::read(&file_path).await {
        Ok(contents) => {
            tracing::debug!("{} {} -> 200 ({} bytes)", method, path, contents.len());
            let body = if method == Method::HEAD {
                Bytes::new()
            } else {
                Bytes::from(contents)
            };
            let response = Response::builder()
                .status(StatusCode::OK)
                .header(hyper::header::CONTENT_TYPE, content_type(&file_path))
                .body(Full::new(body));
            Ok(response.unwrap_or_else(|_| status_response(StatusCode::INTERNAL_SERVER_ERROR)))
        }
        Err(e) => {
            tracing::debug!("{} {} -> 404 ({})", method, path, e);
            Ok(status_response(StatusCode::NOT_FOUND))
        }
    }
}

fn status_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(
        status.canonical_reason().unwrap_or("error").to_string(),
    )));
    *response.status_mut() = status;
    response
}

/// Map a request path to a file under the root, refusing anything that
/// would escape it. Directory paths fall through to their `index.html`.
fn resolve_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');
    let relative = Path::new(trimmed);

    for component in relative.components() {
        match component {
            Component::Normal(_) => {}
            _ => return None,
        }
    }

    let mut path = root.join(relative);
    if trimmed.is_empty() || path.is_dir() {
        path = path.join("index.html");
    }
    Some(path)
}

/// Extension-based content type, enough for the static app bundles the
/// scenarios load.
fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => mime::TEXT_HTML_UTF_8.as_ref(),
        Some("js") | Some("mjs") => "text/javascript",
        Some("css") => mime::TEXT_CSS.as_ref(),
        Some("json") => mime::APPLICATION_JSON.as_ref(),
        Some("png") => mime::IMAGE_PNG.as_ref(),
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG.as_ref(),
        Some("svg") => mime::IMAGE_SVG.as_ref(),
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        _ => mime::APPLICATION_OCTET_STREAM.as_ref(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_resolve_path_maps_into_root() {
        let root = Path::new("/srv/app");
        assert_eq!(
            resolve_path(root, "/index.html"),
            Some(PathBuf::from("/srv/app/index.html"))
        );
        assert_eq!(
            resolve_path(root, "/js/relatorios.js"),
            Some(PathBuf::from("/srv/app/js/relatorios.js"))
        );
    }

    #[test]
    fn test_resolve_path_rejects_traversal() {
        let root = Path::new("/srv/app");
        assert_eq!(resolve_path(root, "/../etc/passwd"), None);
        assert_eq!(resolve_path(root, "/a/../../etc/passwd"), None);
    }

    #[test]
    fn test_root_path_serves_index() {
        let root = Path::new("/srv/app");
        assert_eq!(
            resolve_path(root, "/"),
            Some(PathBuf::from("/srv/app/index.html"))
        );
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type(Path::new("index.html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("app.js")), "text/javascript");
        assert_eq!(content_type(Path::new("shot.png")), "image/png");
        assert_eq!(content_type(Path::new("blob.bin")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_server_serves_file_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Painel</h1>").unwrap();

        let server = StaticServer::bind(dir.path().to_path_buf(), 0).await.unwrap();
        let handle = server.spawn().unwrap();
        let addr = handle.addr();

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /index.html HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        let response = String::from_utf8_lossy(&response);

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("text/html"));
        assert!(response.contains("<h1>Painel</h1>"));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let server = StaticServer::bind(dir.path().to_path_buf(), 0).await.unwrap();
        let handle = server.spawn().unwrap();

        let mut stream = tokio::net::TcpStream::connect(handle.addr()).await.unwrap();
        stream
            .write_all(b"GET /nope.html HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();

        assert!(String::from_utf8_lossy(&response).starts_with("HTTP/1.1 404"));
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_rejects_missing_root() {
        let err = StaticServer::bind(PathBuf::from("/definitely/not/here"), 0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
