//! HTTP server: the transport in front of the compiled pipelines.
//!
//! # What the server owns
//!
//! The pipelines decide *what* a request gets. Everything around them lives
//! here:
//!
//! 1. Compiling the [`Router`] once, before the listener binds.
//! 2. Reading each request off the wire and finding its pipeline.
//! 3. Requests no pipeline claims: static assets, then `405` / `404`.
//! 4. Pipelines that fail: a handler `Err` or a panic becomes a bare `500`,
//!    logged, and the connection and the process carry on.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **Ctrl-C** the server stops `accept()`ing and asks every
//! open connection to close: idle keep-alive connections close at once, busy
//! ones after their in-flight request is answered. Once the last one is gone
//! [`Server::serve`] returns, which lets `main` exit cleanly.
//! [`Server::serve_with_shutdown`] does the same on a future of your choosing.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::BodyExt;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::assets::Assets;
use crate::config::{AssetsConfig, Config};
use crate::error::Error;
use crate::method::Method;
use crate::pipeline::Pipeline;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::table::PipelineTable;

/// The HTTP server.
pub struct Server {
    config: Config,
}

impl Server {
    /// ```rust,no_run
    /// use sluice::{Config, Server};
    ///
    /// let server = Server::new(Config::default().with_port(3000).without_assets());
    /// ```
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// A server configured from defaults and the `PORT` environment variable.
    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    /// Compiles `router`, binds `0.0.0.0:<port>`, and serves until SIGTERM or
    /// Ctrl-C.
    ///
    /// Fails before binding if two declared paths cannot share the lookup
    /// index (e.g. `/users/{id}` and `/users/{name}`).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Self::serve), but shuts down when `signal` resolves
    /// instead of on a process signal.
    ///
    /// ```rust,no_run
    /// # async fn run() -> Result<(), sluice::Error> {
    /// use sluice::{Config, Router, Server};
    ///
    /// let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    /// # drop(stop);
    /// Server::new(Config::default().without_assets())
    ///     .serve_with_shutdown(Router::new(), async { stopped.await.ok(); })
    ///     .await
    /// # }
    /// ```
    pub async fn serve_with_shutdown<F>(self, router: Router, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let dispatch = Dispatch::new(router.compile(), self.config.assets.as_ref())?;

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = TcpListener::bind(addr).await?;

        info!(%addr, routes = router.routes().len(), middleware = router.middlewares().len(), "sluice listening");

        accept_loop(listener, Arc::new(dispatch), signal).await;

        info!("sluice stopped");
        Ok(())
    }
}

/// Accepts connections until `signal` resolves, then closes them all.
async fn accept_loop<F>(listener: TcpListener, dispatch: Arc<Dispatch>, signal: F)
where
    F: Future<Output = ()>,
{
    let builder = ConnBuilder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    let mut tasks = tokio::task::JoinSet::new();

    tokio::pin!(signal);

    loop {
        tokio::select! {
            // Shutdown is checked first so a SIGTERM stops accepting even
            // while more connections are queued.
            biased;

            () = &mut signal => {
                info!(open = tasks.len(), "shutdown signal received, closing connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let dispatch = Arc::clone(&dispatch);

                // Called once per request on the connection.
                let svc = service_fn(move |req| {
                    let dispatch = Arc::clone(&dispatch);
                    async move { Ok::<_, Infallible>(dispatch.handle(req).await.into_inner()) }
                });

                let conn = builder.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tasks.spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            // Reap finished connection tasks so the JoinSet does not grow
            // without bound on long-running servers.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    drop(listener);
    graceful.shutdown().await;
    while tasks.join_next().await.is_some() {}
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Read-only state shared by every connection.
struct Dispatch {
    index: matchit::Router<HashMap<Method, Pipeline>>,
    assets: Option<Assets>,
}

impl Dispatch {
    fn new(table: PipelineTable, assets: Option<&AssetsConfig>) -> Result<Self, Error> {
        let mut index = matchit::Router::new();
        for (path, methods) in table.into_paths() {
            index.insert(path, methods)?;
        }
        Ok(Self { index, assets: assets.map(Assets::new) })
    }

    /// Hot path: one wire request in, one response out. Never fails.
    async fn handle<B>(&self, req: http::Request<B>) -> Response
    where
        B: hyper::body::Body,
        B::Error: Display,
    {
        match read_request(req).await {
            Ok(request) => self.respond(request).await,
            Err(response) => response,
        }
    }

    async fn respond(&self, mut request: Request) -> Response {
        let method = request.method();
        let path = request.path().to_owned();

        let allowed = match self.index.at(&path) {
            Ok(matched) => match matched.value.get(&method) {
                Some(pipeline) => {
                    let params = matched.params.iter()
                        .map(|(k, v)| (k.to_owned(), v.to_owned()))
                        .collect();
                    request.set_params(params);
                    return run(pipeline.clone(), request).await;
                }
                None => Some(allow_header(matched.value)),
            },
            Err(_) => None,
        };

        if let Some(assets) = &self.assets {
            if assets.claims(method, &path) {
                return assets.serve(&path).await;
            }
        }

        match allowed {
            Some(allow) => Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header("allow", &allow)
                .no_body(),
            None => Response::status(StatusCode::NOT_FOUND),
        }
    }
}

/// Runs `pipeline` on its own task so a panicking handler takes down only
/// its own request.
async fn run(pipeline: Pipeline, request: Request) -> Response {
    let method = request.method();
    let path = request.path().to_owned();

    match tokio::spawn(async move { pipeline.run(request).await }).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            error!(%method, path = %path, "pipeline failed: {e}");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(e) => {
            error!(%method, path = %path, "pipeline panicked: {e}");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Converts the wire request into a [`Request`], or the response to send
/// instead: `501` for a method outside [`Method`], `400` for an unreadable body.
async fn read_request<B>(req: http::Request<B>) -> Result<Request, Response>
where
    B: hyper::body::Body,
    B::Error: Display,
{
    let Ok(method) = Method::try_from(req.method()) else {
        return Err(Response::status(StatusCode::NOT_IMPLEMENTED));
    };

    let (parts, body) = req.into_parts();
    let body: Bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(%method, path = parts.uri.path(), "failed to read request body: {e}");
            return Err(Response::status(StatusCode::BAD_REQUEST));
        }
    };

    let mut request = Request::new(method, parts.uri.path()).with_body(body);
    if let Some(query) = parts.uri.query() {
        request = request.with_query(query);
    }
    // Non-UTF-8 bytes in a value become U+FFFD; the header itself is kept.
    for (name, value) in &parts.headers {
        request = request.with_header(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }
    Ok(request)
}

fn allow_header(methods: &HashMap<Method, Pipeline>) -> String {
    let mut names: Vec<Method> = methods.keys().copied().collect();
    names.sort();
    names.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C). On
/// Windows only Ctrl-C is available. A handler that cannot be installed is
/// logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => { signal.recv().await; }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
