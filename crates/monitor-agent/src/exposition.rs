// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP endpoint that serves the gauges in the Prometheus text format.
//!
//! The server lives on its own OS thread with a single-threaded runtime so a
//! slow scrape never delays the update loop. Both sides only meet through the
//! shared [`prometheus::Registry`].

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::thread;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::service::service_fn;
use hyper::{http, Method, Request, Response, StatusCode};
use monitor_core::MonitorError;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::runtime::Runtime;
use tracing::{debug, error};

pub const METRICS_ENDPOINT_PATH: &str = "/metrics";
const EXPOSITION_THREAD_NAME: &str = "exposition";

pub struct ExpositionServer {
    listener: TcpListener,
    registry: Registry,
}

impl ExpositionServer {
    /// Binds the listening socket right away, so an address already in use is
    /// reported before anything else starts.
    pub fn bind(addr: &str, registry: Registry) -> Result<Self, MonitorError> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| MonitorError::ExpositionStart(format!("failed to bind {addr}: {e}")))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| MonitorError::ExpositionStart(format!("failed to configure {addr}: {e}")))?;
        Ok(Self { listener, registry })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Starts serving on the `exposition` thread.
    pub fn spawn(self) -> Result<thread::JoinHandle<()>, MonitorError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| MonitorError::ExpositionStart(e.to_string()))?;

        thread::Builder::new()
            .name(EXPOSITION_THREAD_NAME.to_string())
            .spawn(move || self.run(runtime))
            .map_err(|e| MonitorError::ExpositionStart(e.to_string()))
    }

    fn run(self, runtime: Runtime) {
        let Self { listener, registry } = self;
        if let Err(e) = runtime.block_on(serve_tcp(listener, registry)) {
            error!("Exposition server stopped: {e}");
        }
    }
}

async fn serve_tcp(
    listener: TcpListener,
    registry: Registry,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::from_std(listener)?;
    debug!("Exposition server listening on {}", listener.local_addr()?);

    let server = hyper::server::conn::http1::Builder::new();
    let mut joinset = tokio::task::JoinSet::new();

    loop {
        let conn = tokio::select! {
            con_res = listener.accept() => match con_res {
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::ConnectionAborted
                            | io::ErrorKind::ConnectionReset
                            | io::ErrorKind::ConnectionRefused
                    ) =>
                {
                    continue;
                }
                Err(e) => {
                    error!("Server error: {e}");
                    return Err(e.into());
                }
                Ok((conn, _)) => conn,
            },
            finished = async {
                match joinset.join_next().await {
                    Some(finished) => finished,
                    None => std::future::pending().await,
                }
            } => match finished {
                Err(e) if e.is_panic() => {
                    error!("Connection handler panicked: {:?}", e);
                    continue;
                },
                Ok(()) | Err(_) => continue,
            },
        };

        let conn = hyper_util::rt::TokioIo::new(conn);
        let server = server.clone();
        let registry = registry.clone();
        let service = service_fn(move |req| {
            let response = handle_request(&req, &registry);
            async move { response }
        });
        joinset.spawn(async move {
            if let Err(e) = server.serve_connection(conn, service).await {
                error!("Connection error: {e}");
            }
        });
    }
}

/// Routes one request: `GET /metrics` renders the registry, anything else is
/// a 404.
pub fn handle_request<B>(
    req: &Request<B>,
    registry: &Registry,
) -> http::Result<Response<Full<Bytes>>> {
    if req.method() != Method::GET || req.uri().path() != METRICS_ENDPOINT_PATH {
        debug!("No route for {} {}", req.method(), req.uri().path());
        return Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from_static(b"Not Found\n")));
    }

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    match encoder.encode(&registry.gather(), &mut buffer) {
        Ok(()) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, encoder.format_type())
            .body(Full::new(Bytes::from(buffer))),
        Err(e) => {
            error!("Failed to encode metrics: {e}");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::from(e.to_string())))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use prometheus::Gauge;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    fn registry_with_gauge(value: f64) -> Registry {
        let registry = Registry::new();
        let gauge = Gauge::new("cpu_usage_percentage", "CPU usage in percent").unwrap();
        gauge.set(value);
        registry.register(Box::new(gauge)).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_metrics_route() {
        let registry = registry_with_gauge(42.5);
        let req = Request::get("/metrics").body(()).unwrap();

        let response = handle_request(&req, &registry).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("# TYPE cpu_usage_percentage gauge"));
        assert!(text.contains("cpu_usage_percentage 42.5"));
    }

    #[test]
    fn test_unknown_route() {
        let registry = registry_with_gauge(1.0);

        let req = Request::get("/").body(()).unwrap();
        let response = handle_request(&req, &registry).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let req = Request::post("/metrics").body(()).unwrap();
        let response = handle_request(&req, &registry).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bind_conflict_is_reported() {
        let server = ExpositionServer::bind("127.0.0.1:0", Registry::new()).unwrap();
        let addr = server.local_addr().unwrap().to_string();

        let err = ExpositionServer::bind(&addr, Registry::new()).err().unwrap();
        assert!(matches!(err, MonitorError::ExpositionStart(_)));
        assert!(err.is_startup_fatal());
    }

    #[test]
    fn test_serves_scrapes_from_own_thread() {
        let registry = registry_with_gauge(7.0);
        let server = ExpositionServer::bind("127.0.0.1:0", registry).unwrap();
        let addr = server.local_addr().unwrap();
        let handle = server.spawn().unwrap();
        assert_eq!(handle.thread().name(), Some("exposition"));

        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("cpu_usage_percentage 7"));
    }
}
