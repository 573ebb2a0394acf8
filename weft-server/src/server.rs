//! Bare HTTP/1.1 server for the mock site.
//!
//! Serves one request per connection. Graph pages render as HTML; the
//! observer metrics are exposed as JSON under `/observer/`.

use crate::error::{Result, ServerError};
use crate::render::render_page;
use crate::router::GraphRouter;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use url::Url;

/// Longest request head line accepted.
const MAX_LINE_LEN: usize = 8 * 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

/// A response ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    pub fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body,
        }
    }

    pub fn json(body: String) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body,
        }
    }

    fn error(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: format!("{} {}\n", status, reason(status)),
        }
    }

    pub fn not_found() -> Self {
        Self::error(404)
    }

    /// Serializes status line, headers and body.
    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            reason(self.status),
            self.content_type,
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Internal Server Error",
    }
}

/// The mock website.
pub struct MockSiteServer {
    config: ServerConfig,
    router: Arc<GraphRouter>,
}

impl MockSiteServer {
    /// Creates a new server serving the router's graph.
    pub fn new(router: Arc<GraphRouter>, config: ServerConfig) -> Self {
        Self { config, router }
    }

    /// Returns a handle to the router for syncing.
    pub fn router(&self) -> Arc<GraphRouter> {
        self.router.clone()
    }

    /// Binds the configured address and serves forever.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.addr).await?;
        info!("Mock site listening on {}", listener.local_addr()?);
        self.serve(listener).await
    }

    /// Accepts connections on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("New connection from {}", addr);
                    let router = self.router.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, router).await {
                            error!("Connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Reads one request head, answers it and closes the connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    router: Arc<GraphRouter>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    serve_request(&mut reader, &mut writer, addr, &router).await?;
    writer.shutdown().await?;
    Ok(())
}

/// Answers the request read from `reader`. A head that cannot be read
/// within the line limit gets a 400.
async fn serve_request<R, W>(
    reader: &mut R,
    writer: &mut W,
    addr: SocketAddr,
    router: &GraphRouter,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let response = match read_head(reader).await {
        Ok(Some(request_line)) => {
            let response = match parse_request_line(&request_line) {
                Ok((method, target)) => {
                    respond(router, method, target, &addr.ip().to_string()).await
                }
                Err(e) => {
                    warn!("Bad request from {}: {}", addr, e);
                    HttpResponse::error(400)
                }
            };
            debug!("{} {} -> {}", addr, request_line.trim_end(), response.status);
            response
        }
        Ok(None) => return Ok(()),
        Err(ServerError::BadRequest(reason)) => {
            warn!("Bad request from {}: {}", addr, reason);
            HttpResponse::error(400)
        }
        Err(e) => return Err(e),
    };

    writer.write_all(&response.to_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads up to and including the next newline, never buffering more than
/// `MAX_LINE_LEN + 1` bytes. Returns `None` at end of stream.
async fn read_line_capped<R>(reader: &mut R, what: &str) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = (&mut *reader)
        .take(MAX_LINE_LEN as u64 + 1)
        .read_until(b'\n', &mut line)
        .await?;
    if read == 0 {
        return Ok(None);
    }
    if line.len() > MAX_LINE_LEN {
        return Err(ServerError::BadRequest(format!("{} too long", what)));
    }
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

/// Returns the request line, skipping the headers that follow it.
async fn read_head<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let Some(request_line) = read_line_capped(reader, "request line").await? else {
        return Ok(None);
    };

    while let Some(header) = read_line_capped(reader, "header line").await? {
        if header.trim_end().is_empty() {
            break;
        }
    }

    Ok(Some(request_line))
}

fn parse_request_line(line: &str) -> Result<(&str, &str)> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(target), Some(version)) if version.starts_with("HTTP/") => {
            Ok((method, target))
        }
        _ => Err(ServerError::BadRequest(format!(
            "invalid request line: {:?}",
            line.trim_end()
        ))),
    }
}

/// Answers a single request.
pub async fn respond(
    router: &GraphRouter,
    method: &str,
    target: &str,
    remote_address: &str,
) -> HttpResponse {
    if method != "GET" {
        return HttpResponse::error(405);
    }

    // Only origin-form targets. `//host/x` would otherwise join as a
    // network path and lose its host part.
    if !target.starts_with('/') || target.starts_with("//") {
        return HttpResponse::error(400);
    }

    let url = match Url::parse("http://localhost/").and_then(|base| base.join(target)) {
        Ok(url) => url,
        Err(_) => return HttpResponse::error(400),
    };

    match url.path() {
        "/observer/freshness" | "/observer/age" => observer_metric(router, &url, remote_address).await,
        path => match router.visit(path, remote_address).await {
            Some(view) => HttpResponse::html(render_page(&view)),
            None => HttpResponse::not_found(),
        },
    }
}

/// Point-in-time metric for `?ip=`, defaulting to the caller's address.
async fn observer_metric(router: &GraphRouter, url: &Url, remote_address: &str) -> HttpResponse {
    let Some(observer) = router.observer() else {
        return HttpResponse::not_found();
    };

    let ip = url
        .query_pairs()
        .find(|(key, _)| key == "ip")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| remote_address.to_string());
    let at = Utc::now();

    let body = if url.path() == "/observer/age" {
        let age = observer.age(&ip, at).await;
        serde_json::json!({
            "ip": ip,
            "at": at,
            "age_seconds": age.num_milliseconds() as f64 / 1000.0,
        })
    } else {
        serde_json::json!({
            "ip": ip,
            "at": at,
            "freshness": observer.freshness(&ip, at).await,
        })
    };

    HttpResponse::json(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::RwLock;
    use weft_core::{PageKind, WebGraph};
    use weft_observer::Observer;

    async fn router(observer: Option<Arc<Observer>>) -> Arc<GraphRouter> {
        let mut graph = WebGraph::new(PageKind::Hub);
        let root = graph.root();
        graph.add_child(root, PageKind::Authority).unwrap();
        let graph = Arc::new(RwLock::new(graph));
        Arc::new(GraphRouter::new(graph, root, observer).await.unwrap())
    }

    #[test]
    fn test_parse_request_line() {
        assert_eq!(
            parse_request_line("GET /a/b?x=1 HTTP/1.1\r\n").unwrap(),
            ("GET", "/a/b?x=1")
        );
        assert!(parse_request_line("garbage\r\n").is_err());
        assert!(parse_request_line("GET / SMTP\r\n").is_err());
    }

    #[test]
    fn test_response_bytes() {
        let bytes = HttpResponse::json("{}".to_string()).to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(text.ends_with("\r\n\r\n{}"));
    }

    #[tokio::test]
    async fn test_respond_serves_pages() {
        let router = router(None).await;

        let response = respond(&router, "GET", "/", "10.0.0.1").await;
        assert_eq!(response.status, 200);
        assert!(response.body.contains("<ul>"));

        let response = respond(&router, "GET", "/missing", "10.0.0.1").await;
        assert_eq!(response.status, 404);

        let response = respond(&router, "POST", "/", "10.0.0.1").await;
        assert_eq!(response.status, 405);
    }

    #[tokio::test]
    async fn test_respond_ignores_query_for_pages() {
        let router = router(None).await;
        let response = respond(&router, "GET", "/?utm=1", "10.0.0.1").await;
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_observer_endpoints() {
        let observer = Arc::new(Observer::new());
        let router = router(Some(observer.clone())).await;

        // Let the initial node logs fall strictly before the visit.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        respond(&router, "GET", "/", "10.0.0.1").await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let response = respond(&router, "GET", "/observer/freshness?ip=10.0.0.1", "10.0.0.9").await;
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "application/json");
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["ip"], "10.0.0.1");
        assert_eq!(body["freshness"], 0.5);

        let response = respond(&router, "GET", "/observer/age", "10.0.0.1").await;
        let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["ip"], "10.0.0.1");
        assert!(body["age_seconds"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_observer_endpoints_need_observer() {
        let router = router(None).await;
        let response = respond(&router, "GET", "/observer/freshness?ip=1.1.1.1", "10.0.0.1").await;
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_respond_rejects_non_origin_targets() {
        let router = router(None).await;

        for target in ["//foo", "//localhost/", "http://localhost/", "*"] {
            let response = respond(&router, "GET", target, "10.0.0.1").await;
            assert_eq!(response.status, 400, "target {:?}", target);
        }

        let response = respond(&router, "GET", "/", "10.0.0.1").await;
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_read_head_stops_at_line_limit() {
        let mut request = b"GET /".to_vec();
        request.extend(std::iter::repeat(b'a').take(64 * 1024));
        request.extend_from_slice(b" HTTP/1.1\r\n\r\n");

        let mut reader: &[u8] = &request;
        let result = read_head(&mut reader).await;

        assert!(matches!(result, Err(ServerError::BadRequest(_))));
        assert_eq!(request.len() - reader.len(), MAX_LINE_LEN + 1);
    }

    #[tokio::test]
    async fn test_read_head_limits_header_lines() {
        let mut request = b"GET / HTTP/1.1\r\nX-Long: ".to_vec();
        request.extend(std::iter::repeat(b'b').take(2 * MAX_LINE_LEN));
        request.extend_from_slice(b"\r\n\r\n");

        let mut reader: &[u8] = &request;
        assert!(matches!(
            read_head(&mut reader).await,
            Err(ServerError::BadRequest(_))
        ));

        let mut reader: &[u8] = b"GET /a HTTP/1.1\r\nHost: x\r\n\r\n";
        assert_eq!(
            read_head(&mut reader).await.unwrap().as_deref(),
            Some("GET /a HTTP/1.1\r\n")
        );
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_request_line_gets_400() {
        let router = router(None).await;
        let addr = SocketAddr::from(([10, 0, 0, 1], 4000));
        let mut request = b"GET /".to_vec();
        request.extend(std::iter::repeat(b'a').take(MAX_LINE_LEN * 2));
        request.extend_from_slice(b" HTTP/1.1\r\n\r\n");

        let mut reader: &[u8] = &request;
        let mut written = Vec::new();
        serve_request(&mut reader, &mut written, addr, &router)
            .await
            .unwrap();

        let text = String::from_utf8(written).unwrap();
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn test_serves_over_tcp() {
        let server = MockSiteServer::new(router(None).await, ServerConfig::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("<!DOCTYPE html>"));
    }
}
