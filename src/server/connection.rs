use crate::upstream::{MockRequest, Responder};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioIo, TokioTimer};
use log::debug;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

/// How long a caller gets to deliver a complete request head.
pub const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP/1.1 connection settings shared by upstream and metrics listeners.
pub fn http1_builder(header_read_timeout: Duration) -> http1::Builder {
    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(header_read_timeout);
    builder
}

/// Serves one accepted connection with the instance's responder.
///
/// hyper drops the in-flight `handle` future when the caller closes the
/// connection, which is what abandons a pending delay.
pub async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    responder: Arc<Responder>,
    header_read_timeout: Duration,
) {
    let upstream = responder.upstream().to_string();

    let service = service_fn(move |request: Request<Incoming>| {
        let responder = responder.clone();
        let request = MockRequest::new(request.method().clone(), request.uri().path());
        async move { Ok::<_, Infallible>(responder.handle(&request).await.into_http()) }
    });

    if let Err(e) = http1_builder(header_read_timeout)
        .serve_connection(TokioIo::new(stream), service)
        .await
    {
        debug!("[{}] connection from {} ended: {}", upstream, peer, e);
    }
}
