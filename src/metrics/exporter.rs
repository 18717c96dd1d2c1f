use super::MetricsCollector;
use crate::error::{MockError, Result};
use crate::server::{http1_builder, HEADER_READ_TIMEOUT};
use crate::upstream::MockResponse;
use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use log::{debug, error};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

const EXPOSITION: &str = "text/plain; version=0.0.4";

/// Serves `GET /metrics` on its own listener, apart from every upstream.
pub struct MetricsExporter {
    listener: TcpListener,
    local_addr: SocketAddr,
    collector: Arc<MetricsCollector>,
}

impl MetricsExporter {
    pub async fn bind(addr: SocketAddr, collector: Arc<MetricsCollector>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| MockError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            local_addr,
            collector,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn serve(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    tokio::spawn(serve_scrapes(stream, peer, self.collector.clone()));
                }
                Err(e) => {
                    error!("metrics connection error: {}", e);
                }
            }
        }
    }
}

async fn serve_scrapes(stream: TcpStream, peer: SocketAddr, collector: Arc<MetricsCollector>) {
    let service = service_fn(move |request: Request<Incoming>| {
        let response = scrape(&request, &collector);
        async move { Ok::<_, Infallible>(response.into_http()) }
    });

    if let Err(e) = http1_builder(HEADER_READ_TIMEOUT)
        .serve_connection(TokioIo::new(stream), service)
        .await
    {
        debug!("metrics connection from {} ended: {}", peer, e);
    }
}

fn scrape<B>(request: &Request<B>, collector: &MetricsCollector) -> MockResponse {
    if request.uri().path() != "/metrics" || *request.method() != Method::GET {
        return MockResponse::not_found();
    }

    match collector.render() {
        Ok(text) => MockResponse::new(StatusCode::OK)
            .header(CONTENT_TYPE, EXPOSITION)
            .body(text),
        Err(e) => {
            error!("failed to render metrics: {}", e);
            MockResponse::new(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::Outcome;
    use std::time::Duration;

    #[test]
    fn test_scrape_only_answers_get_metrics() {
        let collector = MetricsCollector::new().unwrap();

        let get = Request::get("/metrics").body(()).unwrap();
        assert_eq!(scrape(&get, &collector).status(), StatusCode::OK);
        assert_eq!(
            scrape(&get, &collector).header_value("content-type"),
            Some(EXPOSITION)
        );

        let post = Request::post("/metrics").body(()).unwrap();
        assert_eq!(scrape(&post, &collector).status(), StatusCode::NOT_FOUND);

        let other = Request::get("/ping").body(()).unwrap();
        assert_eq!(scrape(&other, &collector).status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_scrape_metrics() {
        let collector = Arc::new(MetricsCollector::new().unwrap());
        collector
            .for_upstream("scraped")
            .record(Outcome::Responded, Duration::from_millis(5));

        let exporter = MetricsExporter::bind("127.0.0.1:0".parse().unwrap(), collector)
            .await
            .unwrap();
        let addr = exporter.local_addr();
        tokio::spawn(exporter.serve());

        let client = reqwest::Client::builder().no_proxy().build().unwrap();

        let response = client
            .get(format!("http://{}/metrics", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = response.text().await.unwrap();
        assert!(text.contains(r#"outcome="responded",upstream="scraped""#));

        let response = client
            .get(format!("http://{}/ping", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
