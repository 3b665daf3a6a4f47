//! Canned Pebble responses over a Unix socket, for unit tests.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::UnixListener;

/// Serve the same response to every request, recording request URIs.
pub(crate) async fn serve(
    socket: PathBuf,
    content_type: &'static str,
    body: &'static [u8],
    status: u16,
) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let listener = UnixListener::bind(&socket).unwrap();
    let recorded = seen.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let recorded = recorded.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    recorded.lock().unwrap().push(req.uri().to_string());
                    async move {
                        Ok::<_, hyper::Error>(
                            Response::builder()
                                .status(status)
                                .header(CONTENT_TYPE, content_type)
                                .body(Full::new(Bytes::from_static(body)))
                                .unwrap(),
                        )
                    }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });
    seen
}
