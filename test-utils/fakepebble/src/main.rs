use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Minimal `pebble run` stand-in for fixture end-to-end tests.
///
/// Listens on the `--http` address and answers `GET /v1/health` the way
/// Pebble does. Runs until killed unless `--exit-after` is given.
#[derive(Parser, Debug)]
#[command(name = "fakepebble")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the daemon
    Run {
        /// Address to listen on, e.g. ":4000" or "127.0.0.1:4000"
        #[arg(long)]
        http: String,

        /// Create $PEBBLE if it is missing
        #[arg(long)]
        create_dirs: bool,

        /// Exit with this code after the given number of milliseconds
        #[arg(long, value_name = "MS")]
        exit_after: Option<u64>,

        #[arg(long, default_value = "0")]
        exit_code: i32,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let Command::Run {
        http,
        create_dirs,
        exit_after,
        exit_code,
    } = Cli::parse().command;

    if create_dirs {
        if let Some(dir) = std::env::var_os("PEBBLE").map(PathBuf::from) {
            if let Err(e) = std::fs::create_dir_all(&dir) {
                error!("Cannot create {}: {}", dir.display(), e);
                std::process::exit(1);
            }
        }
    }

    let addr = if http.starts_with(':') {
        format!("0.0.0.0{}", http)
    } else {
        http
    };
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Cannot listen on {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("fakepebble {} listening on {}", std::process::id(), addr);

    if let Some(ms) = exit_after {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            info!("Exiting with code {}", exit_code);
            std::process::exit(exit_code);
        });
    }

    serve(listener).await;
}

async fn serve(listener: tokio::net::TcpListener) {
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper_util::rt::TokioIo;

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        tokio::spawn(async move {
            let service = service_fn(|req| async move { Ok::<_, hyper::Error>(respond(&req)) });
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!("Error serving connection: {}", e);
            }
        });
    }
}

fn respond<B>(
    req: &hyper::Request<B>,
) -> hyper::Response<http_body_util::Full<hyper::body::Bytes>> {
    use hyper::{Method, StatusCode};
    use serde_json::json;

    let (status, body) = match (req.method(), req.uri().path()) {
        (&Method::GET, "/v1/health") => (
            StatusCode::OK,
            json!({
                "type": "sync",
                "status-code": 200,
                "status": "OK",
                "result": { "healthy": true },
            }),
        ),
        _ => (
            StatusCode::NOT_FOUND,
            json!({
                "type": "error",
                "status-code": 404,
                "status": "Not Found",
                "result": { "message": "not found" },
            }),
        ),
    };

    let mut response = hyper::Response::new(http_body_util::Full::new(hyper::body::Bytes::from(
        body.to_string(),
    )));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}
