use std::{env, net::SocketAddr, path::PathBuf, process::exit};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use fina::{AppState, build_router, get_local_offset, graceful_shutdown, logging_middleware};

/// The web server for fina.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The directory to save expense attachments in.
    #[arg(long, default_value = "uploads")]
    upload_dir: PathBuf,

    /// The canonical name of the local timezone, e.g. "Pacific/Auckland".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    if get_local_offset(&args.timezone).is_none() {
        exit_with_error(format!("Invalid timezone {:?}", args.timezone));
    }

    let secret = env::var("SECRET")
        .unwrap_or_else(|_| exit_with_error("The environment variable 'SECRET' must be set"));

    let connection = Connection::open(&args.db_path).unwrap_or_else(|error| {
        exit_with_error(format!(
            "Could not open the database at {:?}: {error}",
            args.db_path
        ))
    });

    let state = AppState::new(connection, &secret, &args.timezone, args.upload_dir)
        .unwrap_or_else(|error| {
            exit_with_error(format!("Could not set up the app: {error}"))
        });

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state).layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!("HTTP server listening on {addr}");

    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        exit_with_error(format!("Server error: {error}"));
    }
}

/// Log to stdout, filtered by `RUST_LOG` with the `info` level as the default.
fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}

fn exit_with_error(message: impl AsRef<str>) -> ! {
    tracing::error!("{}", message.as_ref());
    eprintln!("\x1b[31;1m{}\x1b[0m", message.as_ref());
    exit(1);
}
