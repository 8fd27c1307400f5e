use std::io;

use fabric_topsis_mcp::{log_filter_from_env, DecisionServer, DEFAULT_LOG_FILTER};
use tracing_subscriber::EnvFilter;

fn main() -> io::Result<()> {
    let filter = EnvFilter::try_new(log_filter_from_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    let server = DecisionServer::new().map_err(io::Error::other)?;
    server.serve_stdio()
}
