//! reactord: a single-process static file server.

use reactord::{Config, Reactor};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn ignore_sigpipe() {
    // SAFETY: installs the default libc disposition for a signal number;
    // no memory is touched and this runs once before any sockets exist.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    ignore_sigpipe();

    info!(
        port = config.port,
        document_root = %config.document_root.display(),
        workers = config.workers,
        max_connections = config.max_connections,
        "starting reactord"
    );

    let (mut reactor, _workers) = Reactor::bind(&config)?;
    reactor.run()?;

    Ok(())
}
