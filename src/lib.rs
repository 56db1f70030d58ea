//! A single-process static file server built on a one-shot,
//! edge-triggered reactor and a fixed worker thread pool: the reactor
//! owns all I/O readiness and the connection table, workers own request
//! parsing and response staging, and a bounded queue hands connections
//! from one to the other.

pub mod buffer;
pub mod config;
pub mod connection;
pub mod error;
pub mod parser;
pub mod queue;
pub mod reactor;
pub mod resource;
pub mod response;
pub mod sync;
pub mod worker;

pub use config::Config;
pub use reactor::Reactor;
