//! The single-threaded reactor: one `mio::Poll` loop owning the listener,
//! the connection table, and `user_count`, dispatching readiness events
//! to worker threads and performing every connection close itself.
//!
//! Custody of a connection's interest is one-shot by convention rather
//! than by `EPOLLONESHOT`: after a readiness notification fires, nobody
//! re-arms that connection's interest until whichever side is currently
//! handling it (the reactor, synchronously, or a worker, once it's
//! staged a response) calls `reregister`. Edge-triggered delivery means
//! no second notification can arrive in the meantime.

use crate::config::Config;
use crate::connection::{Connection, FillOutcome, WriteOutcome};
use crate::queue::TaskQueue;
use crate::worker::WorkerPool;
use mio::event::Event;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token, Waker};
use slab::Slab;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};

const LISTENER_TOKEN: Token = Token(usize::MAX - 1);
const WAKE_TOKEN: Token = Token(usize::MAX);

type SharedConnection = Arc<Mutex<Connection>>;

/// Owns the poll instance, the listener, and the connection table. Only
/// this struct's methods ever touch `connections` or `user_count`.
pub struct Reactor {
    poll: Poll,
    listener: TcpListener,
    registry: Arc<mio::Registry>,
    connections: Slab<SharedConnection>,
    user_count: usize,
    max_connections: usize,
    queue: Arc<TaskQueue<SharedConnection>>,
    close_rx: Receiver<Token>,
}

impl Reactor {
    /// Bind the listener, wire up the worker pool, and return both: the
    /// reactor owns the event loop, the pool's handles outlive it for the
    /// life of the process.
    pub fn bind(config: &Config) -> io::Result<(Self, WorkerPool)> {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let mut listener = TcpListener::from_std(create_listener(addr)?);

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;
        let registry = Arc::new(poll.registry().try_clone()?);
        let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN)?);

        let (close_tx, close_rx) = mpsc::channel();
        let queue = Arc::new(TaskQueue::new(config.queue_capacity));
        let document_root = Arc::new(config.document_root.clone());

        let pool = WorkerPool::spawn(
            config.workers,
            Arc::clone(&queue),
            Arc::clone(&registry),
            Arc::clone(&document_root),
            close_tx,
            waker,
        );

        let reactor = Self {
            poll,
            listener,
            registry,
            connections: Slab::new(),
            user_count: 0,
            max_connections: config.max_connections,
            queue,
            close_rx,
        };

        Ok((reactor, pool))
    }

    /// The address the listening socket is bound to. Useful for tests
    /// that bind to an ephemeral port (`config.port == 0`) and need to
    /// discover which one the kernel assigned.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the event loop forever.
    pub fn run(&mut self) -> io::Result<()> {
        let mut events = Events::with_capacity(1024);
        loop {
            self.poll.poll(&mut events, None)?;
            for event in events.iter() {
                match event.token() {
                    LISTENER_TOKEN => self.accept_all(),
                    WAKE_TOKEN => self.drain_worker_closes(),
                    token => self.dispatch(token, event),
                }
            }
        }
    }

    fn accept_all(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer_addr)) => {
                    if self.user_count >= self.max_connections {
                        tracing::warn!(%peer_addr, "rejecting connection, at capacity");
                        continue;
                    }
                    if let Err(e) = socket2::SockRef::from(&stream).set_reuse_address(true) {
                        tracing::warn!(error = %e, %peer_addr, "failed to set SO_REUSEADDR on accepted socket");
                    }

                    let entry = self.connections.vacant_entry();
                    let token = Token(entry.key());
                    let mut conn = Connection::new(token, stream, peer_addr);
                    if let Err(e) = conn.register(&self.registry) {
                        tracing::warn!(error = %e, %peer_addr, "failed to register connection");
                        continue;
                    }
                    entry.insert(Arc::new(Mutex::new(conn)));
                    self.user_count += 1;
                    tracing::debug!(%peer_addr, user_count = self.user_count, "accepted connection");
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    break;
                }
            }
        }
    }

    fn drain_worker_closes(&mut self) {
        while let Ok(token) = self.close_rx.try_recv() {
            self.close_connection(token);
        }
    }

    fn dispatch(&mut self, token: Token, event: &Event) {
        if event.is_read_closed() || event.is_write_closed() || event.is_error() {
            self.close_connection(token);
            return;
        }
        if event.is_readable() {
            self.handle_readable(token);
        }
        if event.is_writable() && self.connections.contains(token.0) {
            self.handle_writable(token);
        }
    }

    fn handle_readable(&mut self, token: Token) {
        let Some(conn) = self.connections.get(token.0) else {
            return;
        };
        let conn = Arc::clone(conn);
        let outcome = conn.lock().unwrap().fill();
        match outcome {
            FillOutcome::Filled => {
                if let Err(conn) = self.queue.append(conn) {
                    drop(conn);
                    tracing::warn!(?token, "task queue full, closing connection");
                    self.close_connection(token);
                }
            }
            FillOutcome::WouldBlock => {}
            FillOutcome::BufferFull | FillOutcome::PeerClosed | FillOutcome::Err => {
                self.close_connection(token);
            }
        }
    }

    fn handle_writable(&mut self, token: Token) {
        let Some(conn) = self.connections.get(token.0) else {
            return;
        };
        let conn = Arc::clone(conn);
        let outcome = conn.lock().unwrap().write_response();
        match outcome {
            WriteOutcome::Done(true) => {
                let mut guard = conn.lock().unwrap();
                guard.reset_for_reuse();
                if let Err(e) = guard.reregister_read(&self.registry) {
                    tracing::warn!(error = %e, "failed to reregister kept-alive connection");
                    drop(guard);
                    self.close_connection(token);
                }
            }
            WriteOutcome::Done(false) | WriteOutcome::Err => self.close_connection(token),
            WriteOutcome::NotDone => {}
        }
    }

    fn close_connection(&mut self, token: Token) {
        if let Some(conn) = self.connections.try_remove(token.0) {
            let mut guard = conn.lock().unwrap();
            let _ = guard.deregister(&self.registry);
            self.user_count = self.user_count.saturating_sub(1);
            tracing::debug!(?token, user_count = self.user_count, "closed connection");
        }
    }
}

fn create_listener(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = Socket::new(
        match addr {
            SocketAddr::V4(_) => Domain::IPV4,
            SocketAddr::V6(_) => Domain::IPV6,
        },
        Type::STREAM,
        Some(Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;

    Ok(socket.into())
}
