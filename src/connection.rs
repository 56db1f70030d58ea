//! A single client connection: its buffers, parser, resolved resource,
//! and the non-blocking read/write operations the reactor and workers
//! drive it through.
//!
//! Exactly one of the reactor thread or a worker thread touches a given
//! connection at a time; which one is free to call its methods at any
//! moment is dictated by the dispatch table in [`crate::reactor`], not by
//! any lock internal to this type (the `Mutex` wrapping each connection
//! in the registry exists for ownership across threads, not contention).

use crate::buffer::{ReadBuffer, WriteBuffer, DEFAULT_READ_BUFFER_SIZE, DEFAULT_WRITE_BUFFER_SIZE};
use crate::parser::{HttpCode, Parser};
use crate::resource::{self, Resource};
use crate::response;
use mio::net::TcpStream;
use mio::{Interest, Registry, Token};
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::path::Path;

/// Outcome of draining the socket into the read buffer.
pub enum FillOutcome {
    /// At least one byte was read; the connection should be handed to a
    /// worker for parsing.
    Filled,
    /// The socket had nothing to read right now and nothing was read
    /// either; this was a stray wakeup.
    WouldBlock,
    /// The peer closed its write side (`recv` returned 0).
    PeerClosed,
    /// The read buffer is full and the request still isn't complete.
    BufferFull,
    /// A read error other than "would block".
    Err,
}

/// Outcome of one parse-and-build pass on a worker thread.
pub enum ProcessOutcome {
    /// The request isn't fully buffered yet; keep waiting for more reads.
    NeedMoreData,
    /// A response is staged and ready to send.
    Ready { linger: bool },
    /// Staging the response itself failed (buffer overflow building
    /// headers); the connection cannot be salvaged and must be closed.
    Fatal,
}

/// Outcome of one non-blocking vectored-write attempt.
pub enum WriteOutcome {
    /// Every staged byte was sent; `bool` is whether the connection
    /// should be kept open for another request.
    Done(bool),
    /// The socket would block; stay registered for writability.
    NotDone,
    /// A write error other than "would block".
    Err,
}

/// One client connection and everything needed to service it.
pub struct Connection {
    pub token: Token,
    pub peer_addr: SocketAddr,
    stream: TcpStream,
    read_buf: ReadBuffer,
    write_buf: WriteBuffer,
    parser: Parser,
    resource: Option<Resource>,
    header_sent: usize,
    body_sent: usize,
    linger: bool,
}

impl Connection {
    pub fn new(token: Token, stream: TcpStream, peer_addr: SocketAddr) -> Self {
        Self {
            token,
            peer_addr,
            stream,
            read_buf: ReadBuffer::new(DEFAULT_READ_BUFFER_SIZE),
            write_buf: WriteBuffer::new(DEFAULT_WRITE_BUFFER_SIZE),
            parser: Parser::new(),
            resource: None,
            header_sent: 0,
            body_sent: 0,
            linger: false,
        }
    }

    pub fn register(&mut self, registry: &Registry) -> io::Result<()> {
        registry.register(&mut self.stream, self.token, Interest::READABLE)
    }

    pub fn reregister_read(&mut self, registry: &Registry) -> io::Result<()> {
        registry.reregister(&mut self.stream, self.token, Interest::READABLE)
    }

    pub fn reregister_write(&mut self, registry: &Registry) -> io::Result<()> {
        registry.reregister(&mut self.stream, self.token, Interest::WRITABLE)
    }

    pub fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        registry.deregister(&mut self.stream)
    }

    /// Drain the socket into the read buffer until it would block, the
    /// buffer fills, or the peer closes or errors.
    pub fn fill(&mut self) -> FillOutcome {
        let mut read_any = false;
        loop {
            if self.read_buf.is_full() {
                return if read_any {
                    FillOutcome::Filled
                } else {
                    FillOutcome::BufferFull
                };
            }
            match self.stream.read(self.read_buf.unfilled_mut()) {
                Ok(0) => return FillOutcome::PeerClosed,
                Ok(n) => {
                    self.read_buf.advance_read(n);
                    read_any = true;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return if read_any {
                        FillOutcome::Filled
                    } else {
                        FillOutcome::WouldBlock
                    };
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => return FillOutcome::Err,
            }
        }
    }

    /// Parse as much of the request as the buffered bytes allow and, once
    /// it's complete, resolve the named resource and stage a response.
    pub fn process(&mut self, document_root: &Path) -> ProcessOutcome {
        let code = self.parser.process(&mut self.read_buf);
        let (final_code, linger) = match code {
            HttpCode::NoRequest => return ProcessOutcome::NeedMoreData,
            HttpCode::BadRequest => (HttpCode::BadRequest, self.parser.request().linger),
            HttpCode::GetRequest => {
                let linger = self.parser.request().linger;
                let url = self.parser.request().url.clone();
                match resource::resolve(document_root, &url) {
                    Ok(resource) => {
                        self.resource = Some(resource);
                        (HttpCode::FileRequest, linger)
                    }
                    Err(code) => (code, linger),
                }
            }
            HttpCode::NoResource
            | HttpCode::Forbidden
            | HttpCode::FileRequest
            | HttpCode::InternalError => {
                unreachable!("the parser never yields a resolution-stage code")
            }
        };

        self.linger = linger;
        let file_slice = self.resource.as_ref().map(|r| &r.mmap[..]);
        match response::build(final_code, linger, file_slice, &mut self.write_buf) {
            Ok(_) => ProcessOutcome::Ready { linger },
            Err(()) => ProcessOutcome::Fatal,
        }
    }

    /// Send as much of the staged response as the socket accepts right
    /// now, resuming from wherever a previous partial write left off.
    pub fn write_response(&mut self) -> WriteOutcome {
        loop {
            let header_tail = self.write_buf.as_slice_from(self.header_sent);
            let body_slice = self.resource.as_ref().map(|r| &r.mmap[..]);
            let slices = response::io_slices(header_tail, body_slice, self.body_sent);
            if slices.is_empty() {
                return WriteOutcome::Done(self.linger);
            }

            match self.stream.write_vectored(&slices) {
                Ok(0) => return WriteOutcome::Err,
                Ok(n) => {
                    let header_remaining = header_tail.len();
                    if n <= header_remaining {
                        self.header_sent += n;
                    } else {
                        self.header_sent += header_remaining;
                        self.body_sent += n - header_remaining;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return WriteOutcome::NotDone,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => return WriteOutcome::Err,
            }
        }
    }

    /// Drop the resolved resource and reset all buffers/cursors so the
    /// connection can serve another pipelined or kept-alive request.
    pub fn reset_for_reuse(&mut self) {
        self.read_buf.reset();
        self.write_buf.reset();
        self.parser.reset();
        self.resource = None;
        self.header_sent = 0;
        self.body_sent = 0;
        self.linger = false;
    }
}
