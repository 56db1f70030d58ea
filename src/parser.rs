//! The two-level HTTP/1.1 GET-only request parser.
//!
//! A line extractor ([`crate::buffer::ReadBuffer::parse_line`]) feeds
//! complete lines to a main state machine that walks REQUEST_LINE,
//! HEADERS, and CONTENT in turn, mirroring a classic single-pass HTTP
//! parser: no header is ever re-scanned, and the machine can suspend and
//! resume across `recv` calls without losing its place.

use crate::buffer::{LineResult, ReadBuffer};

/// Where the main state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    RequestLine,
    Headers,
    Content,
}

/// The classification of a request once it (or the resource it names)
/// has been looked at. Folds together "is the request well-formed" and
/// "does the named resource exist" the way a single dispatch table wants
/// to, so [`crate::response`] can build the right reply from one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpCode {
    /// The request is not fully read yet; keep waiting for more bytes.
    NoRequest,
    /// A complete, well-formed GET request was parsed.
    GetRequest,
    /// The request line, a header, or the overall framing was malformed.
    BadRequest,
    /// The request was fine but the named resource does not exist.
    NoResource,
    /// The resource exists but is not world-readable, or is a directory.
    Forbidden,
    /// The resource was resolved and mapped; ready to serve.
    FileRequest,
    /// Something on the server side went wrong resolving the resource.
    InternalError,
}

/// Only GET is accepted; anything else is a bad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
}

/// The request fields accumulated across REQUEST_LINE and HEADERS.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: Method,
    /// The request target, always starting with `/` once parsed; an
    /// absolute-form `http://host/path` target has already had its
    /// scheme and authority stripped.
    pub url: String,
    pub version: String,
    pub host: Option<String>,
    pub content_length: usize,
    /// Whether `Connection: keep-alive` was present.
    pub linger: bool,
}

enum HeaderOutcome {
    Continue,
    ExpectBody,
    Complete,
}

/// The request-line/header/content state machine for a single request.
/// One `Parser` lives inside each connection and is reset between
/// pipelined or keep-alive requests.
pub struct Parser {
    state: ParserState,
    request: Request,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: ParserState::RequestLine,
            request: Request::default(),
        }
    }

    /// Return to the initial state with a blank request, for reuse on a
    /// kept-alive connection.
    pub fn reset(&mut self) {
        self.state = ParserState::RequestLine;
        self.request = Request::default();
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Drive the state machine as far as the bytes already buffered in
    /// `buf` allow, returning [`HttpCode::NoRequest`] if more input is
    /// needed, [`HttpCode::BadRequest`] on malformed input, or
    /// [`HttpCode::GetRequest`] once the full request (including any
    /// body) has been read.
    pub fn process(&mut self, buf: &mut ReadBuffer) -> HttpCode {
        loop {
            if self.state == ParserState::Content {
                if buf.read_idx >= buf.checked_idx + self.request.content_length {
                    return HttpCode::GetRequest;
                }
                return HttpCode::NoRequest;
            }

            match buf.parse_line() {
                LineResult::Open => return HttpCode::NoRequest,
                LineResult::Bad => return HttpCode::BadRequest,
                LineResult::Ok => {
                    let line = buf.current_line().to_vec();
                    buf.start_line = buf.checked_idx;

                    match self.state {
                        ParserState::RequestLine => {
                            if self.parse_request_line(&line).is_err() {
                                return HttpCode::BadRequest;
                            }
                            self.state = ParserState::Headers;
                        }
                        ParserState::Headers => match self.parse_header_line(&line) {
                            HeaderOutcome::Continue => {}
                            HeaderOutcome::ExpectBody => self.state = ParserState::Content,
                            HeaderOutcome::Complete => return HttpCode::GetRequest,
                        },
                        ParserState::Content => unreachable!("handled above"),
                    }
                }
            }
        }
    }

    fn parse_request_line(&mut self, line: &[u8]) -> Result<(), ()> {
        let text = std::str::from_utf8(line).map_err(|_| ())?;
        let mut tokens = text.split_whitespace();
        let method = tokens.next().ok_or(())?;
        let mut url = tokens.next().ok_or(())?.to_string();
        let version = tokens.next().ok_or(())?;

        if !method.eq_ignore_ascii_case("GET") {
            return Err(());
        }
        if !version.eq_ignore_ascii_case("HTTP/1.1") {
            return Err(());
        }

        if let Some(rest) = url.strip_prefix("http://").map(str::to_string) {
            match rest.find('/') {
                Some(idx) => url = rest[idx..].to_string(),
                None => return Err(()),
            }
        }
        if !url.starts_with('/') {
            return Err(());
        }

        self.request.method = Method::Get;
        self.request.url = url;
        self.request.version = version.to_string();
        Ok(())
    }

    fn parse_header_line(&mut self, line: &[u8]) -> HeaderOutcome {
        if line.is_empty() {
            return if self.request.content_length != 0 {
                HeaderOutcome::ExpectBody
            } else {
                HeaderOutcome::Complete
            };
        }

        let Ok(text) = std::str::from_utf8(line) else {
            return HeaderOutcome::Continue;
        };

        if let Some(rest) = strip_ci_prefix(text, "Connection:") {
            if rest.trim().eq_ignore_ascii_case("keep-alive") {
                self.request.linger = true;
            }
        } else if let Some(rest) = strip_ci_prefix(text, "Content-Length:") {
            self.request.content_length = rest.trim().parse().unwrap_or(0);
        } else if let Some(rest) = strip_ci_prefix(text, "Host:") {
            self.request.host = Some(rest.trim().to_string());
        }

        HeaderOutcome::Continue
    }
}

fn strip_ci_prefix<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes()) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}
