//! Building an HTTP/1.1 response into a connection's write buffer.
//!
//! Status line, headers, and (for error responses) an inline body are all
//! staged into the fixed-capacity [`WriteBuffer`]; a successful file
//! request additionally produces a two-segment vectored-write descriptor
//! covering the staged headers and the `mmap`-ed file, so the headers and
//! file content never need to be copied into one contiguous buffer.

use crate::buffer::WriteBuffer;
use crate::parser::HttpCode;
use std::io::IoSlice;

const BAD_REQUEST_BODY: &str =
    "Your request has bad syntax or is inherently impossible to satisfy.\n";
const FORBIDDEN_BODY: &str = "You do not have permission to get file from this server.\n";
const NOT_FOUND_BODY: &str = "The requested file was not found on this server.\n";
const INTERNAL_ERROR_BODY: &str = "There was an unusual problem serving the requested file.\n";

/// What to do once the headers (and, for error responses, the body) are
/// staged in the write buffer.
pub enum ResponseBody<'a> {
    /// Nothing further to send beyond the write buffer's contents.
    None,
    /// Send the write buffer's contents followed by this file slice.
    File(&'a [u8]),
}

/// Write the status line, headers, and (if applicable) inline error body
/// for `code` into `out`, returning the segment to append after it.
///
/// Fails if `out` is too small to hold the headers (and, for a file
/// request, the file slice is passed back unwritten via `file`); the
/// caller should treat a `false` return as fatal to the connection, since
/// a response can't be sent half-written.
#[must_use]
pub fn build<'a>(
    code: HttpCode,
    linger: bool,
    file: Option<&'a [u8]>,
    out: &mut WriteBuffer,
) -> Result<ResponseBody<'a>, ()> {
    match code {
        HttpCode::FileRequest => {
            let body = file.expect("FileRequest must carry a file slice");
            add_status_line(out, 200, "OK")?;
            add_headers(out, body.len(), linger)?;
            Ok(ResponseBody::File(body))
        }
        HttpCode::BadRequest => build_error(out, 400, "Bad Request", BAD_REQUEST_BODY, linger),
        HttpCode::Forbidden => build_error(out, 403, "Forbidden", FORBIDDEN_BODY, linger),
        HttpCode::NoResource => build_error(out, 404, "Not Found", NOT_FOUND_BODY, linger),
        HttpCode::InternalError => {
            build_error(out, 500, "Internal Error", INTERNAL_ERROR_BODY, linger)
        }
        HttpCode::NoRequest | HttpCode::GetRequest => {
            unreachable!("response is only built once parsing has settled on a final outcome")
        }
    }
}

fn build_error<'a>(
    out: &mut WriteBuffer,
    status: u16,
    title: &str,
    body: &str,
    linger: bool,
) -> Result<ResponseBody<'a>, ()> {
    add_status_line(out, status, title)?;
    add_headers(out, body.len(), linger)?;
    if !out.try_append(body) {
        return Err(());
    }
    Ok(ResponseBody::None)
}

fn add_status_line(out: &mut WriteBuffer, status: u16, title: &str) -> Result<(), ()> {
    let line = format!("HTTP/1.1 {status} {title}\r\n");
    if out.try_append(&line) {
        Ok(())
    } else {
        Err(())
    }
}

fn add_headers(out: &mut WriteBuffer, content_len: usize, linger: bool) -> Result<(), ()> {
    let connection = if linger { "keep-alive" } else { "close" };
    let headers = format!(
        "Content-Length: {content_len}\r\nContent-Type: text/html\r\nConnection: {connection}\r\n\r\n"
    );
    if out.try_append(&headers) {
        Ok(())
    } else {
        Err(())
    }
}

/// Build the `IoSlice`s for a vectored write of the write buffer
/// (optionally from a mid-buffer offset, on a resumed partial write) plus
/// the body segment, skipping either side if it's already fully sent.
pub fn io_slices<'a>(
    header_tail: &'a [u8],
    body: Option<&'a [u8]>,
    body_sent: usize,
) -> Vec<IoSlice<'a>> {
    let mut slices = Vec::with_capacity(2);
    if !header_tail.is_empty() {
        slices.push(IoSlice::new(header_tail));
    }
    if let Some(body) = body {
        if body_sent < body.len() {
            slices.push(IoSlice::new(&body[body_sent..]));
        }
    }
    slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::WriteBuffer;

    #[test]
    fn builds_200_with_file_segment() {
        let mut out = WriteBuffer::new(256);
        let file = b"<h1>hi</h1>";
        let result = build(HttpCode::FileRequest, true, Some(file), &mut out).unwrap();
        let text = String::from_utf8(out.as_slice().to_vec()).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 11\r\n"));
        assert!(text.contains("Connection: keep-alive\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
        match result {
            ResponseBody::File(b) => assert_eq!(b, file),
            ResponseBody::None => panic!("expected a file body"),
        }
    }

    #[test]
    fn builds_404_with_inline_body() {
        let mut out = WriteBuffer::new(256);
        let result = build(HttpCode::NoResource, false, None, &mut out).unwrap();
        let text = String::from_utf8(out.as_slice().to_vec()).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with(NOT_FOUND_BODY));
        assert!(matches!(result, ResponseBody::None));
    }

    #[test]
    fn fails_without_writing_when_buffer_too_small() {
        let mut out = WriteBuffer::new(8);
        assert!(build(HttpCode::NoResource, false, None, &mut out).is_err());
    }

    #[test]
    fn io_slices_skips_fully_sent_header() {
        let header = b"";
        let body = b"0123456789";
        let slices = io_slices(header, Some(body), 4);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].len(), 6);
    }
}
