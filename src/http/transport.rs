//! Response transports.
//!
//! # Responsibilities
//! - Buffer output until the pass commits it (flush)
//! - Let the error translator discard uncommitted output
//! - Report whether headers already left the process
//!
//! # Design Decisions
//! - A transport accepts one response; later output can only extend the body
//! - `BufferedTransport` backs the HTTP server and tests
//! - `WriterTransport` writes CGI-style output to any `Write`

use std::io::{self, Write};

use crate::http::response::Response;

/// Where a finished response goes.
pub trait Transport {
    /// True once the status line and headers have been committed.
    fn headers_sent(&self) -> bool;

    /// Drop output that has not been committed yet.
    fn discard_buffer(&mut self);

    /// Queue a complete response.
    fn send(&mut self, response: &Response) -> io::Result<()>;

    /// Append to the body of the response already queued or committed.
    fn write_body(&mut self, body: &str) -> io::Result<()>;

    /// Commit queued output.
    fn flush(&mut self) -> io::Result<()>;
}

fn already_sent() -> io::Error {
    io::Error::new(io::ErrorKind::AlreadyExists, "a response has already been sent")
}

/// Keeps the response in memory.
#[derive(Debug, Default)]
pub struct BufferedTransport {
    pending: Option<Response>,
    committed: Option<Response>,
}

impl BufferedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed response, or the queued one if nothing was committed.
    pub fn into_response(self) -> Option<Response> {
        self.committed.or(self.pending)
    }
}

impl Transport for BufferedTransport {
    fn headers_sent(&self) -> bool {
        self.committed.is_some()
    }

    fn discard_buffer(&mut self) {
        self.pending = None;
    }

    fn send(&mut self, response: &Response) -> io::Result<()> {
        if self.pending.is_some() || self.committed.is_some() {
            return Err(already_sent());
        }
        self.pending = Some(response.clone());
        Ok(())
    }

    fn write_body(&mut self, body: &str) -> io::Result<()> {
        let target = self
            .pending
            .as_mut()
            .or(self.committed.as_mut())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no response to append to"))?;
        let appended = format!("{}{}", target.body(), body);
        target.set_body(appended);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(response) = self.pending.take() {
            self.committed = Some(response);
        }
        Ok(())
    }
}

/// Writes `Status:` line, headers and body to a writer (CGI gateway format).
#[derive(Debug)]
pub struct WriterTransport<W: Write> {
    writer: W,
    buffer: Vec<u8>,
    buffered: bool,
    head_queued: bool,
    headers_sent: bool,
}

impl<W: Write> WriterTransport<W> {
    /// Output is held until `flush`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: Vec::new(),
            buffered: true,
            head_queued: false,
            headers_sent: false,
        }
    }

    /// Output goes straight to the writer.
    pub fn unbuffered(writer: W) -> Self {
        Self {
            buffered: false,
            ..Self::new(writer)
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn auto_flush(&mut self) -> io::Result<()> {
        if self.buffered {
            Ok(())
        } else {
            self.flush()
        }
    }
}

impl<W: Write> Transport for WriterTransport<W> {
    fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    fn discard_buffer(&mut self) {
        self.buffer.clear();
        self.head_queued = false;
    }

    fn send(&mut self, response: &Response) -> io::Result<()> {
        if self.head_queued || self.headers_sent {
            return Err(already_sent());
        }
        let status = response.status();
        write!(
            self.buffer,
            "Status: {} {}\r\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )?;
        for (name, value) in response.headers() {
            write!(self.buffer, "{}: {}\r\n", name, value)?;
        }
        self.buffer.extend_from_slice(b"\r\n");
        self.buffer.extend_from_slice(response.body().as_bytes());
        self.head_queued = true;
        self.auto_flush()
    }

    fn write_body(&mut self, body: &str) -> io::Result<()> {
        self.buffer.extend_from_slice(body.as_bytes());
        self.auto_flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.write_all(&self.buffer)?;
        self.writer.flush()?;
        self.buffer.clear();
        if self.head_queued {
            self.head_queued = false;
            self.headers_sent = true;
        }
        Ok(())
    }
}
