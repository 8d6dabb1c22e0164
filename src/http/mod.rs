//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! CGI environment (once) or axum request (serve)
//!     → request.rs (method, path, headers, request ID)
//!     → session.rs (store picked from cookie, opened only for admin paths)
//!     → [kernel dispatches and normalizes]
//!     → response.rs (status, headers, body)
//!     → transport.rs (buffered until flush; headers_sent after commit)
//!     → server.rs (axum response) or stdout (CGI)
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod session;
pub mod transport;

pub use request::{Request, X_REQUEST_ID};
pub use response::{Dispatched, Response};
pub use server::HttpServer;
pub use session::{
    store_for, FileSession, MemorySession, Session, SessionGuard, SessionRecord, SESSION_COOKIE,
};
pub use transport::{BufferedTransport, Transport, WriterTransport};
