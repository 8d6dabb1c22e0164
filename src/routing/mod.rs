//! Request routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → router.rs (exact lookup, then longest matching prefix)
//!     → matcher.rs (segment-aware path prefix)
//!     → handler → Dispatched (Response or plain body)
//!     → no match → 404 Response
//! ```
//!
//! # Design Decisions
//! - Routing is deliberately minimal; applications bring their own `Router`
//! - Providers extend routing by wrapping the current router

pub mod matcher;
pub mod router;

pub use router::{Handler, Router, Routes};

use crate::http::Dispatched;
use crate::lifecycle::listeners::{ELAPSED_TIME_TAG, MEMORY_USAGE_TAG};

/// Routes served by the binary when no application is embedded.
pub fn default_routes() -> Routes {
    Routes::new()
        .route("/", |_| {
            Ok(Dispatched::Body(format!(
                "<!DOCTYPE html>\n<html>\n<body>\n<h1>anchor</h1>\n\
                 <p>Rendered in {}ms using {}MB.</p>\n</body>\n</html>\n",
                ELAPSED_TIME_TAG, MEMORY_USAGE_TAG
            )))
        })
        .prefix("/admin", |request| {
            Ok(Dispatched::Body(format!(
                "<!DOCTYPE html>\n<html>\n<body>\n<h1>Administration</h1>\n\
                 <p>Request {} rendered in {}ms.</p>\n</body>\n</html>\n",
                request.id(),
                ELAPSED_TIME_TAG
            )))
        })
}
