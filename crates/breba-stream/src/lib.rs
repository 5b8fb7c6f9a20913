//! Breba Stream
//!
//! Reassembles complete HTML tag groups out of an incrementally delivered
//! token stream, so a live preview never receives a half-written tag.
//!
//! # Core Concepts
//!
//! - [`TagAccumulator`]: synchronous buffer that emits text up to the last
//!   complete closing tag and stops once the root element closes
//! - [`accumulate`]: the same thing as a `futures` stream adapter
//!
//! # Example
//!
//! ```rust
//! use breba_stream::TagAccumulator;
//!
//! let mut acc = TagAccumulator::new();
//! assert_eq!(acc.append_and_return_html("<html><he"), "");
//! assert_eq!(acc.append_and_return_html("ad></head>"), "<html><head></head>");
//! assert_eq!(acc.append_and_return_html("</html>"), "</html>");
//! assert!(acc.is_done());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod accumulator;
mod stream;

pub use accumulator::{TagAccumulator, DEFAULT_ROOT_TAG};
pub use stream::accumulate;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
