//! Breba Documents
//!
//! The generated page as an immutable, content-addressed value.
//!
//! # Core Concepts
//!
//! - [`Document`]: LF-normalized sequence of lines, replaced wholesale on update
//! - [`ContentHash`]: 32-byte Blake3 hash of a document's canonical text
//!
//! # Example
//!
//! ```rust
//! use breba_document::Document;
//!
//! let doc = Document::from_text("<html>\r\n<body></body>\r\n</html>\r\n");
//! assert_eq!(doc.len(), 3);
//! assert_eq!(doc.to_text(), "<html>\n<body></body>\n</html>");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod document;
mod hash;

pub use document::Document;
pub use hash::{ContentHash, HashError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
