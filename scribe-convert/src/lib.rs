//! `scribe-convert` — Markdown ↔ wiki storage format conversion.
//!
//! The storage format is the XHTML dialect a wiki server keeps page bodies
//! in: plain HTML for prose plus `ac:`/`ri:` namespaced macros for code
//! blocks and images. Both directions are total functions over `&str`;
//! malformed input degrades to literal text rather than an error.
//!
//! # Quick start
//!
//! ```
//! let storage = scribe_convert::encode("# Title");
//! assert_eq!(storage, "<h1>Title</h1>");
//! assert_eq!(scribe_convert::decode(&storage), "# Title");
//! ```

pub mod blocks;
pub mod decode;
pub mod dialect;
pub mod encode;
pub mod error;
pub mod escape;
pub mod frontmatter;
pub mod inline;
pub mod markup;

pub use decode::decode;
pub use encode::encode;
pub use error::*;
pub use frontmatter::{FrontMatter, parse_front_matter, split_front_matter, strip_frontmatter};
