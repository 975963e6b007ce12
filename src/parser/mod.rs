//! Text and payload parsing.
//!
//! - [`find_share_link`] decides whether a chat message should start the
//!   relay pipeline and which link to resolve
//! - [`extract_direct_url`] recovers the direct download URL from whatever
//!   the resolver API returned
//!
//! # Example
//!
//! ```
//! use relay_core::parser::{extract_direct_url, find_share_link};
//! use relay_core::resolver::ResolverPayload;
//!
//! let link = find_share_link("https://terabox.com/s/abc").unwrap();
//! assert_eq!(link, "https://terabox.com/s/abc");
//!
//! let payload = ResolverPayload::Text("direct: https://cdn.example.com/a.mp4".into());
//! assert_eq!(
//!     extract_direct_url(&payload).as_deref(),
//!     Some("https://cdn.example.com/a.mp4")
//! );
//! ```

mod link;
mod payload;

pub use link::{contains_share_link, find_share_link};
pub use payload::{KNOWN_URL_FIELDS, SNIPPET_MAX_CHARS, extract_direct_url, snippet};
