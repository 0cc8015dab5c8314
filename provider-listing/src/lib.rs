//! Directory-listing provider implementation
//!
//! Implements the [`bridge_traits::listing::ListingSource`] contract against
//! a content host that exposes its folder tree only through directory-listing
//! HTML pages.
//!
//! The crate splits into two halves:
//!
//! - [`extract`] - pure structural extraction of immediate children from a
//!   listing page. No I/O, deterministic, and tolerant: unparseable input
//!   yields empty results, never an error.
//! - [`connector`] - the one-shot HTTP fetch wrapping the extractor. One call
//!   per folder, bounded timeout, no retry.

pub mod connector;
pub mod error;
pub mod extract;

pub use connector::ListingConnector;
pub use error::ListingError;
pub use extract::{extract_listing, Listing};
