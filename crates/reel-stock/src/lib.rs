//! Stock footage sourcing.
//!
//! Queries a stock-footage provider with a ranked list of search terms,
//! keeps portrait results with a usable rendition, and downloads a minimum
//! viable set of clips into the work directory.

pub mod client;
pub mod error;
pub mod selection;
pub mod sourcing;

pub use client::{PexelsClient, PexelsConfig, ProviderVideo, Rendition, StockProvider};
pub use error::{StockError, StockResult};
pub use selection::{accept_video, select_rendition};
pub use sourcing::{search_terms, ClipSourcer, SourcingConfig, GENERIC_TERMS, MIN_CLIPS};
