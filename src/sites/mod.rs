//! Site adapters.
//!
//! The crawl engine only knows [`SiteAdapter`]; what a search page or a
//! detail page looks like on a given site lives behind it.

mod selector;

use std::sync::Arc;

pub use selector::SelectorSite;

use crate::error::Result;
use crate::models::{ListingPage, SearchFilter, SiteConfig};

/// Per-site knowledge of search and detail page structure.
pub trait SiteAdapter: Send + Sync {
    /// Name used in logs and as the ledger namespace.
    fn name(&self) -> &str;

    /// URL of search results page `page` (1-based).
    fn search_url(&self, page: u32) -> String;

    /// Extract the offers of a search page and whether it is the last one.
    ///
    /// The last-page flag must come from the page itself (navigation links,
    /// a "next" control), never from out-of-band knowledge.
    fn parse_listing_page(&self, body: &[u8], page: u32) -> Result<ListingPage>;

    /// URL of an offer's detail page.
    fn detail_url(&self, id: &str) -> String;

    /// Whitespace-normalised description text of a detail page.
    ///
    /// Fails with [`crate::error::AppError::Parse`] when the description
    /// container is missing.
    fn parse_detail_page(&self, body: &[u8]) -> Result<String>;
}

/// Build the adapter for one configured site.
pub fn from_config(site: &SiteConfig, filter: &SearchFilter) -> Result<Arc<dyn SiteAdapter>> {
    Ok(Arc::new(SelectorSite::new(site, filter)?))
}
