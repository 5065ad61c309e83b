//! Listing data structures produced and consumed during a crawl.

use serde::{Deserialize, Serialize};

/// One offer found on a search results page.
///
/// Identity is `id`; `title` is only used for display and classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub id: String,
}

impl Candidate {
    pub fn new(title: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: id.into(),
        }
    }
}

/// A parsed search results page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Offers in page order
    pub candidates: Vec<Candidate>,

    /// No further search pages exist
    pub is_last_page: bool,
}

/// Accept/reject outcome for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub id: String,
    pub accepted: bool,
}

impl Verdict {
    pub fn accepted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            accepted: true,
        }
    }

    pub fn rejected(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            accepted: false,
        }
    }
}
