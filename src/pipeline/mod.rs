//! Pipeline entry points for crawler operations.
//!
//! - `PaginationWalker`: crawl one site page by page
//! - `Orchestrator`: crawl every site in parallel and notify

mod orchestrate;
mod walk;

pub use orchestrate::Orchestrator;
pub use walk::PaginationWalker;
