//! Service layer for the crawler.
//!
//! - Offer classification (`TextClassifier`)
//! - Detail fetch and classify worker pool (`FilterPool`)
//! - Accepted-offer notification (`Notifier`)

mod classifier;
mod filter_pool;
pub mod notifier;

pub use classifier::{Rejection, TextClassifier};
pub use filter_pool::FilterPool;
pub use notifier::{CommandNotifier, LogNotifier, Notifier};
