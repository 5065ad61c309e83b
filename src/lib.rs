// src/lib.rs

//! flatwatch: polls rental listing sites for furnished flats, filters the
//! offers on their description and remembers every verdict.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod sites;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod test_support;
