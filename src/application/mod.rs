//! Application services built on the domain and sources.

pub mod aggregator;

pub use aggregator::{Aggregator, SearchSession};
