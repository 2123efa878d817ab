#![deny(unused)]
//! Classification engine for support tickets.
//!
//! The pipeline sanitizes the ticket, derives a lexicon sentiment signal,
//! builds the catalog-grounded prompt, routes it through the model gateway,
//! and applies the confidence policy to the model's answer. Completed
//! results are cached under a content fingerprint so identical retries skip
//! the provider entirely.

pub mod cache;
pub mod catalog;
pub mod pipeline;
pub mod prompt;
pub mod sanitizer;
pub mod sentiment;

pub use cache::{CacheStats, ResultCache};
pub use catalog::{CatalogEntry, QueueEntry, ServiceCatalog};
pub use pipeline::ClassificationPipeline;
pub use prompt::{PromptBuilder, PromptResult};
pub use sanitizer::TicketSanitizer;
pub use sentiment::SentimentAnalyzer;
