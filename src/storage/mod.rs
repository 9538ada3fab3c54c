//! Output storage for scraped comment threads
//!
//! - [`jsonl`] writes one JSON object per thread, flushed as it arrives

pub mod jsonl;

pub use jsonl::JsonLinesWriter;
