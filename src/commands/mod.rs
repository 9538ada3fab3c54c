pub mod check_config;
pub mod scrape;

// Re-export command functions for convenience
pub use check_config::check_config;
pub use scrape::{scrape, ScrapeArgs};
