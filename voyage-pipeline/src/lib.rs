//! voyage-pipeline: orchestrates a full Wikivoyage extraction run.
//!
//! The driver first streams the `page_props` SQL dump into an immutable
//! page-id → Wikidata-id table, then streams the bzip2 XML dump through a
//! SAX-style handler that schedules one unit of work per mapped page: parse
//! the wikitext with [`voyage`], stamp the page title, and fan the entry out
//! to every configured sink. Sinks close only after all scheduled work has
//! drained.

pub mod config;
pub mod dump;
pub mod error;
pub mod mappings;
pub mod pipeline;
mod stream;

pub use config::Config;
pub use error::{PipelineError, Result};
pub use pipeline::{run, ARTICLES_URL, PAGE_PROPS_URL};
