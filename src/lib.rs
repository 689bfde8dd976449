//! Klipp - Segment Selection and Sequencing
//!
//! A CLI tool that turns a pool of time-stamped speech segments into a
//! single, deduplicated, duration-bounded, coherently ordered script for
//! downstream video assembly.
//!
//! The name "Klipp" comes from the Norwegian word for "cut."
//!
//! # Overview
//!
//! Klipp allows you to:
//! - Score segments against a topic prompt with an external text oracle
//! - Cluster near-duplicate takes and keep the best one
//! - Build duration-bounded highlight reels from the survivors
//! - Reorder pools into alternating-speaker dialogues or coherent stories
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt management
//! - `store` - The canonical segment types and script record format
//! - `scoring` - Oracle-backed quality scoring
//! - `dedup` - Take deduplication
//! - `rank` - Ranking and novelty reranking
//! - `timeline` - Temporal expansion and duration trimming
//! - `sequence` - Dialogue and story sequencing
//! - `pipeline` - Stage coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use klipp::config::Settings;
//! use klipp::pipeline::Pipeline;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::new(settings)?;
//!
//!     let result = pipeline
//!         .build_reel(
//!             Path::new("segments.txt"),
//!             Path::new("reel.txt"),
//!             Some("the product launch"),
//!             Some(90.0),
//!         )
//!         .await?;
//!     println!("Selected {} segments", result.segments_out);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod openai;
pub mod pipeline;
pub mod rank;
pub mod scoring;
pub mod sequence;
pub mod store;
pub mod timeline;

pub use error::{KlippError, Result};
