//! Postline Core - topic-to-post generation and publishing pipeline.
//!
//! This crate provides the pipeline and its components:
//! - Configuration loading and layering
//! - Multi-candidate model gateway with rate-limit backoff
//! - Tolerant recovery of structured records from model output
//! - Chart rendering, document assembly and publishing
//!
//! # Example
//!
//! ```rust,no_run
//! use postline_core::{Pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> postline_core::Result<()> {
//!     let config = PipelineConfig::discover_and_load(None)?;
//!     let report = Pipeline::from_config(config)?.run("한강뷰 아파트").await?;
//!     println!("{}", report.publish.url);
//!     Ok(())
//! }
//! ```

pub mod assemble;
pub mod chart;
pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
mod hash;
pub mod pipeline;
pub mod prompt;
pub mod publish;
pub mod record;
pub mod teaser;

pub use assemble::{Assembly, ContentAssembler, Document, FrontMatter, MID_IMAGE, post_date};
pub use chart::{ChartArtifact, ChartError, ChartRenderer, SvgChartRenderer};
pub use config::{CalculatorLink, CategoryTable, ConfigError, PipelineConfig};
pub use error::{PostlineError, Result};
pub use extract::{Extraction, Strategy, extract};
pub use gateway::{ModelGateway, RawModelResponse, Sleeper, TokioSleeper};
pub use pipeline::{Pipeline, PipelineReport, PipelineStage, gateway_from_config};
pub use prompt::GenerationRequest;
pub use publish::{
    ArtifactPublisher, GitCli, PublishError, PublishLock, PublishResult, VersionControl, slugify,
};
pub use record::{Calculator, NumericSeries, StructuredRecord};
pub use teaser::TeaserWriter;
