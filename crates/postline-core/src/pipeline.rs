//! One-topic generation-to-publish run.
//!
//! A run moves strictly forward through [`PipelineStage`]s. Generation and
//! extraction failures fall back to [`StructuredRecord::fallback`], chart and
//! teaser failures are logged and skipped, and publish failures degrade to the
//! site URL. Only a failure to write the document itself is returned as `Err`.

use crate::assemble::{ContentAssembler, post_date};
use crate::chart::{ChartRenderer, SvgChartRenderer};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::extract::{Strategy, extract};
use crate::gateway::ModelGateway;
use crate::prompt::GenerationRequest;
use crate::publish::{ArtifactPublisher, GitCli, PublishResult, VersionControl};
use crate::record::StructuredRecord;
use crate::teaser::TeaserWriter;
use chrono::{DateTime, Datelike, Local, TimeZone};
use postline_abstraction::{ModelParameters, ResponseFormat};
use postline_models::{ModelConfig, ModelFactory, ModelType};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// States of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    /// Topic accepted.
    Requested,
    /// Calling model candidates.
    Generating,
    /// A record was recovered from the model output.
    Parsed,
    /// The default record is used.
    Fallback,
    /// Document assembled.
    Assembled,
    /// Document written and synced (or sync disabled).
    Published,
    /// Document written, sync failed; the site URL stands in.
    PublishFailedFallback,
    /// Teaser draft written.
    TeaserWritten,
    /// Run finished.
    Done,
}

impl PipelineStage {
    /// Position in the run; alternatives share a rank.
    const fn rank(self) -> u8 {
        match self {
            Self::Requested => 0,
            Self::Generating => 1,
            Self::Parsed | Self::Fallback => 2,
            Self::Assembled => 3,
            Self::Published | Self::PublishFailedFallback => 4,
            Self::TeaserWritten => 5,
            Self::Done => 6,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Requested => "REQUESTED",
            Self::Generating => "GENERATING",
            Self::Parsed => "PARSED",
            Self::Fallback => "FALLBACK",
            Self::Assembled => "ASSEMBLED",
            Self::Published => "PUBLISHED",
            Self::PublishFailedFallback => "PUBLISH_FAILED_FALLBACK",
            Self::TeaserWritten => "TEASER_WRITTEN",
            Self::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Trimmed topic.
    pub topic: String,
    /// Stages traversed, in order.
    pub stages: Vec<PipelineStage>,
    /// Candidate that produced the text, if any.
    pub candidate: Option<String>,
    /// Recovery strategy that parsed the text, if any.
    pub strategy: Option<Strategy>,
    /// True when the default record was used.
    pub used_fallback: bool,
    /// Post title.
    pub title: String,
    /// Bucket the post was filed under.
    pub bucket: String,
    /// Chart file, when rendering succeeded.
    pub chart: Option<PathBuf>,
    /// Publish outcome.
    pub publish: PublishResult,
    /// Teaser draft, when writing succeeded.
    pub teaser: Option<PathBuf>,
}

impl PipelineReport {
    /// Final stage reached.
    pub fn final_stage(&self) -> Option<PipelineStage> {
        self.stages.last().copied()
    }
}

/// Forward-only stage log.
#[derive(Debug, Default)]
struct Progress {
    stages: Vec<PipelineStage>,
}

impl Progress {
    fn advance(&mut self, stage: PipelineStage) {
        debug_assert!(
            self.stages.last().is_none_or(|last| last.rank() < stage.rank()),
            "pipeline moved backwards into {stage}"
        );
        info!(stage = %stage, "Pipeline stage");
        self.stages.push(stage);
    }
}

/// The generation-to-publish pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    gateway: ModelGateway,
    renderer: Box<dyn ChartRenderer>,
    vcs: Box<dyn VersionControl>,
}

impl Pipeline {
    /// Creates a pipeline with the SVG renderer and the git CLI.
    pub fn new(config: PipelineConfig, gateway: ModelGateway) -> Self {
        let renderer = Box::new(SvgChartRenderer::from_config(&config));
        Self { config, gateway, renderer, vcs: Box::new(GitCli) }
    }

    /// Creates a pipeline whose gateway calls the configured candidates.
    ///
    /// # Errors
    /// Fails if the provider is unknown or a candidate cannot be created
    /// (for example, no API key).
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let gateway = gateway_from_config(&config)?;
        Ok(Self::new(config, gateway))
    }

    /// Replaces the chart renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Box<dyn ChartRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replaces the version control backend.
    #[must_use]
    pub fn with_version_control(mut self, vcs: Box<dyn VersionControl>) -> Self {
        self.vcs = vcs;
        self
    }

    /// Effective configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline for `topic` using the local clock.
    pub async fn run(&self, topic: &str) -> Result<PipelineReport> {
        self.run_at(topic, &Local::now()).await
    }

    /// Runs the pipeline for `topic` as if started at `now`.
    pub async fn run_at<Tz>(&self, topic: &str, now: &DateTime<Tz>) -> Result<PipelineReport>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let mut progress = Progress::default();
        let request = GenerationRequest::new(topic, now.year(), &self.config)?;
        progress.advance(PipelineStage::Requested);
        info!(topic = %request.topic(), "Starting run");

        progress.advance(PipelineStage::Generating);
        let raw = self.gateway.generate(&request.to_prompt()).await;
        let candidate = raw.as_ref().map(|r| r.candidate.clone());
        let extraction = raw.and_then(|r| extract(&r.text));
        let strategy = extraction.as_ref().map(|e| e.strategy);

        let (record, used_fallback) = match extraction {
            Some(extraction) => {
                progress.advance(PipelineStage::Parsed);
                (extraction.into_record(), false)
            }
            None => {
                progress.advance(PipelineStage::Fallback);
                warn!("Using fallback record");
                (StructuredRecord::fallback(), true)
            }
        };

        let (chart, chart_ref) = self.render_chart(&record);
        let date = post_date(now);
        let assembly = ContentAssembler::new(&self.config).assemble(&record, &chart_ref, &date);
        progress.advance(PipelineStage::Assembled);

        let publish = ArtifactPublisher::new(&self.config, self.vcs.as_ref())
            .publish(&assembly.document, &assembly.bucket)?;
        if publish.published || !self.config.publish.push {
            progress.advance(PipelineStage::Published);
        } else {
            progress.advance(PipelineStage::PublishFailedFallback);
        }

        let teaser = match TeaserWriter::from_config(&self.config).write(&record.title, &record.teaser, &publish.url) {
            Ok(path) => {
                progress.advance(PipelineStage::TeaserWritten);
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "Failed to write teaser draft");
                None
            }
        };
        progress.advance(PipelineStage::Done);

        Ok(PipelineReport {
            topic: request.topic().to_string(),
            stages: progress.stages,
            candidate,
            strategy,
            used_fallback,
            title: record.title,
            bucket: assembly.bucket,
            chart,
            publish,
            teaser,
        })
    }

    /// Renders and stores the chart; failures leave the post without one.
    fn render_chart(&self, record: &StructuredRecord) -> (Option<PathBuf>, String) {
        let written = self
            .renderer
            .render(&record.series)
            .and_then(|artifact| Ok((artifact.write_to(&self.config.image_root())?, artifact.public_path)));
        match written {
            Ok((path, public_path)) => (Some(path), public_path),
            Err(e) => {
                warn!(error = %e, "Chart unavailable, continuing without image");
                (None, String::new())
            }
        }
    }
}

/// Builds the candidate gateway described by `config`.
pub fn gateway_from_config(config: &PipelineConfig) -> Result<ModelGateway> {
    let generation = &config.generation;
    let mut template = ModelConfig::new(ModelType::Mock, String::new())
        .with_timeout(generation.request_timeout())
        .with_relaxed_safety(generation.relax_safety);
    if let Some(api_key) = &generation.api_key {
        template = template.with_api_key(api_key.clone());
    }
    if let Some(base_url) = &generation.base_url {
        template = template.with_base_url(base_url.clone());
    }

    let candidates = ModelFactory::create_candidates(&generation.provider, &config.candidate_ids(), &template)?;
    let parameters = ModelParameters {
        temperature: Some(generation.temperature),
        response_format: generation.json_mode.then_some(ResponseFormat::Json),
        ..ModelParameters::default()
    };

    Ok(ModelGateway::new(candidates, generation.backoff(), generation.deadline()).with_parameters(parameters))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineStage::PublishFailedFallback.to_string(), "PUBLISH_FAILED_FALLBACK");
        assert_eq!(
            serde_json::to_string(&PipelineStage::TeaserWritten).unwrap(),
            "\"TEASER_WRITTEN\""
        );
    }

    #[test]
    fn test_alternatives_share_rank() {
        assert_eq!(PipelineStage::Parsed.rank(), PipelineStage::Fallback.rank());
        assert!(PipelineStage::Assembled.rank() > PipelineStage::Fallback.rank());
    }

    #[test]
    fn test_progress_records_in_order() {
        let mut progress = Progress::default();
        progress.advance(PipelineStage::Requested);
        progress.advance(PipelineStage::Generating);
        progress.advance(PipelineStage::Fallback);
        assert_eq!(progress.stages.len(), 3);
    }

    #[test]
    fn test_gateway_from_config_uses_candidates() {
        let mut config = PipelineConfig::default();
        config.generation.provider = "mock".to_string();
        config.generation.candidates = vec!["m1".to_string(), " ".to_string(), "m2".to_string()];

        let gateway = gateway_from_config(&config).unwrap();
        assert_eq!(gateway.candidate_ids(), vec!["m1", "m2"]);
    }

    #[test]
    fn test_gateway_from_config_rejects_unknown_provider() {
        let mut config = PipelineConfig::default();
        config.generation.provider = "nope".to_string();
        assert!(gateway_from_config(&config).is_err());
    }
}
