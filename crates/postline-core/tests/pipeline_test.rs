//! End-to-end pipeline runs against scripted models and a fake git backend.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use postline_abstraction::{Model, ModelError};
use postline_core::{
    ModelGateway, Pipeline, PipelineConfig, PipelineReport, PipelineStage, PublishError, Sleeper,
    Strategy, VersionControl,
};
use postline_models::MockModel;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const FULL_RECORD: &str = r#"{"viral_title":"T","category":"투자 꿀팁","search_keyword":"한강뷰","roi_data":{"years":[2024,2025],"values":[100,120],"title":"X"},"calculator_type":"dsr","blog_body_markdown":"body [[MID_IMAGE]] text","tistory_teaser":"<p>t</p>"}"#;

struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

#[derive(Clone, Default)]
struct FakeGit {
    calls: Arc<Mutex<Vec<String>>>,
    reject_push: bool,
}

impl VersionControl for FakeGit {
    fn stage_all(&self, _repo: &Path) -> Result<(), PublishError> {
        self.calls.lock().unwrap().push("add".to_string());
        Ok(())
    }

    fn commit(&self, _repo: &Path, message: &str) -> Result<(), PublishError> {
        self.calls.lock().unwrap().push(format!("commit {message}"));
        Ok(())
    }

    fn push(&self, _repo: &Path, _remote: &str, _branch: &str) -> Result<(), PublishError> {
        self.calls.lock().unwrap().push("push".to_string());
        if self.reject_push {
            return Err(PublishError::GitCommandFailed {
                command: "push".to_string(),
                stderr: "remote rejected".to_string(),
            });
        }
        Ok(())
    }
}

struct Harness {
    _temp_dir: TempDir,
    config: PipelineConfig,
}

impl Harness {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join(".git")).unwrap();
        let mut config = PipelineConfig::default();
        config.site.blog_dir = temp_dir.path().to_path_buf();
        Self { _temp_dir: temp_dir, config }
    }

    fn pipeline(&self, models: Vec<Arc<MockModel>>, git: FakeGit) -> Pipeline {
        let candidates = models.into_iter().map(|m| m as Arc<dyn Model>).collect();
        let gateway = ModelGateway::new(candidates, Duration::from_secs(10), Duration::from_secs(60))
            .with_sleeper(Arc::new(NoSleep));
        Pipeline::new(self.config.clone(), gateway).with_version_control(Box::new(git))
    }
}

async fn run(pipeline: &Pipeline, topic: &str) -> PipelineReport {
    let now = NaiveDate::from_ymd_opt(2025, 3, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
        .and_utc();
    pipeline.run_at(topic, &now).await.unwrap()
}

fn front_matter(document: &str) -> serde_yaml::Value {
    let block = document.strip_prefix("---\n").unwrap().split("\n---\n").next().unwrap();
    serde_yaml::from_str(block).unwrap()
}

#[tokio::test]
async fn test_full_record_is_published_under_its_bucket() {
    let harness = Harness::new();
    let git = FakeGit::default();
    let model = Arc::new(MockModel::always("primary", FULL_RECORD));
    let pipeline = harness.pipeline(vec![model], git.clone());

    let report = run(&pipeline, "한강뷰 아파트").await;

    assert_eq!(report.bucket, "tips");
    assert_eq!(report.strategy, Some(Strategy::Strict));
    assert_eq!(report.candidate.as_deref(), Some("primary"));
    assert!(!report.used_fallback);
    assert!(report.publish.published);
    assert!(report.publish.url.starts_with("https://tech.mdeeno.com/posts/tips/2025-03-01-T-"));
    assert_eq!(
        report.stages,
        vec![
            PipelineStage::Requested,
            PipelineStage::Generating,
            PipelineStage::Parsed,
            PipelineStage::Assembled,
            PipelineStage::Published,
            PipelineStage::TeaserWritten,
            PipelineStage::Done,
        ]
    );

    let document = std::fs::read_to_string(&report.publish.path).unwrap();
    assert!(document.contains("body  text"));
    assert!(!document.contains("[[MID_IMAGE]]"));
    assert!(document.contains("https://tech.mdeeno.com/calculators/calc_dsr/"));
    assert_eq!(front_matter(&document)["date"].as_str(), Some("2025-03-01 09:30:00"));

    let chart = report.chart.unwrap();
    assert!(chart.starts_with(harness.config.image_root()));
    assert!(document.contains(&format!("/images/{}", chart.file_name().unwrap().to_string_lossy())));

    let teaser = std::fs::read_to_string(report.teaser.unwrap()).unwrap();
    assert!(teaser.contains(&report.publish.url));
    assert!(teaser.contains("<p>t</p>"));

    assert_eq!(*git.calls.lock().unwrap(), vec!["add", "commit Auto Post: T", "push"]);
}

#[tokio::test]
async fn test_all_candidates_rate_limited_uses_fallback_record() {
    let harness = Harness::new();
    let models: Vec<_> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|id| Arc::new(MockModel::scripted(id, vec![Err(ModelError::quota("gemini", "429"))])))
        .collect();
    let pipeline = harness.pipeline(models.clone(), FakeGit::default());

    let report = run(&pipeline, "강남 재건축").await;

    assert!(report.used_fallback);
    assert_eq!(report.candidate, None);
    assert_eq!(report.strategy, None);
    assert_eq!(report.title, "부동산 리포트");
    assert_eq!(report.bucket, "tips");
    assert!(report.stages.contains(&PipelineStage::Fallback));
    assert!(report.publish.published);
    assert!(models.iter().all(|m| m.calls() == 2));

    let document = std::fs::read_to_string(&report.publish.path).unwrap();
    assert_eq!(front_matter(&document)["title"].as_str(), Some("부동산 리포트"));
    assert!(report.publish.path.file_name().unwrap().to_string_lossy().contains("부동산-리포트"));
}

#[tokio::test]
async fn test_trailing_comma_partial_record_still_yields_valid_front_matter() {
    let harness = Harness::new();
    let model = Arc::new(MockModel::always("primary", r#"{"title": "X", "value": 1,}"#));
    let pipeline = harness.pipeline(vec![model], FakeGit::default());

    let report = run(&pipeline, "partial").await;

    assert_eq!(report.strategy, Some(Strategy::TrailingCommaStrip));
    assert!(!report.used_fallback);
    assert_eq!(report.title, "X");
    assert_eq!(report.bucket, "tips");

    let document = std::fs::read_to_string(&report.publish.path).unwrap();
    let yaml = front_matter(&document);
    assert_eq!(yaml["title"].as_str(), Some("X"));
    assert_eq!(yaml["categories"][0].as_str(), Some("투자 꿀팁"));
    assert_eq!(yaml["tags"][0].as_str(), Some("부동산"));
    assert_eq!(yaml["draft"].as_bool(), Some(false));
    assert!(!document.contains("돌려보기"));
}

#[tokio::test]
async fn test_push_failure_keeps_local_file_and_falls_back_to_site_url() {
    let harness = Harness::new();
    let git = FakeGit { reject_push: true, ..FakeGit::default() };
    let model = Arc::new(MockModel::always("primary", FULL_RECORD));
    let pipeline = harness.pipeline(vec![model], git);

    let report = run(&pipeline, "한강뷰 아파트").await;

    assert!(!report.publish.published);
    assert_eq!(report.publish.url, "https://tech.mdeeno.com");
    assert!(report.publish.path.exists());
    assert!(report.stages.contains(&PipelineStage::PublishFailedFallback));
    assert_eq!(report.stages.last(), Some(&PipelineStage::Done));

    let teaser = std::fs::read_to_string(report.teaser.unwrap()).unwrap();
    assert!(teaser.contains(r#"href="https://tech.mdeeno.com""#));
}

#[tokio::test]
async fn test_unparseable_output_falls_back() {
    let harness = Harness::new();
    let model = Arc::new(MockModel::always("primary", "Sorry, I can't help with that."));
    let pipeline = harness.pipeline(vec![model.clone()], FakeGit::default());

    let report = run(&pipeline, "topic").await;

    assert_eq!(model.calls(), 1);
    assert_eq!(report.candidate.as_deref(), Some("primary"));
    assert!(report.used_fallback);
    assert_eq!(report.title, "부동산 리포트");
}

#[tokio::test]
async fn test_blank_topic_is_rejected_before_generation() {
    let harness = Harness::new();
    let model = Arc::new(MockModel::always("primary", FULL_RECORD));
    let pipeline = harness.pipeline(vec![model.clone()], FakeGit::default());

    assert!(pipeline.run_at("   ", &Utc::now()).await.is_err());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_non_numeric_series_still_gets_a_chart() {
    let harness = Harness::new();
    let model = Arc::new(MockModel::always(
        "primary",
        r#"{"viral_title":"T","roi_data":{"years":[2024,2025],"values":[1,"n/a"]}}"#,
    ));
    let pipeline = harness.pipeline(vec![model], FakeGit::default());

    let report = run(&pipeline, "topic").await;

    assert!(!report.used_fallback);
    assert!(report.chart.is_some_and(|chart| chart.exists()));
}

#[tokio::test]
async fn test_very_long_title_still_writes_document() {
    let harness = Harness::new();
    let title = "서울 아파트 시장 전망".repeat(12);
    let model = Arc::new(MockModel::always("primary", format!(r#"{{"viral_title":"{title}"}}"#)));
    let pipeline = harness.pipeline(vec![model], FakeGit::default());

    let report = run(&pipeline, "topic").await;

    assert_eq!(report.title, title);
    assert!(report.publish.path.exists());
    assert!(report.teaser.is_some_and(|teaser| teaser.exists()));
}
