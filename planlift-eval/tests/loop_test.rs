//! Improvement-loop integration: extract, verify, analyse, propose,
//! apply, rollback, over a scripted worker runtime and a real store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use planlift_core::config::PipelineConfig;
use planlift_core::errors::WorkerError;
use planlift_core::types::fragments::Domain;
use planlift_extract::WorkerRuntime;
use planlift_eval::Pipeline;

const INSTRUCTION_DOC: &str = "# Project Extractor Instructions v1.0.0\n\n\
                               ## Scope\n\nRead the title block.\n";

/// Canned responses keyed by worker (orientation passes split by the
/// method text in the prompt).
struct ScriptedRuntime {
    responses: HashMap<String, String>,
}

impl ScriptedRuntime {
    fn key(worker: &str, prompt: &str) -> String {
        if worker == "orientation" {
            if prompt.contains("north-arrow") {
                "orientation:1".to_string()
            } else {
                "orientation:2".to_string()
            }
        } else {
            worker.to_string()
        }
    }
}

#[async_trait]
impl WorkerRuntime for ScriptedRuntime {
    async fn invoke(
        &self,
        worker: &str,
        prompt: &str,
        _timeout: Duration,
    ) -> Result<String, WorkerError> {
        self.responses
            .get(&Self::key(worker, prompt))
            .cloned()
            .ok_or_else(|| WorkerError::Failed {
                worker: worker.to_string(),
                code: 1,
                stderr: "unscripted worker".to_string(),
            })
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    pipeline: Pipeline,
    instruction_doc: PathBuf,
}

fn fixture(responses: HashMap<String, String>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();

    let instruction_root = root.join("instructions");
    std::fs::create_dir_all(instruction_root.join("project-extractor")).unwrap();
    let instruction_doc = instruction_root.join("project-extractor/instructions.md");
    std::fs::write(&instruction_doc, INSTRUCTION_DOC).unwrap();

    let eval_root = root.join("evals");
    let pages = eval_root.join("case-1").join("pages");
    std::fs::create_dir_all(&pages).unwrap();
    for n in 1..=3 {
        std::fs::write(pages.join(format!("page-{n:03}.png")), b"png").unwrap();
    }
    std::fs::write(
        eval_root.join("case-1").join("ground_truth.csv"),
        "field_path,value\n\
         project.address,1 Oak St\n\
         project.climate_zone,12\n\
         project.front_orientation,90\n\
         envelope.conditioned_floor_area,800\n\
         zones[Zone 1].floor_area,800\n",
    )
    .unwrap();

    let config = PipelineConfig {
        repo_root: root.clone(),
        eval_root,
        instruction_root,
        retry_pause_secs: Some(0),
        ..Default::default()
    };
    let pipeline =
        Pipeline::with_runtime(config, Arc::new(ScriptedRuntime { responses })).unwrap();
    Fixture {
        _dir: dir,
        pipeline,
        instruction_doc,
    }
}

fn scripted() -> HashMap<String, String> {
    let mut responses = HashMap::new();
    responses.insert(
        "discovery".to_string(),
        serde_json::json!({
            "total_pages": 3,
            "pages": [
                {"page": 1, "page_type": "schedule", "confidence": "high", "description": null},
                {"page": 2, "page_type": "compliance", "confidence": "high", "description": null},
                {"page": 3, "page_type": "drawing", "confidence": "medium", "description": null}
            ]
        })
        .to_string(),
    );
    responses.insert(
        "project-extractor".to_string(),
        serde_json::json!({
            "project": {"address": "1 Oak St", "climate_zone": 12},
            "envelope": {"conditioned_floor_area": 800.0}
        })
        .to_string(),
    );
    responses.insert(
        "zones-extractor".to_string(),
        serde_json::json!({
            "zones": [{"name": "Zone 1", "floor_area": 800.0}],
            "walls": []
        })
        .to_string(),
    );
    responses.insert(
        "windows-extractor".to_string(),
        serde_json::json!({"windows": []}).to_string(),
    );
    responses.insert(
        "hvac-extractor".to_string(),
        serde_json::json!({"hvac_systems": []}).to_string(),
    );
    responses.insert(
        "dhw-extractor".to_string(),
        serde_json::json!({"water_heating_systems": []}).to_string(),
    );
    responses.insert(
        "orientation:1".to_string(),
        serde_json::json!({"front_orientation": 90.0, "confidence": "high"}).to_string(),
    );
    responses.insert(
        "orientation:2".to_string(),
        serde_json::json!({"front_orientation": 88.0, "confidence": "high"}).to_string(),
    );
    responses
}

fn critic_proposal_json() -> String {
    serde_json::json!({
        "target_file": "project-extractor/instructions.md",
        "current_version": "v1.0.0",
        "proposed_version": "v1.1.0",
        "change_type": "add_section",
        "failure_pattern": "project omissions",
        "hypothesis": "scope section too narrow",
        "proposed_change": "## Checklist\n\nRead the CF1R header block.",
        "expected_impact": "fewer omissions",
        "affected_error_types": ["omission"],
        "affected_domains": ["project"],
        "estimated_f1_delta": 0.05
    })
    .to_string()
}

#[tokio::test]
async fn extract_then_verify_round_trips_through_the_store() {
    let fx = fixture(scripted());

    let extract = fx.pipeline.extract("case-1").await.unwrap();
    assert_eq!(extract.iteration, 1);
    assert_eq!(extract.failed, Vec::<Domain>::new());
    assert_eq!(extract.conflicts, 0);

    let (iteration, spec) = fx.pipeline.store().read_latest_extracted("case-1").unwrap();
    assert_eq!(iteration, 1);
    // Orientation passes agree: circular mean of 90 and 88.
    assert!((spec.project.front_orientation.unwrap() - 89.0).abs() < 1e-9);

    let verify = fx.pipeline.verify("case-1").unwrap();
    assert_eq!(verify.iteration, 1);
    assert_eq!(verify.discrepancy_count, 0);
    assert_eq!(verify.metrics.f1, 1.0);

    // Aggregate history has the entry.
    let history = fx.pipeline.store().read_aggregate("case-1").unwrap();
    assert_eq!(history.get(1).unwrap().f1, 1.0);
}

#[tokio::test]
async fn failed_domain_still_produces_a_record() {
    let mut responses = scripted();
    responses.remove("hvac-extractor");
    let fx = fixture(responses);

    let extract = fx.pipeline.extract("case-1").await.unwrap();
    assert_eq!(extract.failed, vec![Domain::Hvac]);

    let (_, spec) = fx.pipeline.store().read_latest_extracted("case-1").unwrap();
    assert!(spec.hvac_systems.is_empty());
}

#[tokio::test]
async fn analyse_propose_apply_rollback_closes_the_loop() {
    let mut responses = scripted();
    // Misextract the address so verification yields a discrepancy.
    responses.insert(
        "project-extractor".to_string(),
        serde_json::json!({
            "project": {"address": "2 Elm St", "climate_zone": 12},
            "envelope": {"conditioned_floor_area": 800.0}
        })
        .to_string(),
    );
    responses.insert("critic".to_string(), critic_proposal_json());
    let fx = fixture(responses);

    fx.pipeline.extract("case-1").await.unwrap();
    let verify = fx.pipeline.verify("case-1").unwrap();
    assert_eq!(verify.metrics.wrong_values, 1);

    let analysis = fx.pipeline.analyse(&["case-1".to_string()]).unwrap();
    assert_eq!(analysis.total_discrepancies, 1);
    assert_eq!(analysis.dominant_domain.as_deref(), Some("project"));

    let proposal = fx.pipeline.propose(&analysis).await.unwrap().unwrap();
    assert_eq!(proposal.proposed_version, "v1.1.0");

    let active = vec![("case-1".to_string(), verify.iteration)];
    fx.pipeline.apply(&proposal, &active).unwrap();
    let applied = std::fs::read_to_string(&fx.instruction_doc).unwrap();
    assert!(applied.starts_with("# Project Extractor Instructions v1.1.0"));
    assert!(applied.contains("## Checklist"));

    // Regression observed: roll back to the snapshot.
    fx.pipeline.rollback("case-1", verify.iteration).unwrap();
    assert_eq!(
        std::fs::read_to_string(&fx.instruction_doc).unwrap(),
        INSTRUCTION_DOC
    );
    // Idempotent.
    fx.pipeline.rollback("case-1", verify.iteration).unwrap();
    assert_eq!(
        std::fs::read_to_string(&fx.instruction_doc).unwrap(),
        INSTRUCTION_DOC
    );
}

#[tokio::test]
async fn critic_prose_refusal_yields_no_proposal() {
    let mut responses = scripted();
    responses.insert(
        "critic".to_string(),
        "The failures look like rasterisation noise; no instruction change would help."
            .to_string(),
    );
    responses.insert(
        "project-extractor".to_string(),
        serde_json::json!({
            "project": {"address": "2 Elm St", "climate_zone": 12},
            "envelope": {"conditioned_floor_area": 800.0}
        })
        .to_string(),
    );
    let fx = fixture(responses);

    fx.pipeline.extract("case-1").await.unwrap();
    fx.pipeline.verify("case-1").unwrap();
    let analysis = fx.pipeline.analyse(&["case-1".to_string()]).unwrap();
    assert!(fx.pipeline.propose(&analysis).await.unwrap().is_none());
}

#[tokio::test]
async fn critic_version_mismatch_rejects_the_proposal() {
    let mut responses = scripted();
    let stale = critic_proposal_json().replace("v1.0.0", "v0.9.0");
    responses.insert("critic".to_string(), stale);
    responses.insert(
        "project-extractor".to_string(),
        serde_json::json!({
            "project": {"address": "2 Elm St", "climate_zone": 12},
            "envelope": {"conditioned_floor_area": 800.0}
        })
        .to_string(),
    );
    let fx = fixture(responses);

    fx.pipeline.extract("case-1").await.unwrap();
    fx.pipeline.verify("case-1").unwrap();
    let analysis = fx.pipeline.analyse(&["case-1".to_string()]).unwrap();
    let err = fx.pipeline.propose(&analysis).await.unwrap_err();
    assert!(err.to_string().contains("Version mismatch"));
    // The document is untouched.
    assert_eq!(
        std::fs::read_to_string(&fx.instruction_doc).unwrap(),
        INSTRUCTION_DOC
    );
}
