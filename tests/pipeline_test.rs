//! End-to-end tests of the background processing pipeline with mocked
//! transcoder and remote service.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use prontu::ai::{ClinicalFields, GenerativeClient, GenerativePart};
use prontu::audio::{AudioChunk, AudioSplitter};
use prontu::config::Config;
use prontu::db::{patients, practitioners, records, Database};
use prontu::db::patients::PatientInput;
use prontu::error::{Result, ProntuError};
use prontu::pipeline::{
    JobStatus, PipelineHandle, PipelineJob, PipelineRunner, FAILURE_PREFIX,
    PROCESSING_PLACEHOLDER,
};

/// Splitter returning a fixed number of synthetic chunks
struct MockSplitter {
    chunk_count: usize,
    calls: AtomicUsize,
}

impl MockSplitter {
    fn new(chunk_count: usize) -> Self {
        Self {
            chunk_count,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AudioSplitter for MockSplitter {
    async fn split(&self, audio: &[u8], mime_type: &str) -> Result<Vec<AudioChunk>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if audio.is_empty() {
            return Err(ProntuError::InvalidInput("Empty audio payload".to_string()));
        }

        Ok((0..self.chunk_count)
            .map(|index| AudioChunk {
                index,
                mime_type: mime_type.to_string(),
                data: audio.to_vec(),
            })
            .collect())
    }

    fn check_availability(&self) -> Result<()> {
        Ok(())
    }
}

/// Remote client answering audio requests with a transcript snippet and
/// text-only requests with a scripted summary. An optional semaphore gate
/// holds every call until the test releases permits.
struct ScriptedClient {
    summary_response: std::result::Result<String, String>,
    calls: AtomicUsize,
    gate: Option<Arc<tokio::sync::Semaphore>>,
}

impl ScriptedClient {
    fn new(summary_response: &str) -> Self {
        Self {
            summary_response: Ok(summary_response.to_string()),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            summary_response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    fn gated(summary_response: &str, gate: Arc<tokio::sync::Semaphore>) -> Self {
        Self {
            summary_response: Ok(summary_response.to_string()),
            calls: AtomicUsize::new(0),
            gate: Some(gate),
        }
    }
}

#[async_trait]
impl GenerativeClient for ScriptedClient {
    async fn generate(
        &self,
        _api_key: &str,
        _model: &str,
        parts: Vec<GenerativePart>,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }

        match &self.summary_response {
            Err(message) => Err(ProntuError::RemoteApi(message.clone())),
            Ok(summary) => {
                let has_audio = parts
                    .iter()
                    .any(|part| matches!(part, GenerativePart::Audio { .. }));

                if has_audio {
                    Ok("Psicólogo: como você está?\nPaciente: melhor.".to_string())
                } else {
                    Ok(summary.clone())
                }
            }
        }
    }
}

struct TestEnv {
    db: Database,
    pipeline: PipelineHandle,
    splitter: Arc<MockSplitter>,
    client: Arc<ScriptedClient>,
    patient_id: i64,
    record_id: i64,
}

fn session_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 5).unwrap()
}

fn setup(splitter: MockSplitter, client: ScriptedClient, worker_count: usize, queue: usize) -> TestEnv {
    let db = Database::open_in_memory().unwrap();
    let practitioner = practitioners::ensure_default(&db, "prompt de teste").unwrap();

    let patient = patients::insert(
        &db,
        practitioner.id,
        &PatientInput {
            first_name: "Ana".to_string(),
            second_name: Some("Silva".to_string()),
            full_name: None,
            birth_date: NaiveDate::from_ymd_opt(1991, 3, 9).unwrap(),
            objectives: Some("objetivo anterior".to_string()),
            clinical_demand: None,
            clinical_procedures: None,
            clinical_analysis: None,
            clinical_conclusion: None,
        },
    )
    .unwrap();

    let record = records::insert(&db, patient.id, session_date(), PROCESSING_PLACEHOLDER).unwrap();

    let splitter = Arc::new(splitter);
    let client = Arc::new(client);

    let mut config = Config::default().pipeline;
    config.worker_count = worker_count;
    config.queue_capacity = queue;

    let pipeline = PipelineRunner::spawn(
        &config,
        db.clone(),
        Arc::clone(&splitter) as Arc<dyn AudioSplitter>,
        Arc::clone(&client) as Arc<dyn GenerativeClient>,
    );

    TestEnv {
        db,
        pipeline,
        splitter,
        client,
        patient_id: patient.id,
        record_id: record.id,
    }
}

fn job(env: &TestEnv, api_key: &str) -> PipelineJob {
    job_for_record(env, api_key, env.record_id)
}

fn job_for_record(env: &TestEnv, api_key: &str, record_id: i64) -> PipelineJob {
    let patient = patients::get(&env.db, 1, env.patient_id).unwrap();
    PipelineJob {
        job_id: Uuid::new_v4(),
        record_id,
        patient_id: env.patient_id,
        audio: vec![1u8; 64],
        mime_type: "audio/mpeg".to_string(),
        api_key: api_key.to_string(),
        system_prompt: "prompt de teste".to_string(),
        model: "gemini-2.5-flash".to_string(),
        prior_fields: patient.clinical_fields(),
        session_date: session_date(),
    }
}

async fn wait_for_terminal(pipeline: &PipelineHandle, job_id: Uuid) -> JobStatus {
    for _ in 0..200 {
        if let Some(info) = pipeline.status(&job_id) {
            if matches!(info.status, JobStatus::Succeeded | JobStatus::Failed) {
                return info.status;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached a terminal status", job_id);
}

const SUMMARY_JSON: &str = r#"{
    "objectives": "incluir registro de pensamentos",
    "clinical_demand": "",
    "clinical_procedures": "questionamento socrático",
    "clinical_analysis": "",
    "clinical_conclusion": "",
    "psy_record": "Paciente relatou melhora do humor."
}"#;

#[tokio::test]
async fn success_path_updates_record_and_merges_patient_fields() {
    let env = setup(MockSplitter::new(2), ScriptedClient::new(SUMMARY_JSON), 2, 16);

    let job = job(&env, "chave-valida");
    let job_id = env.pipeline.submit(job).unwrap();

    let status = wait_for_terminal(&env.pipeline, job_id).await;
    assert_eq!(status, JobStatus::Succeeded);

    // One transcription call per chunk plus one summary call.
    assert_eq!(env.client.calls.load(Ordering::SeqCst), 3);
    assert_eq!(env.splitter.calls.load(Ordering::SeqCst), 1);

    let record = records::get(&env.db, env.patient_id, env.record_id).unwrap();
    assert_eq!(record.content, "Paciente relatou melhora do humor.");

    let patient = patients::get(&env.db, 1, env.patient_id).unwrap();
    assert!(patient.objectives.contains("objetivo anterior"));
    assert!(patient.objectives.contains("incluir registro de pensamentos"));
    // Empty deltas leave their fields exactly as stored.
    assert_eq!(patient.clinical_demand, "");
    assert!(patient.clinical_procedures.contains("questionamento socrático"));
}

#[tokio::test]
async fn missing_credential_short_circuits_before_any_work() {
    let env = setup(MockSplitter::new(1), ScriptedClient::new(SUMMARY_JSON), 1, 16);

    let job_id = env.pipeline.submit(job(&env, "")).unwrap();

    let status = wait_for_terminal(&env.pipeline, job_id).await;
    assert_eq!(status, JobStatus::Failed);

    // No chunking, no remote call.
    assert_eq!(env.splitter.calls.load(Ordering::SeqCst), 0);
    assert_eq!(env.client.calls.load(Ordering::SeqCst), 0);

    let record = records::get(&env.db, env.patient_id, env.record_id).unwrap();
    assert!(record.content.starts_with(FAILURE_PREFIX));
    assert!(record.content.contains("Chave de API não configurada"));
}

#[tokio::test]
async fn remote_failure_is_written_to_the_record() {
    let env = setup(MockSplitter::new(1), ScriptedClient::failing("quota exceeded"), 1, 16);

    let job_id = env.pipeline.submit(job(&env, "chave")).unwrap();

    let status = wait_for_terminal(&env.pipeline, job_id).await;
    assert_eq!(status, JobStatus::Failed);

    let record = records::get(&env.db, env.patient_id, env.record_id).unwrap();
    assert!(record.content.starts_with(FAILURE_PREFIX));
    assert!(record.content.contains("quota exceeded"));

    // Patient fields stay untouched on failure.
    let patient = patients::get(&env.db, 1, env.patient_id).unwrap();
    assert_eq!(patient.objectives, "objetivo anterior");

    let info = env.pipeline.status(&job_id).unwrap();
    assert!(info.error.unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn prose_response_degrades_to_raw_text_note() {
    let prose = "O modelo ignorou o contrato e respondeu em prosa.";
    let env = setup(MockSplitter::new(1), ScriptedClient::new(prose), 1, 16);

    let job_id = env.pipeline.submit(job(&env, "chave")).unwrap();

    let status = wait_for_terminal(&env.pipeline, job_id).await;
    assert_eq!(status, JobStatus::Succeeded);

    let record = records::get(&env.db, env.patient_id, env.record_id).unwrap();
    assert_eq!(record.content, prose);

    // All field deltas were empty, so the stored fields did not change.
    let patient = patients::get(&env.db, 1, env.patient_id).unwrap();
    assert_eq!(patient.objectives, "objetivo anterior");
}

#[tokio::test]
async fn concurrent_submission_for_same_record_is_rejected() {
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    let env = setup(
        MockSplitter::new(1),
        ScriptedClient::gated(SUMMARY_JSON, Arc::clone(&gate)),
        1,
        16,
    );

    let first = env.pipeline.submit(job(&env, "chave")).unwrap();

    // The first job is blocked inside the remote call; a second submission
    // for the same record must be rejected while the lease is held.
    let second = env.pipeline.submit(job(&env, "chave"));
    assert!(matches!(second, Err(ProntuError::RecordBusy(_))));

    // Release the gate for the transcription and summary calls.
    gate.add_permits(8);
    let status = wait_for_terminal(&env.pipeline, first).await;
    assert_eq!(status, JobStatus::Succeeded);

    // With the lease released, the record can be reprocessed.
    let third = env.pipeline.submit(job(&env, "chave"));
    assert!(third.is_ok());
    gate.add_permits(8);
    wait_for_terminal(&env.pipeline, third.unwrap()).await;
}

#[tokio::test]
async fn saturated_queue_rejects_submission() {
    let gate = Arc::new(tokio::sync::Semaphore::new(0));
    let env = setup(
        MockSplitter::new(1),
        ScriptedClient::gated(SUMMARY_JSON, Arc::clone(&gate)),
        1,
        1,
    );

    // Extra records so each job targets its own lease.
    let second_record = records::insert(&env.db, env.patient_id, session_date(), PROCESSING_PLACEHOLDER).unwrap();
    let third_record = records::insert(&env.db, env.patient_id, session_date(), PROCESSING_PLACEHOLDER).unwrap();

    let first = env.pipeline.submit(job(&env, "chave")).unwrap();

    // Wait until the single worker has picked up the first job, so the
    // queue slot is free again.
    for _ in 0..200 {
        if let Some(info) = env.pipeline.status(&first) {
            if info.status == JobStatus::Running {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // One job fills the queue; the next finds it full.
    env.pipeline
        .submit(job_for_record(&env, "chave", second_record.id))
        .unwrap();
    let overflow = env.pipeline.submit(job_for_record(&env, "chave", third_record.id));
    assert!(matches!(overflow, Err(ProntuError::QueueFull)));

    // Drain everything so the test ends cleanly.
    gate.add_permits(64);
    wait_for_terminal(&env.pipeline, first).await;
}
