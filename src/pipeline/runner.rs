use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::ai::{extract_clinical_note, ClinicalNote, GenerativeClient, Summarizer, Transcriber};
use crate::audio::AudioSplitter;
use crate::config::PipelineConfig;
use crate::db::Database;
use crate::error::{Result, ProntuError};
use super::job::{JobInfo, JobTracker, PipelineJob};
use super::lease::RecordLeases;
use super::sink::RecordUpdateSink;

/// Handle the HTTP layer uses to submit jobs and observe their state.
/// Cloning is cheap; all clones feed the same worker pool.
#[derive(Clone)]
pub struct PipelineHandle {
    sender: mpsc::Sender<PipelineJob>,
    tracker: Arc<JobTracker>,
    leases: Arc<RecordLeases>,
    cancel: CancellationToken,
}

impl PipelineHandle {
    /// Submit a job. Takes the record lease and a queue slot, or rejects:
    /// a held lease means another run for this record is in flight, a full
    /// queue means the pool is saturated.
    pub fn submit(&self, job: PipelineJob) -> Result<Uuid> {
        let job_id = job.job_id;
        let record_id = job.record_id;

        if !self.leases.try_acquire(record_id) {
            return Err(ProntuError::RecordBusy(record_id));
        }

        self.tracker.insert_queued(job_id, record_id);

        match self.sender.try_send(job) {
            Ok(()) => {
                info!("Job {} queued for record {}", job_id, record_id);
                Ok(job_id)
            }
            Err(TrySendError::Full(_)) => {
                self.leases.release(record_id);
                self.tracker.remove(&job_id);
                Err(ProntuError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => {
                self.leases.release(record_id);
                self.tracker.remove(&job_id);
                Err(ProntuError::Interrupted)
            }
        }
    }

    /// Observable state of a submitted job
    pub fn status(&self, job_id: &Uuid) -> Option<JobInfo> {
        self.tracker.get(job_id)
    }

    /// Signal all workers to stop; in-flight jobs abort at their next
    /// suspension point and are marked failed.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Spawns the worker pool and returns the submission handle
pub struct PipelineRunner;

impl PipelineRunner {
    pub fn spawn(
        config: &PipelineConfig,
        db: Database,
        splitter: Arc<dyn AudioSplitter>,
        client: Arc<dyn GenerativeClient>,
    ) -> PipelineHandle {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let tracker = Arc::new(JobTracker::default());
        let leases = Arc::new(RecordLeases::default());
        let cancel = CancellationToken::new();
        let sink = Arc::new(RecordUpdateSink::new(db));

        let worker_count = config.worker_count.max(1);
        for worker_id in 0..worker_count {
            tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&receiver),
                Arc::clone(&splitter),
                Arc::clone(&client),
                Arc::clone(&sink),
                Arc::clone(&tracker),
                Arc::clone(&leases),
                cancel.clone(),
            ));
        }

        info!("Pipeline started with {} worker(s)", worker_count);

        PipelineHandle {
            sender,
            tracker,
            leases,
            cancel,
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop(
    worker_id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<PipelineJob>>>,
    splitter: Arc<dyn AudioSplitter>,
    client: Arc<dyn GenerativeClient>,
    sink: Arc<RecordUpdateSink>,
    tracker: Arc<JobTracker>,
    leases: Arc<RecordLeases>,
    cancel: CancellationToken,
) {
    info!("Pipeline worker {} started", worker_id);

    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            tokio::select! {
                biased;

                _ = cancel.cancelled() => None,
                job = receiver.recv() => job,
            }
        };

        let Some(job) = job else {
            break;
        };

        let span = tracing::info_span!(
            "pipeline_job",
            job_id = %job.job_id,
            record_id = job.record_id,
            patient_id = job.patient_id,
        );

        process_job(job, &splitter, &client, &sink, &tracker, &leases, &cancel)
            .instrument(span)
            .await;
    }

    info!("Pipeline worker {} stopped", worker_id);
}

/// Run one job to completion. Every failure, expected or not, ends up in
/// the record's content and the tracker; nothing propagates out of the
/// worker.
async fn process_job(
    job: PipelineJob,
    splitter: &Arc<dyn AudioSplitter>,
    client: &Arc<dyn GenerativeClient>,
    sink: &RecordUpdateSink,
    tracker: &JobTracker,
    leases: &RecordLeases,
    cancel: &CancellationToken,
) {
    let job_id = job.job_id;
    let record_id = job.record_id;
    let patient_id = job.patient_id;
    let prior_fields = job.prior_fields.clone();
    let session_date = job.session_date;

    tracker.set_running(job_id, record_id);

    let result = run_stages(job, splitter, client, cancel).await;

    match result {
        Ok(note) => {
            match sink.apply_success(patient_id, record_id, &prior_fields, &note, session_date) {
                Ok(()) => {
                    tracker.set_succeeded(job_id, record_id);
                    info!("Job {} succeeded", job_id);
                }
                Err(e) => {
                    error!("Job {} produced a note but persisting it failed: {}", job_id, e);
                    sink.apply_failure(record_id, &e.to_string());
                    tracker.set_failed(job_id, record_id, e.to_string());
                }
            }
        }
        Err(e) => {
            warn!("Job {} failed: {}", job_id, e);
            sink.apply_failure(record_id, &e.to_string());
            tracker.set_failed(job_id, record_id, e.to_string());
        }
    }

    leases.release(record_id);
}

/// The pipeline stages proper: chunk, transcribe, summarize, parse. The
/// cancellation token is checked around every long-running stage.
async fn run_stages(
    job: PipelineJob,
    splitter: &Arc<dyn AudioSplitter>,
    client: &Arc<dyn GenerativeClient>,
    cancel: &CancellationToken,
) -> Result<ClinicalNote> {
    // Pre-flight: without a credential nothing is attempted, no subprocess
    // and no network call.
    if job.api_key.trim().is_empty() {
        return Err(ProntuError::Config(
            "Chave de API não configurada. Cadastre sua chave nas configurações.".to_string(),
        ));
    }

    let chunks = tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(ProntuError::Interrupted),
        result = splitter.split(&job.audio, &job.mime_type) => result,
    }?;

    let transcriber = Transcriber::new(Arc::clone(client));
    let transcript = tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(ProntuError::Interrupted),
        result = transcriber.transcribe(&job.api_key, &job.model, &chunks) => result,
    }?;

    let summarizer = Summarizer::new(Arc::clone(client));
    let raw_summary = tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(ProntuError::Interrupted),
        result = summarizer.summarize(
            &job.api_key,
            &job.model,
            &job.system_prompt,
            &job.prior_fields,
            &transcript,
        ) => result,
    }?;

    Ok(extract_clinical_note(&raw_summary))
}
