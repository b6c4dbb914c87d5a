//! The conversion pipeline: reads an input object, runs it through the
//! external transcoder, and writes the converted output back to storage.
//!
//! [`ConversionPipeline::run`] is the sole entry point and never propagates
//! an error to its caller — every failure path here is absorbed and
//! recorded on the job record and progress channel instead, since it is
//! spawned fire-and-forget once the orchestrator has accepted a job.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use audiocore_data::{BlobRef, Job, JobId, JobStatus, JobStore, ProgressRecord};
use audiocore_media::{ParserEvent, StderrParser, Supervisor, SyntheticProgress, TICK_INTERVAL};
use audiocore_progress::ProgressChannel;
use audiocore_storage::{StorageGateway, MULTIPART_MAX_INFLIGHT, MULTIPART_PART_SIZE};
use audiocore_telemetry::Metrics;
use bytes::{Bytes, BytesMut};
use futures_util::TryStreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, instrument, warn};

use crate::compat;
use crate::error::{PipelineError, Result};
use crate::format;
use crate::phases::{Phase, STREAMING_CEILING};
use crate::tempdir::TempJobDir;

/// Options captured from a validated `POST /convert` request.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Requested output format, e.g. `mp3`.
    pub format: String,
    /// Requested quality string, e.g. `192k`, passed through to the tool.
    pub quality: String,
    /// Size-derived timeout the whole run is raced against.
    pub timeout: Duration,
}

/// Composes the storage gateway, transcoder supervisor, progress channel and
/// job store into the end-to-end conversion pipeline.
#[derive(Clone)]
pub struct ConversionPipeline {
    storage: StorageGateway,
    job_store: JobStore,
    progress: ProgressChannel,
    supervisor: Supervisor,
    transcoder_path: Arc<str>,
    metrics: Metrics,
}

impl ConversionPipeline {
    /// Compose a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        storage: StorageGateway,
        job_store: JobStore,
        progress: ProgressChannel,
        supervisor: Supervisor,
        transcoder_path: impl Into<Arc<str>>,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            job_store,
            progress,
            supervisor,
            transcoder_path: transcoder_path.into(),
            metrics,
        }
    }

    /// Run a conversion to completion, racing it against `options.timeout`.
    #[instrument(skip(self, job, options), fields(job_id = %job.job_id))]
    pub async fn run(&self, job: Job, options: ConvertOptions) {
        let job_id = JobId::from_string(job.job_id.clone());
        let started_at = Instant::now();
        self.metrics.add_active_pipelines(1);
        self.metrics.inc_conversion_started(&options.format);

        let timeout = options.timeout;
        let outcome = tokio::time::timeout(timeout, self.run_inner(&job, &options, &job_id)).await;

        self.metrics.add_active_pipelines(-1);
        self.metrics.observe_conversion_duration(started_at.elapsed());

        match outcome {
            Ok(Ok(())) => {
                self.metrics.inc_conversion_completed(&options.format);
            }
            Ok(Err(err)) => {
                error!(job_id = %job_id, error = %err, "conversion pipeline failed");
                self.metrics.inc_conversion_failed(failure_reason(&err));
                self.fail(&job_id, err.to_string()).await;
            }
            Err(_elapsed) => {
                let after_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(job_id = %job_id, after_ms, "conversion pipeline timed out");
                self.metrics.inc_conversion_failed("timeout");
                self.supervisor.terminate(&job_id).await.ok();
                self.fail(&job_id, PipelineError::TimedOut { after_ms }.to_string()).await;
            }
        }

        self.supervisor.forget(&job_id);
    }

    async fn run_inner(&self, job: &Job, options: &ConvertOptions, job_id: &JobId) -> Result<()> {
        self.job_store.update_status(job_id, JobStatus::Processing, None, None).await?;
        self.publish(job_id, Phase::CreateSourceStream, None).await;

        let input_ext = extension_of(&job.input_key);
        let compatibility = compat::check(&input_ext, &options.format);

        let output_ref = if compatibility.streaming_supported && !compatibility.fallback_recommended {
            self.run_streaming(job, options, job_id, &input_ext).await?
        } else {
            self.run_fallback(job, options, job_id, &input_ext).await?
        };

        self.publish(job_id, Phase::FinaliseSize, None).await;
        self.job_store.update_status(job_id, JobStatus::Completed, Some(output_ref), None).await?;

        // Give eventually-consistent readers (the download streamer's own
        // head probe) a moment to observe the just-completed upload.
        tokio::time::sleep(Duration::from_millis(250)).await;

        self.progress.mark_complete(job_id).await.ok();
        Ok(())
    }

    async fn publish(&self, job_id: &JobId, phase: Phase, override_percent: Option<i8>) {
        let record = ProgressRecord {
            job_id: job_id.as_str().to_string(),
            progress: override_percent.unwrap_or_else(|| phase.floor()),
            stage: phase.stage().to_string(),
            current_time: None,
            total_duration: None,
            estimated_remaining_sec: None,
            updated_at: now_millis(),
            error: None,
        };
        if let Err(err) = self.progress.set(&record).await {
            warn!(job_id = %job_id, error = %err, "failed to publish progress");
        }
    }

    async fn run_streaming(&self, job: &Job, options: &ConvertOptions, job_id: &JobId, input_ext: &str) -> Result<BlobRef> {
        self.supervisor.ensure_ready(&self.transcoder_path).await?;
        self.publish(job_id, Phase::SpawnTool, None).await;

        let args = build_tool_args(input_ext, &options.format, &options.quality, None, None);
        let mut handle = self.supervisor.spawn(job_id, &self.transcoder_path, &args)?;
        self.publish(job_id, Phase::WirePipeline, None).await;

        let mut stdin = handle.stdin.take().expect("transcoder spawned with a piped stdin");
        let mut stdout = handle.stdout.take().expect("transcoder spawned with a piped stdout");
        let stderr_lines = handle.stderr_lines();

        self.publish(job_id, Phase::ConnectStreams, None).await;
        self.publish(job_id, Phase::Streaming, None).await;

        let mut source = self.storage.get_stream(&job.input_key).await?;
        let write_task = tokio::spawn(async move {
            while let Some(chunk) = source.try_next().await.map_err(|source| PipelineError::Io {
                operation: "read_input_stream",
                source: std::io::Error::other(source),
            })? {
                stdin.write_all(&chunk).await.map_err(|source| PipelineError::Io { operation: "write_stdin", source })?;
            }
            stdin.shutdown().await.map_err(|source| PipelineError::Io { operation: "close_stdin", source })?;
            Ok::<(), PipelineError>(())
        });

        let progress_task = {
            let progress = self.progress.clone();
            let job_id = job_id.clone();
            tokio::spawn(async move { pump_stderr_progress(&progress, &job_id, stderr_lines).await })
        };

        let output_ref = self.drain_stdout_to_storage(job_id, &mut stdout, job, options).await?;
        drop(stdout);

        handle.wait(job_id).await?;
        join_spawned(write_task).await?;
        join_spawned(progress_task).await?;

        Ok(output_ref)
    }

    async fn drain_stdout_to_storage(&self, job_id: &JobId, stdout: &mut ChildStdout, job: &Job, options: &ConvertOptions) -> Result<BlobRef> {
        let output_key = format!("conversions/{job_id}.{}", options.format);
        let content_type = format::lookup(&options.format).map_or("application/octet-stream", |descriptor| descriptor.mime_type);

        let mut upload = self.storage.create_multipart_upload(&output_key, content_type).await?;
        let upload_id = upload.upload_id().to_string();

        // Parts are uploaded with up to `MULTIPART_MAX_INFLIGHT` requests in
        // flight at once; the semaphore bounds concurrency while stdout
        // keeps being read so peak memory stays bounded regardless of
        // input size.
        let inflight = Arc::new(Semaphore::new(MULTIPART_MAX_INFLIGHT));
        let mut part_uploads: Vec<JoinHandle<Result<audiocore_storage::CompletedPart>>> = Vec::new();

        let mut buffer = BytesMut::with_capacity(MULTIPART_PART_SIZE);
        let mut read_buf = [0u8; 64 * 1024];
        let mut part_number: i32 = 1;
        let mut first_bytes_seen = false;
        let mut upload_started = false;
        let mut total_uploaded: u64 = 0;

        let result: Result<()> = async {
            loop {
                let read = stdout.read(&mut read_buf).await.map_err(|source| PipelineError::Io { operation: "read_stdout", source })?;
                if read == 0 {
                    break;
                }
                if !first_bytes_seen {
                    first_bytes_seen = true;
                    self.publish(job_id, Phase::OutputBytesObserved, None).await;
                }
                buffer.extend_from_slice(&read_buf[..read]);
                total_uploaded += read as u64;

                if buffer.len() >= MULTIPART_PART_SIZE {
                    if !upload_started {
                        upload_started = true;
                        self.publish(job_id, Phase::UploadStarted, None).await;
                    }
                    let part = buffer.split_to(MULTIPART_PART_SIZE).freeze();
                    part_uploads.push(self.spawn_part_upload(&inflight, &output_key, &upload_id, part_number, part));
                    part_number += 1;
                }
            }

            if !buffer.is_empty() {
                if !upload_started {
                    upload_started = true;
                    self.publish(job_id, Phase::UploadStarted, None).await;
                }
                part_uploads.push(self.spawn_part_upload(&inflight, &output_key, &upload_id, part_number, buffer.freeze()));
            }
            if !upload_started {
                self.publish(job_id, Phase::UploadStarted, None).await;
            }
            Ok(())
        }
        .await;

        if let Err(err) = result {
            self.storage.abort_multipart_upload(&output_key, &upload_id).await.ok();
            return Err(err);
        }

        for handle in part_uploads {
            match join_spawned(handle).await {
                Ok(part) => upload.record_part(part),
                Err(err) => {
                    self.storage.abort_multipart_upload(&output_key, &upload_id).await.ok();
                    return Err(err);
                }
            }
        }

        self.storage.complete_multipart_upload(upload).await?;
        let size = self.storage.head(&output_key).await.map(|meta| meta.size_bytes).unwrap_or(total_uploaded);
        Ok(BlobRef {
            bucket: job.input_ref().bucket,
            key: output_key,
            size,
        })
    }

    fn spawn_part_upload(&self, inflight: &Arc<Semaphore>, key: &str, upload_id: &str, part_number: i32, body: Bytes) -> JoinHandle<Result<audiocore_storage::CompletedPart>> {
        let storage = self.storage.clone();
        let inflight = Arc::clone(inflight);
        let key = key.to_string();
        let upload_id = upload_id.to_string();
        tokio::spawn(async move {
            let _permit = inflight.acquire_owned().await.expect("part-upload semaphore was closed while in use");
            storage.upload_part(&key, &upload_id, part_number, body).await.map_err(PipelineError::Storage)
        })
    }

    async fn run_fallback(&self, job: &Job, options: &ConvertOptions, job_id: &JobId, input_ext: &str) -> Result<BlobRef> {
        self.supervisor.ensure_ready(&self.transcoder_path).await?;
        self.publish(job_id, Phase::SpawnTool, None).await;

        let temp_dir = TempJobDir::create(job_id.as_str()).map_err(|source| PipelineError::Io { operation: "create_temp_dir", source })?;
        let input_path = temp_dir.path().join(format!("input.{input_ext}"));
        let output_path = temp_dir.path().join(format!("output.{}", options.format));

        let input_bytes = self.storage.get(&job.input_key).await?;
        tokio::fs::write(&input_path, &input_bytes).await.map_err(|source| PipelineError::Io { operation: "write_temp_input", source })?;

        self.publish(job_id, Phase::WirePipeline, None).await;

        let args = build_tool_args(input_ext, &options.format, &options.quality, Some(&input_path), Some(&output_path));
        let mut handle = self.supervisor.spawn(job_id, &self.transcoder_path, &args)?;
        self.publish(job_id, Phase::ConnectStreams, None).await;
        self.publish(job_id, Phase::Streaming, None).await;

        drop(handle.stdin.take());
        drop(handle.stdout.take());
        let stderr_lines = handle.stderr_lines();
        pump_stderr_progress(&self.progress, job_id, stderr_lines).await?;

        handle.wait(job_id).await?;

        self.publish(job_id, Phase::OutputBytesObserved, None).await;
        let output_bytes = tokio::fs::read(&output_path).await.map_err(|source| PipelineError::Io { operation: "read_temp_output", source })?;
        drop(temp_dir);

        self.publish(job_id, Phase::UploadStarted, None).await;
        let output_key = format!("conversions/{job_id}.{}", options.format);
        let content_type = format::lookup(&options.format).map_or("application/octet-stream", |descriptor| descriptor.mime_type);
        let size = output_bytes.len() as u64;
        self.storage.put_small(&output_key, Bytes::from(output_bytes), content_type).await?;

        Ok(BlobRef {
            bucket: job.input_ref().bucket,
            key: output_key,
            size,
        })
    }

    async fn fail(&self, job_id: &JobId, message: String) {
        self.progress.mark_failed(job_id, message.clone()).await.ok();
        if let Err(err) = self.job_store.update_status(job_id, JobStatus::Failed, None, Some(message)).await {
            warn!(job_id = %job_id, error = %err, "failed to record job failure after a pipeline run failed");
        }
    }
}

/// Reads stderr lines until the process closes the stream, publishing
/// parser-driven progress within the streaming phase's window and falling
/// back to the synthetic gradient when no `Duration:` header has appeared.
async fn pump_stderr_progress(progress: &ProgressChannel, job_id: &JobId, mut stderr_lines: Lines<BufReader<ChildStderr>>) -> Result<()> {
    let mut parser = StderrParser::new();
    let mut synthetic = SyntheticProgress::new();

    loop {
        match tokio::time::timeout(TICK_INTERVAL, stderr_lines.next_line()).await {
            Ok(Ok(Some(line))) => match parser.feed(&line) {
                Some(ParserEvent::Started) | None => {}
                Some(ParserEvent::Progress { percent, current_time, total_duration }) => {
                    let record = streaming_record(job_id, percent, Some(current_time), total_duration);
                    progress.set(&record).await.ok();
                }
                Some(ParserEvent::Error(message)) => return Err(PipelineError::Transcode { message }),
            },
            Ok(Ok(None)) => break,
            Ok(Err(_)) => break,
            Err(_elapsed) => {
                if !parser.has_duration() {
                    let percent = synthetic.tick();
                    let record = streaming_record(job_id, percent, None, None);
                    progress.set(&record).await.ok();
                }
            }
        }
    }
    Ok(())
}

fn streaming_record(job_id: &JobId, percent: i8, current_time: Option<String>, total_duration: Option<String>) -> ProgressRecord {
    ProgressRecord {
        job_id: job_id.as_str().to_string(),
        progress: percent.clamp(Phase::Streaming.floor(), STREAMING_CEILING),
        stage: Phase::Streaming.stage().to_string(),
        current_time,
        total_duration,
        estimated_remaining_sec: None,
        updated_at: now_millis(),
        error: None,
    }
}

fn build_tool_args(input_ext: &str, output_format: &str, quality: &str, input_path: Option<&Path>, output_path: Option<&Path>) -> Vec<String> {
    let mut args = vec!["-y".to_string(), "-hide_banner".to_string()];
    match input_path {
        Some(path) => {
            args.push("-i".to_string());
            args.push(path.display().to_string());
        }
        None => {
            args.push("-f".to_string());
            args.push(input_ext.to_string());
            args.push("-i".to_string());
            args.push("pipe:0".to_string());
        }
    }
    args.push("-b:a".to_string());
    args.push(quality.to_string());
    args.push("-f".to_string());
    args.push(output_format.to_string());
    match output_path {
        Some(path) => args.push(path.display().to_string()),
        None => args.push("pipe:1".to_string()),
    }
    args
}

fn extension_of(key: &str) -> String {
    key.rsplit('.').next().unwrap_or(key).to_ascii_lowercase()
}

async fn join_spawned<T>(task: JoinHandle<Result<T>>) -> Result<T> {
    match task.await {
        Ok(result) => result,
        Err(join_err) => Err(PipelineError::Io {
            operation: "join_pipeline_task",
            source: std::io::Error::other(join_err),
        }),
    }
}

fn failure_reason(err: &PipelineError) -> &'static str {
    match err {
        PipelineError::TimedOut { .. } => "timeout",
        PipelineError::Storage(_) => "storage",
        PipelineError::Media(_) => "media",
        PipelineError::Data(_) => "data",
        PipelineError::Io { .. } => "io",
        PipelineError::Transcode { .. } => "transcode",
    }
}

fn now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|duration| i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_of_strips_the_last_path_segment() {
        assert_eq!(extension_of("uploads/job-1/source.wav"), "wav");
        assert_eq!(extension_of("no-extension"), "no-extension");
    }

    #[test]
    fn build_tool_args_uses_pipes_for_streaming() {
        let args = build_tool_args("wav", "mp3", "192k", None, None);
        assert!(args.contains(&"pipe:0".to_string()));
        assert!(args.contains(&"pipe:1".to_string()));
    }

    #[test]
    fn build_tool_args_uses_file_paths_for_fallback() {
        let input = Path::new("/tmp/audiocore/job-1/input.mp3");
        let output = Path::new("/tmp/audiocore/job-1/output.wav");
        let args = build_tool_args("mp3", "wav", "192k", Some(input), Some(output));
        assert!(args.iter().any(|arg| arg.contains("input.mp3")));
        assert!(args.iter().any(|arg| arg.contains("output.wav")));
        assert!(!args.contains(&"pipe:0".to_string()));
    }

    #[test]
    fn failure_reason_labels_each_variant() {
        assert_eq!(failure_reason(&PipelineError::TimedOut { after_ms: 1 }), "timeout");
        assert_eq!(failure_reason(&PipelineError::Transcode { message: "boom".to_string() }), "transcode");
    }
}
