//! Pipeline orchestration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use suncast_archive::{FrameCache, FrameLocator, HttpSource};
use suncast_common::clock::TimeWindow;
use suncast_common::config::{AppConfig, ArchiveConfig, WorkDir};
use suncast_common::error::{SuncastError, SuncastResult};
use suncast_render_engine::{AnimationTools, Assembler, FrameTransformer, ProcessedFrame};
use tempfile::TempDir;

/// Stages of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Init,
    Locate,
    FetchAll,
    TransformAll,
    WriteScratch,
    Encode,
    Optimize,
    Done,
    Cleanup,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Locate => "locate",
            Self::FetchAll => "fetch_all",
            Self::TransformAll => "transform_all",
            Self::WriteScratch => "write_scratch",
            Self::Encode => "encode",
            Self::Optimize => "optimize",
            Self::Done => "done",
            Self::Cleanup => "cleanup",
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// The optimized animation in `gifs/`.
    pub artifact: PathBuf,

    /// Window the run targeted.
    pub window: TimeWindow,

    /// Frames in the animation.
    pub frames: usize,

    /// Frames that had to be downloaded (the rest were cache hits).
    pub downloaded: usize,

    /// Wall time for the whole run.
    pub elapsed: Duration,
}

/// One configured pipeline; `run` may be called repeatedly.
pub struct Pipeline {
    archive: ArchiveConfig,
    http: Arc<dyn HttpSource>,
    assembler: Assembler,
    transformer: FrameTransformer,
    scratch_parent: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(
        config: &AppConfig,
        http: Arc<dyn HttpSource>,
        tools: Arc<dyn AnimationTools>,
    ) -> Self {
        Self {
            archive: config.archive.clone(),
            http,
            assembler: Assembler::new(tools),
            transformer: FrameTransformer::default(),
            scratch_parent: None,
        }
    }

    /// Create scratch directories under `dir` instead of the system
    /// temporary directory.
    pub fn with_scratch_parent(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_parent = Some(dir.into());
        self
    }

    /// Produce the animation for `window` in `work_dir/gifs/`.
    ///
    /// The scratch directory is removed before this returns, on success and
    /// on every failure path.
    pub async fn run(&self, work_dir: &WorkDir, window: &TimeWindow) -> SuncastResult<PipelineReport> {
        let started = Instant::now();
        enter(PipelineStage::Init);
        tracing::info!(window = %window, work_dir = %work_dir.root().display(), "Starting to generate a GIF");

        let scratch = self.create_scratch()?;
        let result = self.run_in(scratch.path(), work_dir, window).await;

        enter(PipelineStage::Cleanup);
        let scratch_path = scratch.path().to_path_buf();
        tracing::debug!(path = %scratch_path.display(), "Cleaning up temporary files");
        if let Err(err) = scratch.close() {
            tracing::warn!(
                path = %scratch_path.display(),
                error = %err,
                "Failed to remove scratch directory"
            );
        }

        let outcome = result?;
        Ok(PipelineReport {
            artifact: outcome.artifact,
            window: *window,
            frames: outcome.frames,
            downloaded: outcome.downloaded,
            elapsed: started.elapsed(),
        })
    }

    fn create_scratch(&self) -> SuncastResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("suncast-");
        let scratch = match &self.scratch_parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        tracing::debug!(path = %scratch.path().display(), "Created scratch directory");
        Ok(scratch)
    }

    async fn run_in(
        &self,
        scratch: &Path,
        work_dir: &WorkDir,
        window: &TimeWindow,
    ) -> SuncastResult<RunOutcome> {
        enter(PipelineStage::Locate);
        let locator = FrameLocator::new(self.http.clone(), &self.archive);
        let frames = locator.locate(window).await?;
        if frames.is_empty() {
            return Err(SuncastError::archive(format!(
                "index for {window} lists no frames matching '{}'",
                self.archive.frame_marker
            )));
        }

        enter(PipelineStage::FetchAll);
        let cache = FrameCache::new(
            self.http.clone(),
            work_dir.originals(),
            Duration::from_millis(self.archive.politeness_delay_ms),
        );
        let mut jobs = Vec::with_capacity(frames.len());
        let mut downloaded = 0;
        for (index, frame) in frames.iter().enumerate() {
            let raw = cache.fetch(frame).await?;
            if raw.downloaded {
                downloaded += 1;
            }
            jobs.push((index, frame.cache_key().to_string(), raw.path));
        }
        tracing::info!(frames = jobs.len(), downloaded, "Frames available locally");

        enter(PipelineStage::TransformAll);
        let transformer = self.transformer;
        let processed = tokio::task::spawn_blocking(move || {
            jobs.into_iter()
                .map(|(index, cache_key, path)| -> SuncastResult<ProcessedFrame> {
                    let image = transformer.transform_file(&path)?;
                    Ok(ProcessedFrame {
                        index,
                        cache_key,
                        image,
                    })
                })
                .collect::<SuncastResult<Vec<_>>>()
        })
        .await
        .map_err(|e| SuncastError::Other(anyhow::anyhow!("transform task failed: {e}")))??;

        let assembler = self.assembler.clone();
        let scratch = scratch.to_path_buf();
        let dest = work_dir.gifs().join(window.artifact_filename());
        let frame_count = processed.len();
        let artifact = tokio::task::spawn_blocking(move || -> SuncastResult<PathBuf> {
            enter(PipelineStage::WriteScratch);
            let frame_paths = assembler.write_frames(&processed, &scratch)?;
            drop(processed);

            enter(PipelineStage::Encode);
            let preliminary = assembler.encode(&frame_paths, &scratch, &dest)?;

            enter(PipelineStage::Optimize);
            assembler.optimize(&preliminary, &dest)
        })
        .await
        .map_err(|e| SuncastError::Other(anyhow::anyhow!("assembly task failed: {e}")))??;

        enter(PipelineStage::Done);
        Ok(RunOutcome {
            artifact,
            frames: frame_count,
            downloaded,
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("archive", &self.archive)
            .field("assembler", &self.assembler)
            .field("transformer", &self.transformer)
            .field("scratch_parent", &self.scratch_parent)
            .finish()
    }
}

struct RunOutcome {
    artifact: PathBuf,
    frames: usize,
    downloaded: usize,
}

fn enter(stage: PipelineStage) {
    tracing::debug!(stage = stage.as_str(), "Pipeline stage");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names_are_unique() {
        let stages = [
            PipelineStage::Init,
            PipelineStage::Locate,
            PipelineStage::FetchAll,
            PipelineStage::TransformAll,
            PipelineStage::WriteScratch,
            PipelineStage::Encode,
            PipelineStage::Optimize,
            PipelineStage::Done,
            PipelineStage::Cleanup,
        ];
        let mut names: Vec<&str> = stages.iter().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), stages.len());
    }
}
