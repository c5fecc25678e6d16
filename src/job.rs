//! Render jobs: read a local file, classify it, render, write the result.
//!
//! A [`JobContext`] bundles the configuration, the font resolver and the
//! task store. Jobs are registered on submit and then executed, usually on
//! a [`RenderPool`](crate::pool::RenderPool).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::ServiceError;
use crate::file_type::{file_extension, generate_output_filename, RequestedType};
use crate::pool::RenderPool;
use crate::task::{TaskRecord, TaskStore};
use crate::watermark::{self, validate_text, FontResolver, WatermarkOptions};

/// One file to render.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub task_id: String,
    pub source: PathBuf,
    pub text: String,
    pub requested: RequestedType,
    pub options: Option<WatermarkOptions>,
}

#[derive(Clone)]
pub struct JobContext {
    config: Arc<Config>,
    fonts: Arc<dyn FontResolver>,
    store: TaskStore,
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("output_dir", &self.config.output_dir)
            .field("tasks", &self.store.len())
            .finish()
    }
}

impl JobContext {
    pub fn new(config: Arc<Config>, fonts: Arc<dyn FontResolver>, store: TaskStore) -> Self {
        Self {
            config,
            fonts,
            store,
        }
    }

    /// Context with the resolver picked by `fonts.strategy`.
    pub fn from_config(config: Config) -> Self {
        let fonts = watermark::build_resolver(config.fonts.to_search_config(), config.fonts.strategy);
        Self::new(Arc::new(config), fonts, TaskStore::new())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn fonts(&self) -> &Arc<dyn FontResolver> {
        &self.fonts
    }

    /// Register a pending task for `source`.
    pub fn submit(
        &self,
        source: impl Into<PathBuf>,
        text: impl Into<String>,
        requested: RequestedType,
        options: Option<WatermarkOptions>,
    ) -> RenderJob {
        let source = source.into();
        let task_id = self.store.create(source.clone());
        tracing::info!(task_id = %task_id, source = %source.display(), "task submitted");

        RenderJob {
            task_id,
            source,
            text: text.into(),
            requested,
            options,
        }
    }

    /// Execute `job`, recording every phase change in the task store.
    pub fn run(&self, job: &RenderJob) -> Result<PathBuf, ServiceError> {
        self.store.mark_processing(&job.task_id);

        match self.execute(job) {
            Ok(output) => {
                self.store.mark_completed(&job.task_id, output.clone());
                tracing::info!(
                    task_id = %job.task_id,
                    output = %output.display(),
                    "task completed"
                );
                Ok(output)
            }
            Err(e) => {
                self.store.mark_failed(&job.task_id, e.to_string());
                tracing::warn!(task_id = %job.task_id, error = %e, "task failed");
                Err(e)
            }
        }
    }

    /// Run every job on `pool` and return the final records in job order.
    pub fn run_all(&self, pool: &RenderPool, jobs: Vec<RenderJob>) -> Vec<TaskRecord> {
        let ids: Vec<String> = jobs.iter().map(|j| j.task_id.clone()).collect();
        pool.map(jobs, |job| {
            // Outcome lands in the store
            let _ = self.run(&job);
        });

        ids.iter().filter_map(|id| self.store.get(id)).collect()
    }

    fn execute(&self, job: &RenderJob) -> Result<PathBuf, ServiceError> {
        validate_text(&job.text)?;
        let options = job.options.as_ref().unwrap_or(&self.config.defaults);
        options.validate()?;

        let extension = file_extension(&job.source);
        let kind = job
            .requested
            .resolve(&extension)
            .ok_or_else(|| ServiceError::UnknownFileType(job.source.clone()))?;

        let data = read_limited(&job.source, self.config.limits.max_file_size)?;

        let output = watermark::render(
            &data,
            &job.text,
            kind.as_str(),
            Some(options),
            &extension,
            self.fonts.clone(),
        )?;

        let dir = &self.config.output_dir;
        std::fs::create_dir_all(dir).map_err(|e| ServiceError::io(dir, e))?;
        let path = dir.join(generate_output_filename(&job.source));
        std::fs::write(&path, output).map_err(|e| ServiceError::io(&path, e))?;
        Ok(path)
    }
}

/// Read `path`, rejecting files above `limit` bytes before loading them.
pub fn read_limited(path: &Path, limit: u64) -> Result<Vec<u8>, ServiceError> {
    let size = std::fs::metadata(path)
        .map_err(|e| ServiceError::io(path, e))?
        .len();
    if size > limit {
        return Err(ServiceError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit,
        });
    }
    std::fs::read(path).map_err(|e| ServiceError::io(path, e))
}
