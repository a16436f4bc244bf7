/*!
 * Batch processing of subtitle entries.
 *
 * Entries are split into consecutive batches, each batch's texts are
 * joined with a separator line, sent through a text transform, and the
 * response is split again and zipped back onto the entries by position.
 * Ids and timings never change; only text is replaced.
 */

use log::{debug, info, warn};
use std::future::Future;

use crate::app_config::{GenerationTask, PipelineConfig, ShapePolicy};
use crate::errors::{BatchError, GenerationError};
use crate::subtitle_processor::SubtitleEntry;

/// Separator placed between entry texts inside one request
pub const DELIMITER: &str = "\n---\n";

/// Sequential batch runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPipeline {
    /// Entries per request, at least 1
    batch_size: usize,

    /// Handling of responses whose segment count does not match
    shape_policy: ShapePolicy,
}

impl BatchPipeline {
    /// Create a pipeline; a zero batch size is raised to 1
    pub fn new(batch_size: usize, shape_policy: ShapePolicy) -> Self {
        Self {
            batch_size: batch_size.max(1),
            shape_policy,
        }
    }

    /// Create a pipeline from config
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.batch_size, config.shape_policy)
    }

    /// Entries per request
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of requests needed for `entry_count` entries
    pub fn batch_count(&self, entry_count: usize) -> usize {
        entry_count.div_ceil(self.batch_size)
    }

    /// Run a transform over all entries, one batch at a time
    ///
    /// The transform receives the credential captured for this run and the
    /// joined batch text. `on_progress(completed, total)` fires after each
    /// batch has been merged. The first failure aborts the run and no
    /// partial output is returned.
    pub async fn run<F, Fut, P>(
        &self,
        task: GenerationTask,
        credential: &str,
        entries: &[SubtitleEntry],
        mut transform: F,
        mut on_progress: P,
    ) -> Result<Vec<SubtitleEntry>, BatchError>
    where
        F: FnMut(String, String) -> Fut,
        Fut: Future<Output = Result<String, GenerationError>>,
        P: FnMut(usize, usize),
    {
        let task_name = task.display_name();
        if credential.trim().is_empty() {
            return Err(BatchError::before_dispatch(task_name, GenerationError::MissingCredential));
        }
        let credential = credential.to_string();

        let total = self.batch_count(entries.len());
        info!("{}: {} entries in {} batches", task_name, entries.len(), total);

        let mut results = Vec::with_capacity(entries.len());
        for (index, batch) in entries.chunks(self.batch_size).enumerate() {
            let fail = |source: GenerationError| BatchError {
                task: task_name.to_string(),
                batch: Some(index),
                total,
                source,
            };

            debug!("{}: dispatching batch {}/{} ({} entries)", task_name, index + 1, total, batch.len());
            let batch_text = join_texts(batch);

            let response = transform(credential.clone(), batch_text).await.map_err(fail)?;
            let merged = merge_segments(batch, &response, self.shape_policy).map_err(fail)?;

            results.extend(merged);
            on_progress(index + 1, total);
        }

        info!("{}: completed {} batches", task_name, total);
        Ok(results)
    }
}

/// Join entry texts with the separator
pub fn join_texts(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .map(|entry| entry.text.as_str())
        .collect::<Vec<_>>()
        .join(DELIMITER)
}

/// Zip response segments back onto the batch entries by position
///
/// Under the lenient policy a missing or empty segment keeps the entry's
/// original text and extra segments are dropped.
pub fn merge_segments(
    batch: &[SubtitleEntry],
    response: &str,
    policy: ShapePolicy,
) -> Result<Vec<SubtitleEntry>, GenerationError> {
    let segments: Vec<&str> = response.split(DELIMITER).collect();

    if segments.len() != batch.len() {
        if policy == ShapePolicy::Strict {
            return Err(GenerationError::MalformedResponse(format!(
                "expected {} segments, got {}",
                batch.len(),
                segments.len()
            )));
        }
        if segments.len() < batch.len() {
            warn!(
                "Response has {} segments for {} entries; keeping original text for the rest",
                segments.len(),
                batch.len()
            );
        } else {
            warn!(
                "Response has {} segments for {} entries; ignoring the extra segments",
                segments.len(),
                batch.len()
            );
        }
    }

    Ok(batch
        .iter()
        .enumerate()
        .map(|(index, entry)| match segments.get(index) {
            Some(segment) if !segment.is_empty() => entry.with_text(*segment),
            _ => entry.clone(),
        })
        .collect())
}
