//! Experiment storage: one directory per experiment.
//!
//! ```text
//! <root>/<experiment id>/manifest.json
//!                       /data.jsonl
//!                       /log.jsonl
//! ```

use crate::sink::{JsonlSink, read_jsonl};
use crate::types::{DataRecord, ExperimentManifest, LogRecord};
use crate::{ResultsError, ResultsResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MANIFEST: &str = "manifest.json";
const DATA: &str = "data.jsonl";
const LOG: &str = "log.jsonl";

#[derive(Debug, Clone)]
pub struct ExperimentStore {
    root_dir: PathBuf,
}

impl ExperimentStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// `.reflux/experiments` beside the protocol file.
    pub fn for_protocol(protocol_path: &Path) -> ResultsResult<Self> {
        let protocol_dir = protocol_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: "protocol path has no parent directory".to_string(),
            })?;
        Self::new(protocol_dir.join(".reflux").join("experiments"))
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    pub fn experiment_dir(&self, experiment_id: &str) -> PathBuf {
        self.root_dir.join(experiment_id)
    }

    pub fn data_path(&self, experiment_id: &str) -> PathBuf {
        self.experiment_dir(experiment_id).join(DATA)
    }

    pub fn log_path(&self, experiment_id: &str) -> PathBuf {
        self.experiment_dir(experiment_id).join(LOG)
    }

    pub fn has_experiment(&self, experiment_id: &str) -> bool {
        self.experiment_dir(experiment_id).join(MANIFEST).exists()
    }

    /// Write (or overwrite) the manifest.
    pub fn save_manifest(&self, manifest: &ExperimentManifest) -> ResultsResult<()> {
        let dir = self.experiment_dir(&manifest.experiment_id);
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(manifest)?;
        fs::write(dir.join(MANIFEST), json)?;
        debug!("Saved manifest of experiment {}", manifest.experiment_id);
        Ok(())
    }

    pub fn load_manifest(&self, experiment_id: &str) -> ResultsResult<ExperimentManifest> {
        let path = self.experiment_dir(experiment_id).join(MANIFEST);
        if !path.exists() {
            return Err(ResultsError::ExperimentNotFound {
                experiment_id: experiment_id.to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn data_sink(&self, experiment_id: &str) -> ResultsResult<JsonlSink> {
        JsonlSink::open(self.data_path(experiment_id))
    }

    pub fn log_sink(&self, experiment_id: &str) -> ResultsResult<JsonlSink> {
        JsonlSink::open(self.log_path(experiment_id))
    }

    /// Stored datapoints; empty when no data file was written.
    pub fn load_data(&self, experiment_id: &str) -> ResultsResult<Vec<DataRecord>> {
        self.load_lines(experiment_id, DATA)
    }

    pub fn load_log(&self, experiment_id: &str) -> ResultsResult<Vec<LogRecord>> {
        self.load_lines(experiment_id, LOG)
    }

    fn load_lines<T: serde::de::DeserializeOwned>(
        &self,
        experiment_id: &str,
        file: &str,
    ) -> ResultsResult<Vec<T>> {
        if !self.has_experiment(experiment_id) {
            return Err(ResultsError::ExperimentNotFound {
                experiment_id: experiment_id.to_string(),
            });
        }
        let path = self.experiment_dir(experiment_id).join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_jsonl(&path)
    }

    /// All stored experiments, oldest first. Unreadable directories are skipped.
    pub fn list(&self) -> ResultsResult<Vec<ExperimentManifest>> {
        let mut experiments = Vec::new();
        if !self.root_dir.exists() {
            return Ok(experiments);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let experiment_id = entry.file_name().to_string_lossy().to_string();
            match self.load_manifest(&experiment_id) {
                Ok(manifest) => experiments.push(manifest),
                Err(e) => warn!("Skipping {experiment_id}: {e}"),
            }
        }

        experiments.sort_by(|a, b| {
            a.created
                .cmp(&b.created)
                .then_with(|| a.experiment_id.cmp(&b.experiment_id))
        });
        Ok(experiments)
    }

    pub fn delete(&self, experiment_id: &str) -> ResultsResult<()> {
        let dir = self.experiment_dir(experiment_id);
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}
