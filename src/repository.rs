use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::config::SolverConfig;
use crate::data::{DistributionInput, DistributionOutput};
use crate::error::AppError;
use crate::solver;

/// Storage boundary a distribution run reads its snapshot from and writes its result to.
pub trait DistributionRepository: Send + Sync {
    fn load_snapshot(&self) -> Result<DistributionInput, RepositoryError>;
    fn store_distribution(&self, output: &DistributionOutput) -> Result<(), RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("snapshot not found: {0}")]
    NotFound(String),
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Loads a snapshot, solves it and hands the result back to the repository.
pub fn run_distribution<R>(repository: &R, config: &SolverConfig) -> Result<DistributionOutput, AppError>
where
    R: DistributionRepository + ?Sized,
{
    let input = repository.load_snapshot()?;
    let output = solver::solve(&input, config)?;
    repository.store_distribution(&output)?;
    Ok(output)
}

/// Keeps one snapshot and every stored result in memory.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    snapshot: DistributionInput,
    stored: Mutex<Vec<DistributionOutput>>,
}

impl InMemoryRepository {
    pub fn new(snapshot: DistributionInput) -> Self {
        Self {
            snapshot,
            stored: Mutex::new(Vec::new()),
        }
    }

    pub fn stored(&self) -> Result<Vec<DistributionOutput>, RepositoryError> {
        let guard = self.stored.lock().map_err(|err| RepositoryError::Unavailable(err.to_string()))?;
        Ok(guard.clone())
    }
}

impl DistributionRepository for InMemoryRepository {
    fn load_snapshot(&self) -> Result<DistributionInput, RepositoryError> {
        Ok(self.snapshot.clone())
    }

    fn store_distribution(&self, output: &DistributionOutput) -> Result<(), RepositoryError> {
        let mut guard = self.stored.lock().map_err(|err| RepositoryError::Unavailable(err.to_string()))?;
        guard.push(output.clone());
        Ok(())
    }
}

/// Reads the snapshot from a JSON file; the result goes to `output` or stdout.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    input: PathBuf,
    output: Option<PathBuf>,
}

impl JsonFileRepository {
    pub fn new(input: impl Into<PathBuf>, output: Option<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output,
        }
    }
}

impl DistributionRepository for JsonFileRepository {
    fn load_snapshot(&self) -> Result<DistributionInput, RepositoryError> {
        if !self.input.exists() {
            return Err(RepositoryError::NotFound(self.input.display().to_string()));
        }
        let raw = fs::read_to_string(&self.input)?;
        let input = serde_json::from_str(&raw)?;
        info!("Loaded snapshot from {}.", self.input.display());
        Ok(input)
    }

    fn store_distribution(&self, output: &DistributionOutput) -> Result<(), RepositoryError> {
        let json = serde_json::to_string_pretty(output)?;
        match &self.output {
            Some(path) => {
                fs::write(path, json)?;
                info!("Wrote distribution to {}.", path.display());
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}
