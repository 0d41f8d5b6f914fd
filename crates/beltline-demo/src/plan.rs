//! Build plans: a named list of commands applied to a fresh world before
//! the first tick.

use std::path::{Path, PathBuf};

use beltline_core::command::{Command, CommandError};
use beltline_core::engine::Engine;
use beltline_core::fixed::Fixed64;
use beltline_core::validation::ScriptStep;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildPlan {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub commands: Vec<Command>,
}

impl BuildPlan {
    /// Load a plan from a TOML file.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| PlanError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Apply every command in order. Rejections are logged and returned
    /// with the index of the offending command; the rest still apply.
    pub fn apply(&self, engine: &mut Engine) -> Vec<(usize, CommandError)> {
        let mut rejected = Vec::new();
        for (index, command) in self.commands.iter().enumerate() {
            if let Err(e) = engine.apply(command) {
                warn!(plan = %self.name, index, error = %e, "plan command rejected");
                rejected.push((index, e));
            }
        }
        rejected
    }

    /// The plan followed by `ticks` ticks of `dt`, for determinism runs.
    pub fn script(&self, dt: Fixed64, ticks: u64) -> Vec<ScriptStep> {
        self.commands
            .iter()
            .cloned()
            .map(ScriptStep::Apply)
            .chain((0..ticks).map(|_| ScriptStep::Tick(dt)))
            .collect()
    }
}
