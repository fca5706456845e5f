use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{SurferError, SurferResult};
use crate::render::cpu::CpuEvaluatorOpts;
use crate::session::plan::SchedulerOpts;

/// All tunables of a headless surfer session, loadable from JSON.
///
/// Missing fields take their defaults, so `{}` is a valid options file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurferOpts {
    /// Chain planning.
    pub scheduler: SchedulerOpts,
    /// Reference CPU evaluator.
    pub evaluator: CpuEvaluatorOpts,
}

impl SurferOpts {
    /// Parse options from JSON text.
    pub fn from_json_str(s: &str) -> SurferResult<Self> {
        let opts: Self = serde_json::from_str(s)
            .map_err(|e| SurferError::validation(format!("invalid options json: {e}")))?;
        opts.scheduler.validate()?;
        Ok(opts)
    }

    /// Read options from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> SurferResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SurferError::Other(anyhow::anyhow!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/opts.rs"]
mod tests;
