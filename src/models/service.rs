//! Model fitting service.
//!
//! We never fit GLMMs ourselves. A [`ModelFitter`] obtains a finished result
//! from somewhere else and hands back a [`FixedEffects`] handle:
//!
//! - [`ReplayFitter`]: a raw fit JSON saved on disk
//! - [`CommandFitter`]: an external program (e.g. an `Rscript` or `julia`
//!   script) that reads the request from `GCMP_*` environment variables and
//!   prints a raw fit JSON on stdout

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Approximation, DataLayout, ModelFormula};
use crate::error::FitError;
use crate::harmonize::FixedEffects;
use crate::models::raw::RawFit;

/// Everything a backend needs to fit one model.
#[derive(Debug, Clone, PartialEq)]
pub struct FitRequest {
    pub package_id: String,
    /// Formula already written for `layout`.
    pub formula: ModelFormula,
    pub approximation: Approximation,
    pub layout: DataLayout,
    /// CSV file holding the dataset in `layout`.
    pub data_path: PathBuf,
}

/// A source of fitted models.
pub trait ModelFitter {
    fn backend_name(&self) -> &str;

    fn fit(&self, request: &FitRequest) -> Result<Box<dyn FixedEffects>, FitError>;
}

/// How a package's fit is obtained, as written in the comparison config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendSpec {
    /// Replay a stored raw fit.
    Replay { path: PathBuf },
    /// Run a program and parse its stdout.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl BackendSpec {
    /// Build the fitter; relative replay paths resolve against `base_dir`.
    pub fn build(&self, base_dir: &Path) -> Box<dyn ModelFitter> {
        match self {
            BackendSpec::Replay { path } => Box::new(ReplayFitter::new(base_dir.join(path))),
            BackendSpec::Command { program, args } => Box::new(CommandFitter::new(program.clone(), args.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplayFitter {
    path: PathBuf,
}

impl ReplayFitter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModelFitter for ReplayFitter {
    fn backend_name(&self) -> &str {
        "replay"
    }

    fn fit(&self, request: &FitRequest) -> Result<Box<dyn FixedEffects>, FitError> {
        debug!(package = %request.package_id, path = %self.path.display(), "replaying stored fit");
        let text = fs::read_to_string(&self.path)
            .map_err(|e| FitError::Setup(format!("failed to read '{}': {e}", self.path.display())))?;
        RawFit::from_json(&text)?.into_handle()
    }
}

#[derive(Debug, Clone)]
pub struct CommandFitter {
    program: String,
    args: Vec<String>,
}

impl CommandFitter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl ModelFitter for CommandFitter {
    fn backend_name(&self) -> &str {
        "command"
    }

    fn fit(&self, request: &FitRequest) -> Result<Box<dyn FixedEffects>, FitError> {
        debug!(package = %request.package_id, program = %self.program, "running external fitter");

        let output = Command::new(&self.program)
            .args(&self.args)
            .env("GCMP_PACKAGE", &request.package_id)
            .env("GCMP_FORMULA", request.formula.to_string())
            .env("GCMP_FAMILY", request.formula.family.name())
            .env("GCMP_APPROX", request.approximation.to_string())
            .env("GCMP_NAGQ", request.approximation.nodes().to_string())
            .env("GCMP_LAYOUT", request.layout.label())
            .env("GCMP_DATA", &request.data_path)
            .output()
            .map_err(|e| FitError::Setup(format!("failed to start '{}': {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FitError::Setup(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                last_line(&stderr)
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| FitError::unsupported("json", "fitter output is not valid UTF-8"))?;
        RawFit::from_json(&stdout)?.into_handle()
    }
}

fn last_line(text: &str) -> &str {
    text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}
