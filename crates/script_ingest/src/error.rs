use std::{path::PathBuf, process::ExitStatus};

use thiserror::Error;

use crate::{process::Phase, schema::ColumnType};

/// Errors that may occur while driving the external program through its phases.
#[derive(Debug, Error)]
pub enum ScriptInputError {
    #[error("failed to spawn {phase} command: {source}")]
    ProcessLaunch {
        phase: Phase,
        #[source]
        source: std::io::Error,
    },
    #[error("{phase} command exited with {status}")]
    PhaseExit { phase: Phase, status: ExitStatus },
    #[error("failed to wait for {phase} command: {source}")]
    Wait {
        phase: Phase,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create working area: {0}")]
    WorkingArea(#[source] std::io::Error),
    #[error("failed to serialize config document: {0}")]
    ConfigSerialize(#[source] serde_yaml::Error),
    #[error("failed to write config document to `{path}`: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("setup command did not produce a loadable setup result at `{path}`: {source}")]
    SetupResult {
        path: PathBuf,
        #[source]
        source: SetupResultError,
    },
    #[error("failed to open task output `{path}`: {source}")]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("task {task_index}: {source}")]
    Decode {
        task_index: usize,
        #[source]
        source: DecodeError,
    },
}

/// Why a setup result document failed to load.
#[derive(Debug, Error)]
pub enum SetupResultError {
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),
    #[error("parse failed: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Errors raised while decoding delimited output into typed records.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid number of fields (expected {expected} but got {actual})")]
    RecordShape { expected: usize, actual: usize },
    #[error("column `{column}` ({column_type}): cannot parse `{value}`: {message}")]
    FieldParse {
        column: String,
        column_type: ColumnType,
        value: String,
        message: String,
    },
    #[error("failed to read delimited output: {0}")]
    Read(#[from] csv_async::Error),
}
