use std::{io::ErrorKind, path::Path, process::Stdio};

use tokio::{fs, process::Command};
use tracing::{debug, warn};

use crate::{
    decode,
    error::ScriptInputError,
    process::{self, Phase, ProcessRunner},
    schema::Schema,
    sink::PageSink,
};

/// How one task's output bytes travel from the child to the decoder.
///
/// Decided per task by a runtime capability probe, never cached globally:
/// pipe creation can fail transiently or per-path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChannelMode {
    /// Named pipe at the output path; decoding overlaps child execution and
    /// peak memory stays bounded by the pipe's kernel buffer.
    Pipe,
    /// Plain file written in full by the child, decoded after it exits.
    File,
}

/// Runs one task's `run` phase and decodes its output into `sink`.
///
/// The task-index environment variable is set alongside the positional index
/// for compatibility with sibling external-program conventions.
pub(crate) async fn run_task(
    runner: &ProcessRunner,
    setup_path: &Path,
    out_path: &Path,
    task_index: usize,
    try_named_pipe: bool,
    schema: &Schema,
    sink: &mut dyn PageSink,
) -> Result<(), ScriptInputError> {
    let args = [
        setup_path.display().to_string(),
        out_path.display().to_string(),
        task_index.to_string(),
    ];
    let extra_env = [("INDEX", task_index.to_string())];

    let mode = select_mode(try_named_pipe, out_path).await;
    debug!(task_index, ?mode, "selected output channel");

    match mode {
        ChannelMode::Pipe => {
            let child = runner.start(Phase::Run, &args, &extra_env)?;
            let reader = match fs::File::open(out_path).await {
                Ok(file) => file,
                Err(source) => {
                    // child is dropped (and killed) before the error surfaces
                    return Err(ScriptInputError::OutputOpen {
                        path: out_path.to_path_buf(),
                        source,
                    });
                }
            };
            match decode::decode_stream(reader, schema, sink).await {
                Ok(records) => {
                    let status = process::wait(child, Phase::Run).await?;
                    process::ensure_success(Phase::Run, status)?;
                    debug!(task_index, records, "task output decoded");
                    Ok(())
                }
                Err(source) => {
                    // Kill the writer before surfacing the decode failure so
                    // it cannot block forever on a full, unread pipe.
                    drop(child);
                    Err(ScriptInputError::Decode { task_index, source })
                }
            }
        }
        ChannelMode::File => {
            remove_stale(out_path).await;
            runner.run(Phase::Run, &args, &extra_env).await?;
            let reader =
                fs::File::open(out_path)
                    .await
                    .map_err(|source| ScriptInputError::OutputOpen {
                        path: out_path.to_path_buf(),
                        source,
                    })?;
            let records = decode::decode_stream(reader, schema, sink)
                .await
                .map_err(|source| ScriptInputError::Decode { task_index, source })?;
            debug!(task_index, records, "task output decoded");
            Ok(())
        }
    }
}

async fn select_mode(try_named_pipe: bool, out_path: &Path) -> ChannelMode {
    if try_named_pipe && try_create_named_pipe(out_path).await {
        ChannelMode::Pipe
    } else {
        ChannelMode::File
    }
}

/// Probes whether a named pipe can back the output path by shelling out to
/// `mkfifo`. Every failure (nonzero exit, missing utility) downgrades to
/// file mode; the probe is never fatal.
async fn try_create_named_pipe(path: &Path) -> bool {
    let mut command = Command::new("mkfifo");
    command
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    match command.status().await {
        Ok(status) => status.success(),
        Err(err) => {
            warn!(error = %err, "mkfifo unavailable, falling back to file output");
            false
        }
    }
}

/// Clears a leftover artifact so file-mode output starts from scratch.
async fn remove_stale(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "failed to remove stale output"),
    }
}
