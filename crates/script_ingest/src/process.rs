use std::{
    collections::BTreeMap,
    fmt,
    path::PathBuf,
    process::{ExitStatus, Stdio},
};

use tokio::process::{Child, Command};
use tracing::info;

use crate::{
    error::ScriptInputError,
    shell::{self, ShellKind},
};

/// One of the three invocations expected from the external program.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Setup,
    Run,
    Finish,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Run => "run",
            Phase::Finish => "finish",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spawns the configured command through the platform shell, one phase at a
/// time.
///
/// Every invocation is `<shell> <flag> "<command> <phase> <escaped args>"`,
/// run in the configured working directory with the environment overlay
/// merged onto the inherited environment.
#[derive(Clone, Debug)]
pub struct ProcessRunner {
    shell: ShellKind,
    command: String,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl ProcessRunner {
    pub fn new(shell: ShellKind, command: impl Into<String>) -> Self {
        Self {
            shell,
            command: command.into(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    /// Working directory for spawned phases; unset inherits the caller's.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Replaces the environment overlay.
    pub fn envs(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Spawns one phase command without waiting.
    ///
    /// The phase name is the first positional argument. Stdout and stderr are
    /// inherited so the external program's output reaches the caller's
    /// console; stdin is a pipe closed right after spawn, so the child reads
    /// EOF (no input is ever sent). The child is killed if its handle is
    /// dropped before it exits.
    pub fn start(
        &self,
        phase: Phase,
        args: &[String],
        extra_env: &[(&str, String)],
    ) -> Result<Child, ScriptInputError> {
        let mut phase_args = Vec::with_capacity(args.len() + 1);
        phase_args.push(phase.as_str().to_string());
        phase_args.extend_from_slice(args);
        let line = shell::command_line(&self.command, &phase_args);
        info!(%phase, command = %line, "running phase command");

        let mut command = Command::new(self.shell.program());
        command
            .arg(self.shell.flag())
            .arg(&line)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }
        for (key, value) in extra_env {
            command.env(key, value);
        }

        let mut child = command
            .spawn()
            .map_err(|source| ScriptInputError::ProcessLaunch { phase, source })?;
        drop(child.stdin.take());
        Ok(child)
    }

    /// Runs one phase command to completion, requiring a zero exit.
    pub async fn run(
        &self,
        phase: Phase,
        args: &[String],
        extra_env: &[(&str, String)],
    ) -> Result<(), ScriptInputError> {
        let child = self.start(phase, args, extra_env)?;
        let status = wait(child, phase).await?;
        ensure_success(phase, status)
    }
}

/// Blocks until the child terminates.
pub(crate) async fn wait(mut child: Child, phase: Phase) -> Result<ExitStatus, ScriptInputError> {
    child
        .wait()
        .await
        .map_err(|source| ScriptInputError::Wait { phase, source })
}

pub(crate) fn ensure_success(phase: Phase, status: ExitStatus) -> Result<(), ScriptInputError> {
    if status.success() {
        Ok(())
    } else {
        Err(ScriptInputError::PhaseExit { phase, status })
    }
}
