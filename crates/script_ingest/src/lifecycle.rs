use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::{
    channel,
    config::ScriptConfig,
    error::{ScriptInputError, SetupResultError},
    process::{Phase, ProcessRunner},
    schema::{Schema, SetupResult},
    shell::ShellKind,
    sink::PageSink,
    workdir::WorkingArea,
};

/// A configured job that has not yet negotiated a schema.
#[derive(Clone, Debug)]
pub struct IngestJob {
    config: ScriptConfig,
    shell: ShellKind,
}

impl IngestJob {
    pub fn new(config: ScriptConfig) -> Self {
        Self::with_shell(config, ShellKind::detect())
    }

    pub fn with_shell(config: ScriptConfig, shell: ShellKind) -> Self {
        Self { config, shell }
    }

    /// Runs the setup phase: creates the working area, writes the embedded
    /// config document, invokes `<command> setup <config> <setup>`, and loads
    /// the negotiated result the program writes back.
    ///
    /// A nonzero exit, a failed launch, or an unloadable setup document all
    /// abort the job before any run phase is invoked.
    pub async fn setup(self) -> Result<IngestSession, ScriptInputError> {
        let workdir = WorkingArea::create()?;
        write_config_document(&self.config, &workdir).await?;

        let runner = runner_for(&self.config, self.shell);
        let config_path = workdir.config_path();
        let setup_path = workdir.setup_path();
        runner
            .run(
                Phase::Setup,
                &[
                    config_path.display().to_string(),
                    setup_path.display().to_string(),
                ],
                &[],
            )
            .await?;

        let setup = load_setup_result(&setup_path).await?;
        info!(
            columns = setup.columns.len(),
            tasks = setup.tasks,
            workdir = %workdir.root().display(),
            "schema negotiated"
        );
        Ok(IngestSession {
            config: self.config,
            shell: self.shell,
            workdir,
            setup,
        })
    }
}

/// A job whose schema and task count have been negotiated.
///
/// The negotiated result lives in `setup.yml` inside the working area, so a
/// session can also be re-entered from a separate process via
/// [`IngestSession::resume`]; run and finish phases assume no in-memory
/// sharing with the process that performed setup.
#[derive(Clone, Debug)]
pub struct IngestSession {
    config: ScriptConfig,
    shell: ShellKind,
    workdir: WorkingArea,
    setup: SetupResult,
}

impl IngestSession {
    /// Re-enters a negotiated session from its persisted working area.
    pub async fn resume(
        config: ScriptConfig,
        working_dir: impl Into<PathBuf>,
    ) -> Result<Self, ScriptInputError> {
        let workdir = WorkingArea::open(working_dir);
        let setup = load_setup_result(&workdir.setup_path()).await?;
        Ok(Self {
            config,
            shell: ShellKind::detect(),
            workdir,
            setup,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.setup.columns
    }

    pub fn task_count(&self) -> usize {
        self.setup.tasks
    }

    pub fn working_dir(&self) -> &Path {
        self.workdir.root()
    }

    /// Runs one task: `<command> run <setup> <output> <index>` with
    /// `INDEX=<index>` in the environment, decoding the task's output into
    /// `sink` through the per-task output channel.
    ///
    /// Tasks are independent; the host decides where and in what order they
    /// execute. Each owns its output artifact exclusively.
    pub async fn run_task(
        &self,
        task_index: usize,
        sink: &mut dyn PageSink,
    ) -> Result<(), ScriptInputError> {
        let runner = runner_for(&self.config, self.shell);
        channel::run_task(
            &runner,
            &self.workdir.setup_path(),
            &self.workdir.task_output_path(task_index),
            task_index,
            self.config.try_named_pipe,
            &self.setup.columns,
            sink,
        )
        .await
    }

    /// Runs the finish phase once the host reports every task complete.
    pub async fn finish(&self) -> Result<(), ScriptInputError> {
        let runner = runner_for(&self.config, self.shell);
        runner
            .run(
                Phase::Finish,
                &[self.workdir.setup_path().display().to_string()],
                &[],
            )
            .await
    }

    /// Removes per-task output artifacts. Idempotent and best-effort.
    pub async fn cleanup(&self) {
        self.workdir.cleanup(self.setup.tasks).await;
    }
}

fn runner_for(config: &ScriptConfig, shell: ShellKind) -> ProcessRunner {
    let mut runner = ProcessRunner::new(shell, config.run.as_str()).envs(config.env.clone());
    if !config.cwd.is_empty() {
        runner = runner.cwd(&config.cwd);
    }
    runner
}

async fn write_config_document(
    config: &ScriptConfig,
    workdir: &WorkingArea,
) -> Result<(), ScriptInputError> {
    let text = serde_yaml::to_string(&config.config).map_err(ScriptInputError::ConfigSerialize)?;
    let path = workdir.config_path();
    fs::write(&path, text)
        .await
        .map_err(|source| ScriptInputError::ConfigWrite { path, source })
}

async fn load_setup_result(path: &Path) -> Result<SetupResult, ScriptInputError> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|source| ScriptInputError::SetupResult {
            path: path.to_path_buf(),
            source: SetupResultError::Read(source),
        })?;
    serde_yaml::from_str(&text).map_err(|source| ScriptInputError::SetupResult {
        path: path.to_path_buf(),
        source: SetupResultError::Parse(source),
    })
}
