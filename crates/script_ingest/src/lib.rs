#![forbid(unsafe_code)]
//! Ingestion adapter that delegates data extraction to an arbitrary external
//! program, driven through a three-phase protocol:
//!
//! 1. `<command> setup <config-path> <setup-result-path>`: reads the config
//!    document, writes back a `columns` schema and a `tasks` count.
//! 2. `<command> run <setup-result-path> <output-path> <task-index>`: writes
//!    comma-delimited records matching the negotiated schema, once per task.
//! 3. `<command> finish <setup-result-path>`: teardown.
//!
//! Run-phase output streams through a named pipe when the platform supports
//! one (falling back to a plain file otherwise) and is decoded into typed
//! records pushed to a [`PageSink`].
//!
//! ```rust,no_run
//! use script_ingest::{IngestJob, MemorySink, ScriptConfig};
//! # #[tokio::main]
//! # async fn main() -> Result<(), script_ingest::ScriptInputError> {
//! let session = IngestJob::new(ScriptConfig::new("./script.rb")).setup().await?;
//! let mut sink = MemorySink::new();
//! for task_index in 0..session.task_count() {
//!     session.run_task(task_index, &mut sink).await?;
//! }
//! session.finish().await?;
//! session.cleanup().await;
//! # Ok(()) }
//! ```

mod channel;
mod config;
mod decode;
mod error;
mod lifecycle;
mod process;
mod schema;
mod shell;
mod sink;
mod workdir;

pub use channel::ChannelMode;
pub use config::ScriptConfig;
pub use decode::{decode_stream, DEFAULT_TIMESTAMP_FORMAT, TRUE_STRINGS};
pub use error::{DecodeError, ScriptInputError, SetupResultError};
pub use lifecycle::{IngestJob, IngestSession};
pub use process::{Phase, ProcessRunner};
pub use schema::{Column, ColumnType, Schema, SetupResult};
pub use shell::{command_line, escape_arg, invocation, ShellKind};
pub use sink::{MemorySink, PageSink, TypedValue};
pub use workdir::WorkingArea;
