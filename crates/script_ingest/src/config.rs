use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Job configuration for one external program, using the on-disk wire names.
///
/// `run` is the command string handed to the shell for every phase; `config`
/// is an arbitrary document forwarded verbatim to the setup phase.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ScriptConfig {
    pub run: String,
    #[serde(default = "ScriptConfig::empty_document")]
    pub config: serde_yaml::Value,
    /// Working directory for every phase; empty inherits the caller's.
    #[serde(default)]
    pub cwd: String,
    /// Environment overlay merged onto the inherited environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Whether run-phase output may stream through a named pipe.
    #[serde(default = "ScriptConfig::default_try_named_pipe")]
    pub try_named_pipe: bool,
}

impl ScriptConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            run: command.into(),
            config: Self::empty_document(),
            cwd: String::new(),
            env: BTreeMap::new(),
            try_named_pipe: true,
        }
    }

    pub fn config(mut self, document: serde_yaml::Value) -> Self {
        self.config = document;
        self
    }

    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn try_named_pipe(mut self, enabled: bool) -> Self {
        self.try_named_pipe = enabled;
        self
    }

    fn empty_document() -> serde_yaml::Value {
        serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
    }

    fn default_try_named_pipe() -> bool {
        true
    }
}
