//! Lookup settings, resolved from command line flags, then environment variables, then defaults.

use serde::{
    Deserialize,
    Serialize,
};
use shellfind_os_shim::Env;
use tracing::warn;

use crate::consts::DEFAULT_MAX_DEPTH;
use crate::consts::env_var::{
    SHELLFIND_BACKEND,
    SHELLFIND_MAX_DEPTH,
};
use crate::process_info::Backend;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Number of processes inspected, starting with the target, before giving up.
    pub max_depth: usize,
    pub backend: Backend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            backend: Backend::default(),
        }
    }
}

impl Config {
    /// Reads overrides from the environment. Values that fail to parse are logged and ignored.
    pub fn from_env(env: &Env) -> Self {
        let mut config = Self::default();

        if let Ok(value) = env.get(SHELLFIND_MAX_DEPTH) {
            match value.trim().parse() {
                Ok(max_depth) => config.max_depth = max_depth,
                Err(err) => warn!(%value, %err, "ignoring invalid {SHELLFIND_MAX_DEPTH}"),
            }
        }

        if let Ok(value) = env.get(SHELLFIND_BACKEND) {
            match value.trim().to_lowercase().parse() {
                Ok(backend) => config.backend = backend,
                Err(()) => warn!(%value, "ignoring unknown {SHELLFIND_BACKEND}"),
            }
        }

        config
    }

    /// Applies explicit overrides, e.g. from command line flags, on top of `self`.
    pub fn with_overrides(mut self, max_depth: Option<usize>, backend: Option<Backend>) -> Self {
        if let Some(max_depth) = max_depth {
            self.max_depth = max_depth;
        }
        if let Some(backend) = backend {
            self.backend = backend;
        }
        self
    }
}
