mod env;
mod pid;
pub mod process_info;
mod process_lister;

use std::sync::Arc;

pub use env::Env;
pub use pid::Pid;
pub use process_info::ProcessInfo;
pub use process_lister::{
    ListingOutput,
    PS_ARGS,
    PS_PROGRAM,
    ProcessLister,
    SystemProcess,
};

pub trait Shim {
    /// Returns whether or not the shim is a real implementation.
    fn is_real(&self) -> bool;
}

/// Struct that contains the interface to every OS operation the shell lookup performs.
///
/// Reading the environment, asking for the current pid, and listing the process table should all
/// be done through a [Context] so that resolution can be exercised in unit tests against a fake
/// process table.
#[derive(Debug, Clone)]
pub struct Context {
    env: Env,
    process_info: ProcessInfo,
    process_lister: ProcessLister,
}

impl Context {
    /// Returns a new [Context] with real implementations of each OS shim.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            env: Env::default(),
            process_info: ProcessInfo::default(),
            process_lister: ProcessLister::default(),
        })
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn process_info(&self) -> &ProcessInfo {
        &self.process_info
    }

    pub fn process_lister(&self) -> &ProcessLister {
        &self.process_lister
    }
}

#[derive(Default, Debug)]
pub struct ContextBuilder {
    env: Option<Env>,
    process_info: Option<ProcessInfo>,
    process_lister: Option<ProcessLister>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an immutable [Context] using real implementations for each field by default.
    pub fn build(self) -> Arc<Context> {
        Arc::new(Context {
            env: self.env.unwrap_or_default(),
            process_info: self.process_info.unwrap_or_default(),
            process_lister: self.process_lister.unwrap_or_default(),
        })
    }

    /// Builds an immutable [Context] using fake implementations for each field by default.
    pub fn build_fake(self) -> Arc<Context> {
        Arc::new(Context {
            env: self.env.unwrap_or_else(Env::new_fake),
            process_info: self.process_info.unwrap_or_else(|| ProcessInfo::new_fake(Pid::from(1))),
            process_lister: self.process_lister.unwrap_or_else(ProcessLister::new_fake),
        })
    }

    pub fn with_env_var(mut self, key: &str, value: &str) -> Self {
        self.env = match self.env {
            Some(env) if !env.is_real() => {
                unsafe { env.set_var(key, value) };
                Some(env)
            },
            _ => Some(Env::from_slice(&[(key, value)])),
        };
        self
    }

    pub fn with_process_info(mut self, process_info: ProcessInfo) -> Self {
        self.process_info = Some(process_info);
        self
    }

    /// Pretends the calling process has the given pid.
    pub fn with_current_pid(self, pid: Pid) -> Self {
        self.with_process_info(ProcessInfo::new_fake(pid))
    }

    pub fn with_process_lister(mut self, process_lister: ProcessLister) -> Self {
        self.process_lister = Some(process_lister);
        self
    }
}
