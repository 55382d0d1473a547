pub mod config;
pub mod consts;
pub mod process_info;
mod shell;

use std::io;
use std::string::FromUtf8Error;

pub use config::Config;
pub use consts::*;
pub use process_info::{
    Backend,
    ProcessRecord,
    ProcessSnapshot,
    ProcessTable,
    build_snapshot,
};
pub use shell::{
    KNOWN_SHELL_NAMES,
    MatchKind,
    ResolvedShell,
    Shell,
    ShellResolver,
    resolve_shell,
    resolve_shell_in,
};
pub use shellfind_os_shim::Pid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The process table could not be read. Resolution cannot continue without it.
    #[error("process table snapshot unavailable: {0}")]
    SnapshotUnavailable(#[from] SnapshotError),
}

/// Why a process table snapshot could not be taken.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to run `{program}`")]
    Spawn {
        program: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with {}: {stderr}", exit_status_display(.code))]
    ExitStatus {
        program: &'static str,
        code: Option<i32>,
        stderr: String,
    },
    #[error("output of `{program}` is not valid UTF-8")]
    Decode {
        program: &'static str,
        #[source]
        source: FromUtf8Error,
    },
}

fn exit_status_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_owned(),
    }
}
