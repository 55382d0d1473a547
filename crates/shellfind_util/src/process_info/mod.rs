//! Point-in-time snapshots of the process table.
//!
//! A [ProcessSnapshot] is a plain value built from one listing of the process table. It is never
//! refreshed or cached, take a new one for every lookup.

mod native;
mod ps;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{
    Deserialize,
    Serialize,
};
use shellfind_os_shim::{
    Context,
    Pid,
};
use tracing::{
    debug,
    warn,
};

pub use self::ps::parse_ps_listing;
use crate::Error;

/// One process as captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    args: Vec<String>,
    pid: Pid,
    ppid: Pid,
}

impl ProcessRecord {
    pub fn new(pid: Pid, ppid: Pid, args: Vec<String>) -> Self {
        Self { args, pid, ppid }
    }

    /// The argv-style tokens of the command line.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn ppid(&self) -> Pid {
        self.ppid
    }

    /// The first argument, i.e. the program as it was invoked.
    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// Lookup of processes by pid.
///
/// Implemented by [ProcessSnapshot]. The ancestor walk only needs this, so callers can resolve
/// against their own tables.
pub trait ProcessTable {
    fn record(&self, pid: Pid) -> Option<&ProcessRecord>;
}

/// The whole process table at one instant, keyed by pid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSnapshot {
    processes: HashMap<Pid, ProcessRecord>,
}

impl ProcessSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the text printed by `ps -o pid= -o ppid= -o args=`.
    pub fn parse(listing: &str) -> Self {
        parse_ps_listing(listing)
    }

    /// Takes a snapshot using the given backend.
    pub fn capture(ctx: &Context, backend: Backend) -> Result<Self, Error> {
        let snapshot = match backend {
            Backend::Ps => ps::capture(ctx.process_lister())?,
            Backend::SysInfo => native::capture(ctx.process_lister()),
        };
        if snapshot.is_empty() {
            warn!(%backend, "process table snapshot is empty");
        } else {
            debug!(%backend, processes = snapshot.len(), "captured process table");
        }
        Ok(snapshot)
    }

    /// Adds a record, replacing any earlier record with the same pid.
    pub fn insert(&mut self, record: ProcessRecord) {
        self.processes.insert(record.pid, record);
    }

    pub fn get(&self, pid: Pid) -> Option<&ProcessRecord> {
        self.processes.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

impl ProcessTable for ProcessSnapshot {
    fn record(&self, pid: Pid) -> Option<&ProcessRecord> {
        self.get(pid)
    }
}

impl FromIterator<ProcessRecord> for ProcessSnapshot {
    fn from_iter<T: IntoIterator<Item = ProcessRecord>>(iter: T) -> Self {
        let mut snapshot = Self::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

/// Builds a snapshot of the live process table by running `ps`.
pub fn build_snapshot(ctx: &Context) -> Result<ProcessSnapshot, Error> {
    ProcessSnapshot::capture(ctx, Backend::Ps)
}

/// Where the process table is read from.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Run `ps` and parse its output
    #[default]
    Ps,
    /// Read the native process table (`/proc` on Linux)
    SysInfo,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Ps => "ps",
            Backend::SysInfo => "sys-info",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "ps" => Ok(Backend::Ps),
            "sys-info" | "sysinfo" => Ok(Backend::SysInfo),
            _ => Err(()),
        }
    }
}
