use std::ffi::OsStr;
use std::io;
use std::process::{
    Command,
    Output,
};
use std::sync::{
    Arc,
    Mutex,
};

use sysinfo::{
    ProcessRefreshKind,
    RefreshKind,
    System,
    UpdateKind,
};
use tracing::debug;

use crate::{
    Pid,
    Shim,
};

/// Program used to list the process table.
pub const PS_PROGRAM: &str = "ps";

/// Lists every process with exactly three columns: pid, parent pid, and the full untruncated
/// command line. The trailing `=` on each column suppresses the header row.
pub const PS_ARGS: &[&str] = &["-A", "-ww", "-o", "pid=", "-o", "ppid=", "-o", "args="];

/// Raw result of running the process listing command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingOutput {
    /// Exit code, `None` when the command was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ListingOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<Output> for ListingOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// A process as reported by the native process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemProcess {
    pub pid: Pid,
    pub ppid: Option<Pid>,
    pub cmd: Vec<String>,
}

/// Interface to the operating system's process table.
#[derive(Debug, Clone, Default)]
pub struct ProcessLister(inner::Inner);

mod inner {
    use std::io;
    use std::sync::{
        Arc,
        Mutex,
    };

    use super::{
        ListingOutput,
        SystemProcess,
    };

    #[derive(Debug, Clone, Default)]
    pub(super) enum Inner {
        #[default]
        Real,
        Fake(Arc<Mutex<Fake>>),
    }

    #[derive(Debug)]
    pub(super) struct Fake {
        pub ps: Result<ListingOutput, (io::ErrorKind, String)>,
        pub system: Vec<SystemProcess>,
        pub invocations: usize,
    }

    impl Default for Fake {
        fn default() -> Self {
            Self {
                ps: Ok(ListingOutput {
                    code: Some(0),
                    ..Default::default()
                }),
                system: Vec::new(),
                invocations: 0,
            }
        }
    }
}

impl ProcessLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fake lister whose `ps` invocation succeeds with no output.
    pub fn new_fake() -> Self {
        Self::from_fake(inner::Fake::default())
    }

    /// Creates a fake lister whose `ps` invocation succeeds and prints `stdout`.
    pub fn from_ps_output(stdout: impl AsRef<[u8]>) -> Self {
        Self::from_fake(inner::Fake {
            ps: Ok(ListingOutput {
                code: Some(0),
                stdout: stdout.as_ref().to_vec(),
                stderr: Vec::new(),
            }),
            ..Default::default()
        })
    }

    /// Creates a fake lister whose `ps` invocation exits with `code` and prints `stderr`.
    pub fn from_ps_failure(code: Option<i32>, stderr: &str) -> Self {
        Self::from_fake(inner::Fake {
            ps: Ok(ListingOutput {
                code,
                stdout: Vec::new(),
                stderr: stderr.as_bytes().to_vec(),
            }),
            ..Default::default()
        })
    }

    /// Creates a fake lister where `ps` cannot be spawned at all.
    pub fn from_spawn_error(kind: io::ErrorKind, message: &str) -> Self {
        Self::from_fake(inner::Fake {
            ps: Err((kind, message.to_owned())),
            ..Default::default()
        })
    }

    /// Creates a fake lister whose native process table contains `processes`.
    pub fn from_system_processes(processes: Vec<SystemProcess>) -> Self {
        Self::from_fake(inner::Fake {
            system: processes,
            ..Default::default()
        })
    }

    fn from_fake(fake: inner::Fake) -> Self {
        Self(inner::Inner::Fake(Arc::new(Mutex::new(fake))))
    }

    /// Runs `ps` once and returns its raw output.
    pub fn ps_listing(&self) -> io::Result<ListingOutput> {
        use inner::Inner;
        match &self.0 {
            Inner::Real => {
                debug!(program = PS_PROGRAM, args = ?PS_ARGS, "listing processes");
                Command::new(PS_PROGRAM).args(PS_ARGS).output().map(ListingOutput::from)
            },
            Inner::Fake(fake) => {
                let mut fake = fake.lock().unwrap();
                fake.invocations += 1;
                match &fake.ps {
                    Ok(output) => Ok(output.clone()),
                    Err((kind, message)) => Err(io::Error::new(*kind, message.clone())),
                }
            },
        }
    }

    /// Reads the native process table once.
    pub fn system_processes(&self) -> Vec<SystemProcess> {
        use inner::Inner;
        match &self.0 {
            Inner::Real => {
                debug!("reading native process table");
                let system = System::new_with_specifics(
                    RefreshKind::new().with_processes(ProcessRefreshKind::new().with_cmd(UpdateKind::Always)),
                );
                system
                    .processes()
                    .values()
                    .filter_map(|process| {
                        Some(SystemProcess {
                            pid: Pid::from_u32(process.pid().as_u32())?,
                            ppid: process.parent().and_then(|ppid| Pid::from_u32(ppid.as_u32())),
                            cmd: process
                                .cmd()
                                .iter()
                                .map(|arg| OsStr::new(arg).to_string_lossy().into_owned())
                                .collect(),
                        })
                    })
                    .collect()
            },
            Inner::Fake(fake) => {
                let mut fake = fake.lock().unwrap();
                fake.invocations += 1;
                fake.system.clone()
            },
        }
    }

    /// Number of times a fake lister was asked for a listing. Always `0` for the real lister.
    pub fn invocations(&self) -> usize {
        match &self.0 {
            inner::Inner::Real => 0,
            inner::Inner::Fake(fake) => fake.lock().unwrap().invocations,
        }
    }
}

impl Shim for ProcessLister {
    fn is_real(&self) -> bool {
        matches!(self.0, inner::Inner::Real)
    }
}
