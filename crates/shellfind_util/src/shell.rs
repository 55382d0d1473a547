use std::fmt::Display;
use std::str::FromStr;

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
    trace,
};

use crate::config::Config;
use crate::consts::env_var::SHELL;
use crate::process_info::{
    Backend,
    ProcessSnapshot,
    ProcessTable,
};
use crate::Error;

/// Program names recognized as shells, compared against the lowercased basename of `argv[0]`.
pub const KNOWN_SHELL_NAMES: &[&str] = &["sh", "bash", "dash", "csh", "tcsh", "ksh", "zsh", "fish", "pwsh", "xonsh"];

/// All recognized shells
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Shell {
    // Bourne
    Sh,
    Bash,
    Dash,
    // C
    Csh,
    Tcsh,
    // Common alternatives
    Ksh,
    Zsh,
    Fish,
    // More exotic
    Pwsh,
    Xonsh,
}

impl Display for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shell {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "sh" => Ok(Shell::Sh),
            "bash" => Ok(Shell::Bash),
            "dash" => Ok(Shell::Dash),
            "csh" => Ok(Shell::Csh),
            "tcsh" => Ok(Shell::Tcsh),
            "ksh" => Ok(Shell::Ksh),
            "zsh" => Ok(Shell::Zsh),
            "fish" => Ok(Shell::Fish),
            "pwsh" => Ok(Shell::Pwsh),
            "xonsh" => Ok(Shell::Xonsh),
            _ => Err(()),
        }
    }
}

impl Shell {
    pub fn all() -> &'static [Self] {
        &[
            Shell::Sh,
            Shell::Bash,
            Shell::Dash,
            Shell::Csh,
            Shell::Tcsh,
            Shell::Ksh,
            Shell::Zsh,
            Shell::Fish,
            Shell::Pwsh,
            Shell::Xonsh,
        ]
    }

    /// Classifies a program as invoked, e.g. `/bin/BASH` is [Shell::Bash].
    ///
    /// Only the final `/` separated segment is considered and it is compared case-insensitively.
    pub fn from_program(program: &str) -> Option<Self> {
        basename(program).to_lowercase().parse().ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Shell::Sh => "sh",
            Shell::Bash => "bash",
            Shell::Dash => "dash",
            Shell::Csh => "csh",
            Shell::Tcsh => "tcsh",
            Shell::Ksh => "ksh",
            Shell::Zsh => "zsh",
            Shell::Fish => "fish",
            Shell::Pwsh => "pwsh",
            Shell::Xonsh => "xonsh",
        }
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// How the shell was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MatchKind {
    /// `argv[0]` names a known shell.
    Known { shell: Shell },
    /// `argv[0]` carries the leading `-` of a login shell. `from_hint` is set when the path came
    /// from `$SHELL` rather than from `argv[0]`.
    Login { from_hint: bool },
}

/// A shell found among the ancestors of a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedShell {
    /// The shell as the OS reported it, or the login shell hint.
    pub path: String,
    /// Process the shell was found in.
    pub pid: Pid,
    /// Number of parent links followed from the starting process, `0` for the process itself.
    pub depth: usize,
    pub kind: MatchKind,
}

/// Walks up from `start` through at most `max_depth` processes of `table` looking for a shell.
///
/// Returns `None` when the chain is broken by a pid missing from the table, or when `max_depth`
/// processes were inspected without a match.
pub fn resolve_shell_in<T: ProcessTable + ?Sized>(
    table: &T,
    start: Pid,
    max_depth: usize,
    login_shell_hint: &str,
) -> Option<ResolvedShell> {
    let mut pid = start;
    for depth in 0..max_depth {
        let Some(record) = table.record(pid) else {
            debug!(%pid, depth, "ancestor chain broken");
            return None;
        };

        let Some(program) = record.program() else {
            trace!(%pid, depth, "process has no arguments");
            pid = record.ppid();
            continue;
        };
        trace!(%pid, depth, program, "inspecting ancestor");

        if let Some(shell) = Shell::from_program(program) {
            debug!(%pid, depth, %shell, "found shell");
            return Some(ResolvedShell {
                path: program.to_owned(),
                pid,
                depth,
                kind: MatchKind::Known { shell },
            });
        }

        if let Some(login_program) = program.strip_prefix('-') {
            let from_hint = !login_shell_hint.is_empty();
            debug!(%pid, depth, login_program, from_hint, "found login shell");
            return Some(ResolvedShell {
                path: if from_hint { login_shell_hint } else { login_program }.to_owned(),
                pid,
                depth,
                kind: MatchKind::Login { from_hint },
            });
        }

        pid = record.ppid();
    }

    debug!(%start, max_depth, "no shell within depth limit");
    None
}

/// Finds the shell that `target_pid`, or the current process when `None`, is running in.
///
/// `Ok(None)` means no shell was found, which is an expected outcome. Errors are only returned
/// when the process table itself could not be read.
pub fn resolve_shell(ctx: &Context, target_pid: Option<Pid>, max_depth: usize) -> Result<Option<String>, Error> {
    let resolved = ShellResolver::new(ctx)
        .pid(target_pid)
        .max_depth(max_depth)
        .resolve()?;
    Ok(resolved.map(|shell| shell.path))
}

/// Configurable shell lookup.
#[derive(Debug, Clone)]
pub struct ShellResolver<'a> {
    ctx: &'a Context,
    pid: Option<Pid>,
    config: Config,
}

impl<'a> ShellResolver<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self::with_config(ctx, Config::default())
    }

    pub fn with_config(ctx: &'a Context, config: Config) -> Self {
        Self { ctx, pid: None, config }
    }

    /// Process to start from. Defaults to the current process, as does pid `0`.
    pub fn pid(mut self, pid: Option<Pid>) -> Self {
        self.pid = pid;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn resolve(&self) -> Result<Option<ResolvedShell>, Error> {
        let start = match self.pid {
            Some(pid) if pid != Pid::default() => pid,
            _ => self.ctx.process_info().current_pid(),
        };
        let login_shell_hint = self.ctx.env().get(SHELL).unwrap_or_default();
        let snapshot = ProcessSnapshot::capture(self.ctx, self.config.backend)?;
        Ok(resolve_shell_in(
            &snapshot,
            start,
            self.config.max_depth,
            &login_shell_hint,
        ))
    }
}
