use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{
    ArgAction,
    Parser,
    ValueEnum,
};
use eyre::Result;
use serde::Serialize;
use shellfind_log::{
    LogArgs,
    initialize_logging,
};
use shellfind_os_shim::{
    Context,
    Env,
};
use shellfind_util::env_var::{
    SHELLFIND_LOG_LEVEL,
    SHELLFIND_LOG_STDERR,
};
use shellfind_util::{
    Backend,
    Config,
    KNOWN_SHELL_NAMES,
    MatchKind,
    Pid,
    ResolvedShell,
    ShellResolver,
};
use tracing::{
    Level,
    debug,
};

/// A shell was found.
pub const EXIT_FOUND: u8 = 0;
/// No shell among the inspected ancestors.
pub const EXIT_NOT_FOUND: u8 = 1;
/// Invalid command line, reported by clap.
pub const EXIT_USAGE: u8 = 2;
/// The process table could not be read.
pub const EXIT_SNAPSHOT_UNAVAILABLE: u8 = 3;
/// Any other failure, e.g. the log file could not be opened.
pub const EXIT_ERROR: u8 = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Outputs only the shell path
    #[default]
    Plain,
    /// Outputs the results as JSON
    Json,
    /// Outputs the results as pretty print JSON
    JsonPretty,
}

impl OutputFormat {
    pub fn print<T, TFn, J, JFn>(&self, text_fn: TFn, json_fn: JFn) -> Result<()>
    where
        T: std::fmt::Display,
        TFn: FnOnce() -> Option<T>,
        J: Serialize,
        JFn: FnOnce() -> J,
    {
        match self {
            OutputFormat::Plain => {
                if let Some(text) = text_fn() {
                    println!("{text}");
                }
            },
            OutputFormat::Json => println!("{}", serde_json::to_string(&json_fn())?),
            OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&json_fn())?),
        }
        Ok(())
    }
}

/// JSON shape of a lookup, `shell` is `null` when nothing was found.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct LookupOutput<'a> {
    shell: Option<&'a str>,
    pid: Option<Pid>,
    depth: Option<usize>,
    kind: Option<MatchKind>,
}

impl<'a> From<Option<&'a ResolvedShell>> for LookupOutput<'a> {
    fn from(resolved: Option<&'a ResolvedShell>) -> Self {
        Self {
            shell: resolved.map(|shell| shell.path.as_str()),
            pid: resolved.map(|shell| shell.pid),
            depth: resolved.map(|shell| shell.depth),
            kind: resolved.map(|shell| shell.kind),
        }
    }
}

/// Find the shell a process is running in
#[derive(Debug, Default, PartialEq, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Process to start from, defaults to this process
    #[arg(long, short = 'p')]
    pub pid: Option<Pid>,
    /// Number of processes to inspect before giving up [env: SHELLFIND_MAX_DEPTH] [default: 6]
    #[arg(long, short = 'd')]
    pub max_depth: Option<usize>,
    /// Where to read the process table from [env: SHELLFIND_BACKEND] [default: ps]
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,
    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t)]
    pub format: OutputFormat,
    /// List the shell names that are recognized and exit
    #[arg(long)]
    pub list_known: bool,
    /// Append logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    /// Increase logging verbosity
    #[arg(long, short = 'v', action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn execute(self) -> Result<ExitCode> {
        let ctx = Context::new();

        // Keep the guard around so buffered logs are flushed on exit.
        let _log_guard = initialize_logging(self.log_args(ctx.env()))?;

        if self.list_known {
            self.format
                .print(|| Some(KNOWN_SHELL_NAMES.join("\n")), || KNOWN_SHELL_NAMES)?;
            return Ok(ExitCode::from(EXIT_FOUND));
        }

        self.run(&ctx)
    }

    /// `-v` flags take precedence over `SHELLFIND_LOG_LEVEL` and always log to stderr.
    fn log_args(&self, env: &Env) -> LogArgs<&PathBuf> {
        let log_level = match self.verbose {
            0 => env.get(SHELLFIND_LOG_LEVEL).ok(),
            1 => Some(Level::WARN.to_string()),
            2 => Some(Level::INFO.to_string()),
            3 => Some(Level::DEBUG.to_string()),
            _ => Some(Level::TRACE.to_string()),
        };

        LogArgs {
            log_level,
            log_to_stderr: self.verbose > 0 || env.get(SHELLFIND_LOG_STDERR).is_ok(),
            log_file_path: self.log_file.as_ref(),
            delete_old_log_file: false,
        }
    }

    fn run(&self, ctx: &Arc<Context>) -> Result<ExitCode> {
        let config = self.config(ctx);
        debug!(?config, pid = ?self.pid, "resolving shell");

        let resolved = ShellResolver::with_config(ctx, config).pid(self.pid).resolve()?;
        self.format.print(
            || resolved.as_ref().map(|shell| shell.path.as_str()),
            || LookupOutput::from(resolved.as_ref()),
        )?;

        Ok(ExitCode::from(match resolved {
            Some(_) => EXIT_FOUND,
            None => EXIT_NOT_FOUND,
        }))
    }

    fn config(&self, ctx: &Context) -> Config {
        Config::from_env(ctx.env()).with_overrides(self.max_depth, self.backend)
    }
}

#[cfg(test)]
mod test {
    use clap::CommandFactory;
    use shellfind_os_shim::ProcessLister;
    use shellfind_util::{
        CLI_BINARY_NAME,
        Shell,
    };

    use super::*;

    #[test]
    fn debug_assert() {
        Cli::command().debug_assert();
    }

    /// Test flag parsing for the top level [Cli]
    #[test]
    fn test_flags() {
        assert_eq!(Cli::parse_from([CLI_BINARY_NAME]), Cli::default());

        assert_eq!(Cli::parse_from([CLI_BINARY_NAME, "-vv", "--pid", "42"]), Cli {
            pid: Some(Pid::from(42)),
            verbose: 2,
            ..Default::default()
        });

        assert_eq!(
            Cli::parse_from([CLI_BINARY_NAME, "-d", "3", "--backend", "sys-info", "-f", "json-pretty"]),
            Cli {
                max_depth: Some(3),
                backend: Some(Backend::SysInfo),
                format: OutputFormat::JsonPretty,
                ..Default::default()
            }
        );

        assert_eq!(Cli::parse_from([CLI_BINARY_NAME, "--list-known"]), Cli {
            list_known: true,
            ..Default::default()
        });
    }

    #[test]
    fn test_invalid_flags() {
        for args in [
            vec![CLI_BINARY_NAME, "--pid", "init"],
            vec![CLI_BINARY_NAME, "--max-depth", "-1"],
            vec![CLI_BINARY_NAME, "--backend", "procfs"],
        ] {
            let err = Cli::try_parse_from(args).unwrap_err();
            assert_eq!(err.exit_code(), EXIT_USAGE as i32);
        }
    }

    #[test]
    fn test_config_flags_override_env() {
        let ctx = Context::builder()
            .with_env_var("SHELLFIND_MAX_DEPTH", "2")
            .with_env_var("SHELLFIND_BACKEND", "sys-info")
            .build_fake();

        let cli = Cli::parse_from([CLI_BINARY_NAME, "--max-depth", "8"]);
        assert_eq!(cli.config(&ctx), Config {
            max_depth: 8,
            backend: Backend::SysInfo,
        });
    }

    #[test]
    fn test_log_args() {
        let quiet = Env::new_fake();
        let configured = Env::from_slice(&[(SHELLFIND_LOG_LEVEL, "shellfind_util=trace"), (SHELLFIND_LOG_STDERR, "1")]);

        let cli = Cli::parse_from([CLI_BINARY_NAME]);
        assert_eq!(cli.log_args(&quiet), LogArgs {
            log_level: None,
            log_to_stderr: false,
            log_file_path: None,
            delete_old_log_file: false,
        });
        let args = cli.log_args(&configured);
        assert_eq!(args.log_level.as_deref(), Some("shellfind_util=trace"));
        assert!(args.log_to_stderr);

        let cli = Cli::parse_from([CLI_BINARY_NAME, "-vvv", "--log-file", "/tmp/shellfind.log"]);
        let args = cli.log_args(&configured);
        assert_eq!(args.log_level.as_deref(), Some("DEBUG"));
        assert!(args.log_to_stderr);
        assert_eq!(args.log_file_path, Some(&PathBuf::from("/tmp/shellfind.log")));

        let cli = Cli::parse_from([CLI_BINARY_NAME, "-v"]);
        assert_eq!(cli.log_args(&quiet).log_level.as_deref(), Some("WARN"));
        assert!(cli.log_args(&quiet).log_to_stderr);
    }

    #[test]
    fn test_run_exit_codes() {
        let listing = "1 0 /sbin/init\n2 1 -fish\n3 2 python\n";
        let ctx = Context::builder()
            .with_process_lister(ProcessLister::from_ps_output(listing))
            .with_current_pid(Pid::from(3))
            .build_fake();

        let cli = Cli::parse_from([CLI_BINARY_NAME, "--format", "json"]);
        assert_eq!(cli.run(&ctx).unwrap(), ExitCode::from(EXIT_FOUND));

        let cli = Cli::parse_from([CLI_BINARY_NAME, "--pid", "1"]);
        assert_eq!(cli.run(&ctx).unwrap(), ExitCode::from(EXIT_NOT_FOUND));
    }

    #[test]
    fn test_run_snapshot_unavailable() {
        let ctx = Context::builder()
            .with_process_lister(ProcessLister::from_ps_failure(Some(1), "ps: permission denied"))
            .build_fake();
        let err = Cli::default().run(&ctx).unwrap_err();
        assert!(err.downcast_ref::<shellfind_util::Error>().is_some());
    }

    #[test]
    fn test_lookup_output_json() {
        let resolved = ResolvedShell {
            path: "/bin/bash".into(),
            pid: Pid::from(10),
            depth: 1,
            kind: MatchKind::Known { shell: Shell::Bash },
        };
        assert_eq!(
            serde_json::to_value(LookupOutput::from(Some(&resolved))).unwrap(),
            serde_json::json!({
                "shell": "/bin/bash",
                "pid": 10,
                "depth": 1,
                "kind": { "type": "known", "shell": "bash" },
            })
        );
        assert_eq!(
            serde_json::to_value(LookupOutput::from(None)).unwrap(),
            serde_json::json!({ "shell": null, "pid": null, "depth": null, "kind": null })
        );
    }
}
