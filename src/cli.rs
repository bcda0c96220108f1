//! Command-line interface for runcmd.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::execution::CommandSpec;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Command line passed with `-c`.
    pub cmd: Option<String>,
    /// Command given as trailing arguments, run without word splitting.
    pub argv: Vec<String>,
    /// Timeout in seconds; `<= 0` waits indefinitely.
    pub timeout: i64,
    /// Run the command through the shell.
    pub shell: bool,
    /// Directory to run the command in.
    pub cwd: Option<PathBuf>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Supervision poll interval in milliseconds (overrides config file).
    pub poll_interval_ms: Option<u64>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

impl Args {
    /// Build the command spec described by these arguments.
    ///
    /// Returns `None` when no command was supplied. Surrounding double quotes
    /// on `-c` are stripped, so `-c"echo hi"` style invocations work.
    pub fn command_spec(&self) -> Option<CommandSpec> {
        let spec = match (&self.cmd, self.argv.is_empty()) {
            (Some(cmd), _) => CommandSpec::new(cmd.trim_matches('"')),
            (None, false) => CommandSpec::argv(self.argv.iter().cloned()),
            (None, true) => return None,
        };

        let mut spec = spec.shell(self.shell).timeout_secs(self.timeout);
        if let Some(dir) = &self.cwd {
            spec = spec.working_dir(dir);
        }
        Some(spec)
    }
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("cmd") => {
                result.cmd = Some(parser.value()?.string()?);
            }
            Short('t') | Long("timeout") => {
                let value: String = parser.value()?.string()?;
                result.timeout = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidValue("timeout", value))?;
            }
            Short('s') | Long("shell") => {
                result.shell = true;
            }
            Short('d') | Long("cwd") => {
                result.cwd = Some(parser.value()?.into());
            }
            Long("config") => {
                result.config = Some(parser.value()?.into());
            }
            Long("poll-interval") => {
                let value: String = parser.value()?.string()?;
                let ms = value
                    .parse::<u64>()
                    .ok()
                    .filter(|ms| *ms > 0)
                    .ok_or(ArgsError::InvalidValue("poll-interval", value))?;
                result.poll_interval_ms = Some(ms);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.string()?);
            }
            Value(val) => {
                // Everything from the first positional on is the command.
                result.argv.push(val.string()?);
                for raw in parser.raw_args()? {
                    result.argv.push(
                        raw.into_string()
                            .map_err(|raw| ArgsError::NonUtf8(raw.to_string_lossy().into()))?,
                    );
                }
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    if result.cmd.is_some() && !result.argv.is_empty() {
        return Err(ArgsError::ConflictingCommand);
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"runcmd {version}
Run a command with a timeout, killing its whole process tree if it overruns

USAGE:
    runcmd [OPTIONS] -c <CMD>
    runcmd [OPTIONS] -- <PROGRAM> [ARGS]...

OPTIONS:
    -c, --cmd <CMD>          Command to run, e.g. -c "echo Hello"
    -t, --timeout <SECS>     Seconds to wait before killing the command [default: 0 = forever]
    -s, --shell              Run the command through the shell
    -d, --cwd <DIR>          Directory to run the command in [default: current]
        --config <FILE>      Path to configuration file (JSON)
        --poll-interval <MS> Supervision poll interval in milliseconds [default: 500]
    -l, --log-level <LVL>    Log level (error, warn, info, debug, trace)
    -h, --help               Print help
    -V, --version            Print version

EXIT STATUS:
    >= 0   exit code of the command
    -1     internal error (output could not be written)
    -2     command timed out
    -3     interrupted
    -4     invalid input (bad command, missing shell, bad directory)

ENVIRONMENT VARIABLES:
    RUNCMD_POLL_INTERVAL_MS  Poll interval (overrides config)
    RUNCMD_KILL_GRACE_MS     Grace between SIGTERM and SIGKILL (overrides config)
    RUNCMD_DRAIN_GRACE_MS    Time allowed to drain output after exit (overrides config)
    RUNCMD_LOG_LEVEL         Log level (overrides config)
    RUST_LOG                 Alternative log level setting

EXAMPLES:
    # Shell command with a 5 second limit
    runcmd -s -t 5 -c "make test | tee test.log"

    # Program with arguments, no shell
    runcmd -t 10 -- ls -la /tmp
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("runcmd {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Trailing command argument that is not valid UTF-8.
    NonUtf8(String),
    /// Both `-c` and trailing arguments were given.
    ConflictingCommand,
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::NonUtf8(arg) => write!(f, "argument is not valid UTF-8: '{}'", arg),
            Self::ConflictingCommand => {
                write!(f, "give the command either with -c or after --, not both")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
