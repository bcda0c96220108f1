//! Command specification and process construction.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

/// What to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    /// A single command line.
    ///
    /// With the shell flag set it is handed to the shell verbatim. Without
    /// it, the whole string is the path of the program to run, so
    /// `"echo hello"` only works through a shell.
    Line(String),
    /// An argument vector; the first element is the program.
    Argv(Vec<String>),
}

impl Program {
    fn is_empty(&self) -> bool {
        match self {
            Program::Line(line) => line.is_empty(),
            Program::Argv(argv) => argv.first().is_none_or(|p| p.is_empty()),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Program::Line(line) => f.write_str(line),
            Program::Argv(argv) => f.write_str(&argv.join(" ")),
        }
    }
}

/// A command to be executed by the runner.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    /// The program to run; `None` means there is nothing to execute.
    pub program: Option<Program>,
    /// Working directory override (if any).
    pub working_dir: Option<PathBuf>,
    /// Environment variables to set on top of the inherited environment.
    pub env: HashMap<String, String>,
    /// Run through the platform shell.
    pub shell: bool,
    /// Maximum execution time; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    /// Create a spec for a command line.
    pub fn new(command_line: impl Into<String>) -> Self {
        Self {
            program: Some(Program::Line(command_line.into())),
            ..Self::default()
        }
    }

    /// Create a spec for an argument vector.
    pub fn argv<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: Some(Program::Argv(argv.into_iter().map(Into::into).collect())),
            ..Self::default()
        }
    }

    /// Set whether to invoke the shell.
    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add multiple environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.env.insert(k.into(), v.into());
        }
        self
    }

    /// Set the execution timeout. A zero duration means no timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = (!duration.is_zero()).then_some(duration);
        self
    }

    /// Set the execution timeout in whole seconds. Values `<= 0` mean no timeout.
    pub fn timeout_secs(mut self, secs: i64) -> Self {
        self.timeout = u64::try_from(secs)
            .ok()
            .filter(|s| *s > 0)
            .map(Duration::from_secs);
        self
    }

    /// Check if there is nothing to execute.
    pub fn is_empty(&self) -> bool {
        self.program.as_ref().is_none_or(Program::is_empty)
    }

    /// Human-readable command text, used in logs and errors.
    pub fn command_text(&self) -> String {
        self.program
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Build the process for this spec.
    ///
    /// Returns `None` for an empty spec. The child gets a null stdin and is
    /// placed in a process group of its own so the whole tree can be signalled
    /// at once. stdout and stderr are left for the caller to wire up.
    pub(crate) fn to_command(&self) -> Option<tokio::process::Command> {
        if self.is_empty() {
            return None;
        }

        let mut cmd = match (self.program.as_ref()?, self.shell) {
            (Program::Line(line), true) => shell_command(line, &[]),
            (Program::Argv(argv), true) => shell_command(&argv[0], &argv[1..]),
            (Program::Line(line), false) => std::process::Command::new(line),
            (Program::Argv(argv), false) => {
                let mut cmd = std::process::Command::new(&argv[0]);
                cmd.args(&argv[1..]);
                cmd
            }
        };

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(&self.env);
        cmd.stdin(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        let mut cmd = tokio::process::Command::from(cmd);
        cmd.kill_on_drop(true);
        Some(cmd)
    }
}

#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// `/bin/sh -c <script> [args...]`; extra arguments become `$0`, `$1`, ...
#[cfg(unix)]
fn shell_command(script: &str, args: &[String]) -> std::process::Command {
    let mut cmd = std::process::Command::new("/bin/sh");
    cmd.arg("-c").arg(script).args(args);
    cmd
}

#[cfg(windows)]
fn shell_command(script: &str, args: &[String]) -> std::process::Command {
    let mut cmd = std::process::Command::new("cmd.exe");
    cmd.arg("/C").arg(script).args(args);
    cmd
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_new() {
        let spec = CommandSpec::new("ls -la");
        assert_eq!(spec.program, Some(Program::Line("ls -la".into())));
        assert!(spec.working_dir.is_none());
        assert!(spec.env.is_empty());
        assert!(spec.timeout.is_none());
        assert!(!spec.shell);
    }

    #[test]
    fn test_spec_chain() {
        let spec = CommandSpec::new("cargo build")
            .working_dir("/project")
            .env("RUST_LOG", "debug")
            .shell(true)
            .timeout(Duration::from_secs(60));

        assert_eq!(spec.working_dir, Some(PathBuf::from("/project")));
        assert_eq!(spec.env.get("RUST_LOG"), Some(&"debug".to_string()));
        assert_eq!(spec.timeout, Some(Duration::from_secs(60)));
        assert!(spec.shell);
    }

    #[test]
    fn test_spec_envs() {
        let vars = [("KEY1", "val1"), ("KEY2", "val2")];
        let spec = CommandSpec::new("env").envs(vars);

        assert_eq!(spec.env.len(), 2);
        assert_eq!(spec.env.get("KEY2"), Some(&"val2".to_string()));
    }

    #[test]
    fn test_timeout_normalization() {
        assert_eq!(CommandSpec::new("x").timeout_secs(0).timeout, None);
        assert_eq!(CommandSpec::new("x").timeout_secs(-5).timeout, None);
        assert_eq!(
            CommandSpec::new("x").timeout_secs(3).timeout,
            Some(Duration::from_secs(3))
        );
        assert_eq!(CommandSpec::new("x").timeout(Duration::ZERO).timeout, None);
    }

    #[test]
    fn test_empty_specs() {
        assert!(CommandSpec::default().is_empty());
        assert!(CommandSpec::new("").is_empty());
        assert!(CommandSpec::argv(Vec::<String>::new()).is_empty());
        assert!(CommandSpec::argv([""]).is_empty());
        assert!(!CommandSpec::new("true").is_empty());
        assert!(CommandSpec::default().to_command().is_none());
    }

    #[test]
    fn test_command_text() {
        assert_eq!(CommandSpec::new("echo hi").command_text(), "echo hi");
        assert_eq!(CommandSpec::argv(["ls", "-l", "/tmp"]).command_text(), "ls -l /tmp");
        assert_eq!(CommandSpec::default().command_text(), "");
        assert_eq!(CommandSpec::argv(["a", "b"]).to_string(), "a b");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_line_command() {
        let cmd = CommandSpec::new("echo hi").shell(true).to_command().unwrap();
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "/bin/sh");
        let args: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(args, ["-c", "echo hi"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_plain_line_is_program_path() {
        let cmd = CommandSpec::new("echo hi").to_command().unwrap();
        assert_eq!(cmd.as_std().get_program(), "echo hi");
        assert_eq!(cmd.as_std().get_args().count(), 0);
    }

    #[test]
    fn test_argv_command() {
        let cmd = CommandSpec::argv(["ls", "-la"])
            .working_dir("/tmp")
            .to_command()
            .unwrap();
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "ls");
        assert_eq!(std_cmd.get_args().collect::<Vec<_>>(), ["-la"]);
        assert_eq!(
            std_cmd.get_current_dir(),
            Some(std::path::Path::new("/tmp"))
        );
    }
}
