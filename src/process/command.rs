//! Command-line construction for the child process.

use std::process::{Command, Stdio};

use crate::config::{PrivilegeDrop, PumpConfig};

const SUDO_PROGRAM: &str = "/usr/bin/sudo";
const SHELL_ARGS: &[&str] = &["-c"];

/// Program and arguments used to start the child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandLine {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
}

impl CommandLine {
    /// Wraps `command` in the configured shell and privilege wrapper.
    pub(crate) fn new(command: &str, config: &PumpConfig) -> Self {
        let shell = std::iter::once(config.shell.clone())
            .chain(SHELL_ARGS.iter().map(|arg| (*arg).to_owned()))
            .chain(std::iter::once(command.to_owned()));
        match &config.privilege {
            PrivilegeDrop::Sudo { user } => Self {
                program: SUDO_PROGRAM.to_owned(),
                args: ["-E", "-u", user.as_str(), "-n", "--"]
                    .into_iter()
                    .map(str::to_owned)
                    .chain(shell)
                    .collect(),
            },
            PrivilegeDrop::Disabled => {
                let mut argv = shell;
                let program = argv.next().unwrap_or_default();
                Self {
                    program,
                    args: argv.collect(),
                }
            }
        }
    }

    /// Builds a [`Command`] with all three pipes captured and exactly `env`
    /// as the child's environment.
    pub(crate) fn to_command(&self, env: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env_clear()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for entry in env {
            if let Some((name, value)) = split_env_entry(entry) {
                cmd.env(name, value);
            } else {
                tracing::warn!(entry = %entry, "skipping environment entry without '='");
            }
        }
        cmd
    }
}

/// Splits a `NAME=VALUE` entry at the first `=`.
fn split_env_entry(entry: &str) -> Option<(&str, &str)> {
    entry
        .split_once('=')
        .filter(|(name, _)| !name.is_empty())
}
