//! Command line interface definition using clap.
//!
//! The CLI is the outer configuration layer of the `pipepump` binary: it
//! maps flags onto a [`PumpConfig`] and the child's environment.

use clap::Parser;
use std::{env, time::Duration};

use crate::config::{
    DEFAULT_STDERR_CAPACITY, DEFAULT_UNPRIVILEGED_USER, PrivilegeDrop, PumpConfig,
};
use crate::runner::DEFAULT_BUFFER_SIZE;

/// Filter standard input through a shell command.
#[derive(Debug, Clone, Parser)]
#[command(name = "pipepump", version, about)]
pub struct Cli {
    /// Run the command directly instead of through `sudo`.
    #[arg(long, env = "PIPEPUMP_NO_SUDO")]
    pub no_sudo: bool,

    /// Unprivileged account the command runs as.
    #[arg(long, env = "PIPEPUMP_USER", default_value = DEFAULT_UNPRIVILEGED_USER)]
    pub user: String,

    /// Environment entry for the command; may be repeated.
    #[arg(long = "env", value_name = "NAME=VALUE")]
    pub env: Vec<String>,

    /// Pass this process's environment to the command before any `--env`.
    #[arg(long, env = "PIPEPUMP_INHERIT_ENV")]
    pub inherit_env: bool,

    /// Readiness poll timeout in milliseconds.
    #[arg(long, env = "PIPEPUMP_POLL_TIMEOUT_MS", default_value_t = 10)]
    pub poll_timeout_ms: u64,

    /// How long stderr output keeps being collected before failing, in
    /// milliseconds.
    #[arg(long, env = "PIPEPUMP_GRACE_MS", default_value_t = 2_000)]
    pub grace_ms: u64,

    /// Maximum number of stderr bytes reported; at least one.
    #[arg(
        long,
        env = "PIPEPUMP_STDERR_CAPACITY",
        default_value_t = DEFAULT_STDERR_CAPACITY,
        value_parser = parse_nonzero_size
    )]
    pub stderr_capacity: usize,

    /// Size of the input and output buffers; at least one.
    #[arg(
        long,
        env = "PIPEPUMP_BUFFER_SIZE",
        default_value_t = DEFAULT_BUFFER_SIZE,
        value_parser = parse_nonzero_size
    )]
    pub buffer_size: usize,

    /// Enable debug logging on stderr.
    #[arg(short, long, env = "PIPEPUMP_VERBOSE")]
    pub verbose: bool,

    /// Command to run through the shell.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

fn parse_nonzero_size(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_owned()),
        Ok(size) => Ok(size),
        Err(err) => Err(err.to_string()),
    }
}

impl Cli {
    /// The command words joined into one shell command string.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }

    /// Session configuration selected by the flags.
    #[must_use]
    pub fn config(&self) -> PumpConfig {
        let privilege = if self.no_sudo {
            PrivilegeDrop::Disabled
        } else {
            PrivilegeDrop::Sudo {
                user: self.user.clone(),
            }
        };
        PumpConfig::default()
            .with_poll_timeout(Duration::from_millis(self.poll_timeout_ms))
            .with_stderr_grace(Duration::from_millis(self.grace_ms))
            .with_stderr_capacity(self.stderr_capacity)
            .with_privilege(privilege)
    }

    /// The child's complete environment as `NAME=VALUE` entries.
    #[must_use]
    pub fn environment(&self) -> Vec<String> {
        let inherited = self
            .inherit_env
            .then(|| env::vars().map(|(name, value)| format!("{name}={value}")))
            .into_iter()
            .flatten();
        inherited.chain(self.env.iter().cloned()).collect()
    }
}
