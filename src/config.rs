//! Tunables for a pump session.

use std::time::Duration;

/// Default timeout of the single readiness poll performed by each step.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(10);
/// Default time stderr output keeps being collected before the session fails.
pub const DEFAULT_STDERR_GRACE: Duration = Duration::from_secs(2);
/// Default capacity of the stderr accumulator.
pub const DEFAULT_STDERR_CAPACITY: usize = 2048;
/// Default shell used to interpret the command string.
pub const DEFAULT_SHELL: &str = "/bin/sh";
/// Default unprivileged account the child runs as.
pub const DEFAULT_UNPRIVILEGED_USER: &str = "nobody";

/// How the child is started relative to the caller's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivilegeDrop {
    /// Run through non-interactive `sudo` as `user`, keeping the environment.
    Sudo {
        /// Account the child runs as.
        user: String,
    },
    /// Run the shell directly as the caller.
    Disabled,
}

impl Default for PrivilegeDrop {
    fn default() -> Self {
        Self::Sudo {
            user: DEFAULT_UNPRIVILEGED_USER.to_owned(),
        }
    }
}

/// Configuration shared by setup and every step of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpConfig {
    /// Upper bound on how long one step waits for readiness.
    pub poll_timeout: Duration,
    /// Grace window after the first stderr byte.
    pub stderr_grace: Duration,
    /// Maximum number of stderr bytes retained for the error message.
    pub stderr_capacity: usize,
    /// Shell invoked as `<shell> -c <command>`.
    pub shell: String,
    /// Privilege-dropping wrapper placed in front of the shell.
    pub privilege: PrivilegeDrop,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            stderr_grace: DEFAULT_STDERR_GRACE,
            stderr_capacity: DEFAULT_STDERR_CAPACITY,
            shell: DEFAULT_SHELL.to_owned(),
            privilege: PrivilegeDrop::default(),
        }
    }
}

impl PumpConfig {
    /// Sets the readiness poll timeout.
    #[must_use]
    pub const fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Sets the stderr grace window.
    #[must_use]
    pub const fn with_stderr_grace(mut self, grace: Duration) -> Self {
        self.stderr_grace = grace;
        self
    }

    /// Sets the stderr accumulator capacity.
    #[must_use]
    pub const fn with_stderr_capacity(mut self, capacity: usize) -> Self {
        self.stderr_capacity = capacity;
        self
    }

    /// Sets the shell.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Sets the privilege-dropping wrapper.
    #[must_use]
    pub fn with_privilege(mut self, privilege: PrivilegeDrop) -> Self {
        self.privilege = privilege;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_drop_privileges_to_nobody() {
        let config = PumpConfig::default();
        assert_eq!(config.poll_timeout, Duration::from_millis(10));
        assert_eq!(config.stderr_grace, Duration::from_secs(2));
        assert_eq!(config.stderr_capacity, 2048);
        assert_eq!(
            config.privilege,
            PrivilegeDrop::Sudo {
                user: "nobody".into()
            }
        );
    }

    #[test]
    fn builders_override_fields() {
        let config = PumpConfig::default()
            .with_stderr_grace(Duration::from_millis(250))
            .with_privilege(PrivilegeDrop::Disabled)
            .with_shell("/bin/bash");
        assert_eq!(config.stderr_grace, Duration::from_millis(250));
        assert_eq!(config.privilege, PrivilegeDrop::Disabled);
        assert_eq!(config.shell, "/bin/bash");
    }
}
