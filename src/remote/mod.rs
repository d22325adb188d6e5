//! # Remote Shell Module
//!
//! Runs commands on the machine the fuel gauge is attached to.
//!
//! This module handles:
//! - Opening an SSH connection through the system OpenSSH client
//! - Multiplexing every command over that one connection (`ControlMaster`)
//! - Reporting non-zero exits with the remote stderr
//!
//! Commands are issued one at a time and no timeout is applied: a hung remote
//! command blocks the caller until it returns.

mod shell_trait;

#[cfg(test)]
pub use shell_trait::mocks;
#[cfg(test)]
pub use shell_trait::MockRemoteShell;
pub use shell_trait::RemoteShell;

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::RemoteConfig;
use crate::error::{GaugeMonitorError, Result};

/// Seconds the multiplexing master stays up after the last command
const CONTROL_PERSIST_SECS: u32 = 60;

/// Remote shell over the system `ssh` client
#[derive(Debug, Clone)]
pub struct SshShell {
    host: String,
    options: Vec<String>,
    control_path: String,
}

impl SshShell {
    /// Open the shared connection to the remote host
    ///
    /// Runs `true` on the remote side so an unreachable host or rejected key
    /// fails here rather than on the first register read.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the probe command fails.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gauge_monitor::config::RemoteConfig;
    /// use gauge_monitor::remote::{RemoteShell, SshShell};
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let shell = SshShell::connect(&RemoteConfig::default()).await?;
    ///     let uptime = shell.run("uptime").await?;
    ///     println!("{}", uptime.trim());
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: &RemoteConfig) -> Result<Self> {
        let shell = Self::new(config);

        debug!("Probing SSH connection to {}", shell.host);
        shell
            .run("true")
            .await
            .map_err(|e| GaugeMonitorError::Connection(format!("{}: {}", shell.host, e)))?;

        info!("Connected to {}", shell.host);
        Ok(shell)
    }

    /// Build a shell without probing the connection
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            host: config.host.clone(),
            options: config.ssh_options.clone(),
            control_path: config.control_path.clone(),
        }
    }

    /// Remote host as configured
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Arguments passed to `ssh` for one remote command
    fn ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ControlMaster=auto".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", self.control_path),
            "-o".to_string(),
            format!("ControlPersist={}", CONTROL_PERSIST_SECS),
        ];
        args.extend(self.options.iter().cloned());
        args.push("--".to_string());
        args.push(self.host.clone());
        args.push(command.to_string());
        args
    }
}

#[async_trait]
impl RemoteShell for SshShell {
    async fn run(&self, command: &str) -> Result<String> {
        let mut ssh = Command::new("ssh");
        ssh.args(self.ssh_args(command))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        // Own process group: Ctrl+C reaches only this process, not in-flight reads
        #[cfg(unix)]
        ssh.process_group(0);

        let output = ssh
            .output()
            .await
            .map_err(|e| GaugeMonitorError::Command {
                command: command.to_string(),
                reason: format!("failed to spawn ssh: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GaugeMonitorError::Command {
                command: command.to_string(),
                reason: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
