//! Trait abstraction for remote shell operations to enable testing

use async_trait::async_trait;

use crate::error::Result;

/// Trait for running shell commands on the machine hosting the fuel gauge
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Run one command and return its stdout
    ///
    /// # Errors
    ///
    /// Returns `Command` if the command cannot be started or exits non-zero.
    async fn run(&self, command: &str) -> Result<String>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::error::GaugeMonitorError;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Mock shell answering `i2cget` commands from a register map
    #[derive(Clone)]
    pub struct ScriptedShell {
        pub responses: Arc<Mutex<HashMap<String, String>>>,
        pub commands: Arc<Mutex<Vec<String>>>,
        pub fail_after: Arc<Mutex<Option<usize>>>,
    }

    impl ScriptedShell {
        pub fn new() -> Self {
            Self {
                responses: Arc::new(Mutex::new(HashMap::new())),
                commands: Arc::new(Mutex::new(Vec::new())),
                fail_after: Arc::new(Mutex::new(None)),
            }
        }

        /// Answer reads of `address` on bus 0, device 0x36 with `stdout`
        pub fn with_register(self, address: u8, stdout: &str) -> Self {
            self.responses.lock().unwrap().insert(
                format!("i2cget -f -y 0 0x36 {:#x} w", address),
                stdout.to_string(),
            );
            self
        }

        /// Fail every command after the first `count` have succeeded
        pub fn set_fail_after(&self, count: usize) {
            *self.fail_after.lock().unwrap() = Some(count);
        }

        pub fn get_commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteShell for ScriptedShell {
        async fn run(&self, command: &str) -> Result<String> {
            let mut commands = self.commands.lock().unwrap();
            if let Some(limit) = *self.fail_after.lock().unwrap() {
                if commands.len() >= limit {
                    commands.push(command.to_string());
                    return Err(GaugeMonitorError::Command {
                        command: command.to_string(),
                        reason: "exit status 1: Error: Read failed".to_string(),
                    });
                }
            }
            commands.push(command.to_string());

            self.responses
                .lock()
                .unwrap()
                .get(command)
                .cloned()
                .ok_or_else(|| GaugeMonitorError::Command {
                    command: command.to_string(),
                    reason: "exit status 127: command not scripted".to_string(),
                })
        }
    }
}
