//! # Monitor
//!
//! Wires the store, sampler and renderer together for one run.
//!
//! ## Lifecycle
//!
//! 1. Open the store (previous history, or empty)
//! 2. Spawn the sampler task
//! 3. Spawn the renderer task (it draws once the first sample exists)
//! 4. Wait for shutdown, or for either task to fail
//! 5. Abort the remaining task and save the store
//!
//! The save in step 5 runs on every exit path that reaches it, so samples
//! collected before a read failure are kept. Data is only lost if the process
//! is killed before the save.

use std::future::Future;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{GaugeMonitorError, Result};
use crate::gauge::reader::RegisterReader;
use crate::remote::RemoteShell;
use crate::render::chart::Chart;
use crate::render::Renderer;
use crate::sampler::Sampler;
use crate::store::{SharedStore, TimeSeriesStore};

/// Run the monitor until `shutdown` resolves or a task fails
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `shell` - Connected remote shell
/// * `shutdown` - Resolves when the operator asks to stop (e.g. Ctrl+C)
///
/// # Errors
///
/// Returns the error that stopped sampling or rendering. If that path also
/// fails to save, the save error is logged and the task error is returned.
/// A clean shutdown returns `PersistenceSave` if the final save fails.
pub async fn run<S, F>(config: &Config, shell: S, shutdown: F) -> Result<()>
where
    S: RemoteShell + 'static,
    F: Future<Output = ()>,
{
    let store = SharedStore::new(TimeSeriesStore::open(
        config.store.path.clone(),
        config.store.retention(),
    ));

    let reader = RegisterReader::new(shell, &config.device, config.sampling.retry_policy());
    let sampler = Sampler::new(
        reader,
        store.clone(),
        config.sampling.interval(),
        config.device.sense_resistor_milliohm,
    );
    let mut sampler_task = tokio::spawn(sampler.run());

    let mut renderer_task = if config.render.enabled {
        let chart = Chart::new(
            config.render.output_path.clone(),
            config.render.width,
            config.render.height,
        );
        let renderer = Renderer::new(
            store.clone(),
            chart,
            config.render.refresh(),
            config.device.sense_resistor_milliohm,
        );
        Some(tokio::spawn(renderer.run()))
    } else {
        info!("Rendering disabled, running headless");
        None
    };

    // Shutdown first: an interrupted read finishing in the same poll is not a failure
    let outcome = tokio::select! {
        biased;

        _ = shutdown => {
            info!("Shutdown requested");
            Ok(())
        }
        result = &mut sampler_task => {
            flatten("sampler", result)
        }
        result = wait_optional(&mut renderer_task) => {
            flatten("renderer", result)
        }
    };

    sampler_task.abort();
    if let Some(task) = &renderer_task {
        task.abort();
    }

    if let Err(e) = &outcome {
        error!("Stopping: {}", e);
    }

    info!("Saving {} samples to {}", store.len(), config.store.path.display());
    match (outcome, store.save()) {
        (Ok(()), save) => save,
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(save_error)) => {
            warn!("{}", save_error);
            Err(e)
        }
    }
}

/// Await an optional task; pending forever when there is none
async fn wait_optional<T>(
    task: &mut Option<JoinHandle<T>>,
) -> std::result::Result<T, tokio::task::JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

fn flatten(
    name: &str,
    result: std::result::Result<Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    match result {
        Ok(Ok(())) => Err(GaugeMonitorError::Task(format!("{} stopped unexpectedly", name))),
        Ok(Err(e)) => Err(e),
        Err(e) => Err(GaugeMonitorError::Task(format!("{} task: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mocks::ScriptedShell;
    use std::time::Duration;
    use tempfile::TempDir;

    fn gauge_shell() -> ScriptedShell {
        ScriptedShell::new()
            .with_register(0xFF, "0x6400\n")
            .with_register(0x13, "0x5f00\n")
            .with_register(0x0B, "0xfd80\n")
            .with_register(0x1E, "0x0140\n")
            .with_register(0xD4, "0xd200\n")
            .with_register(0xD3, "0xd180\n")
            .with_register(0x06, "0x6300\n")
    }

    fn headless_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.store.path = dir.path().join("db.json");
        config.sampling.interval_ms = 1;
        config.render.enabled = false;
        config
    }

    #[tokio::test]
    async fn test_command_error_saves_partial_history() {
        let dir = TempDir::new().unwrap();
        let config = headless_config(&dir);
        let shell = gauge_shell();
        shell.set_fail_after(7 * 4 + 2);

        let result = run(&config, shell, std::future::pending()).await;

        assert!(matches!(result, Err(GaugeMonitorError::Command { .. })));
        let saved = TimeSeriesStore::load(&config.store.path).unwrap();
        assert_eq!(saved.column_lengths(), [4; 8]);
        assert_eq!(saved.avg_current, vec![-640; 4]);
    }

    #[tokio::test]
    async fn test_shutdown_saves_and_appends_to_history() {
        let dir = TempDir::new().unwrap();
        let config = headless_config(&dir);

        run(&config, gauge_shell(), tokio::time::sleep(Duration::from_millis(100)))
            .await
            .unwrap();
        let first = TimeSeriesStore::load(&config.store.path).unwrap();
        assert!(!first.is_empty());
        assert!(first.is_consistent());

        run(&config, gauge_shell(), tokio::time::sleep(Duration::from_millis(100)))
            .await
            .unwrap();
        let second = TimeSeriesStore::load(&config.store.path).unwrap();
        assert!(second.len() > first.len());
        assert_eq!(second.t[..first.len()], first.t[..]);
    }

    #[tokio::test]
    async fn test_retention_limits_saved_history() {
        let dir = TempDir::new().unwrap();
        let mut config = headless_config(&dir);
        config.store.max_samples = 2;
        let shell = gauge_shell();
        shell.set_fail_after(7 * 5);

        let result = run(&config, shell, std::future::pending()).await;

        assert!(result.is_err());
        let saved = TimeSeriesStore::load(&config.store.path).unwrap();
        assert_eq!(saved.column_lengths(), [2; 8]);
    }

    #[tokio::test]
    async fn test_save_failure_is_reported_on_clean_shutdown() {
        let dir = TempDir::new().unwrap();
        let mut config = headless_config(&dir);
        config.store.path = dir.path().join("missing/db.json");

        let result = run(&config, gauge_shell(), tokio::time::sleep(Duration::from_millis(20))).await;

        assert!(matches!(result, Err(GaugeMonitorError::PersistenceSave { .. })));
    }

    #[tokio::test]
    async fn test_read_error_wins_over_save_error() {
        let dir = TempDir::new().unwrap();
        let mut config = headless_config(&dir);
        config.store.path = dir.path().join("missing/db.json");
        let shell = gauge_shell();
        shell.set_fail_after(3);

        let result = run(&config, shell, std::future::pending()).await;

        assert!(matches!(result, Err(GaugeMonitorError::Command { .. })));
    }

    /// Resolves on the first poll after the sampler's read has failed, the
    /// same poll in which the sampler task is observed as finished
    async fn shutdown_after_failed_read(shell: ScriptedShell) {
        while shell.get_commands().is_empty() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_shutdown_wins_over_read_failing_at_the_same_time() {
        let dir = TempDir::new().unwrap();
        let config = headless_config(&dir);

        for _ in 0..10 {
            let shell = gauge_shell();
            shell.set_fail_after(0);
            let result = run(&config, shell.clone(), shutdown_after_failed_read(shell.clone())).await;
            assert!(result.is_ok(), "{:?}", result);
        }
    }

    #[tokio::test]
    async fn test_renderer_failure_stops_sampling() {
        let dir = TempDir::new().unwrap();
        let mut config = headless_config(&dir);
        config.render.enabled = true;
        config.render.refresh_ms = 5;
        config.render.output_path = dir.path().join("missing/live.png");

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            run(&config, gauge_shell(), std::future::pending()),
        )
        .await
        .unwrap();

        assert!(matches!(result, Err(GaugeMonitorError::Render(_))));
        assert!(TimeSeriesStore::load(&config.store.path).unwrap().len() >= 1);
    }
}
