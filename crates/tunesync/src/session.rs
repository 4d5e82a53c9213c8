//! The refresh loop.
//!
//! A [`Session`] owns the per-run state of the core: the asset sync with its
//! change detection, the output writer with its per-target caches and the
//! renderer. [`run`] drives it until the shutdown flag is raised.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info};
use tunesync_core::{
    AppConfig, AssetSync, CompatibilityGate, CompatibilityPrompt, ConfigManager, Fetcher,
    HttpFetcher, NativeModule, OutputWriter, Result, Song, TemplateRenderer, native_module,
};

/// Longest uninterrupted sleep between shutdown checks.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// One refresh pipeline: snapshot in, assets and outputs out.
pub struct Session<F: Fetcher> {
    snapshot_path: PathBuf,
    assets: AssetSync<F>,
    writer: OutputWriter,
    renderer: TemplateRenderer,
}

impl Session<HttpFetcher> {
    /// Build a session fetching over HTTP.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::with_fetcher(config, HttpFetcher::new()?))
    }
}

impl<F: Fetcher> Session<F> {
    /// Build a session with a custom fetcher.
    pub fn with_fetcher(config: &AppConfig, fetcher: F) -> Self {
        Self {
            snapshot_path: config.snapshot_path.clone(),
            assets: AssetSync::new(config.assets.clone(), fetcher),
            writer: OutputWriter::new(config.placeholder.clone(), config.outputs.clone()),
            renderer: TemplateRenderer::new(),
        }
    }

    /// Run one cycle against the current snapshot.
    ///
    /// Returns the number of outputs written, or `None` if there was no
    /// usable snapshot.
    pub fn refresh(&mut self) -> Option<usize> {
        let song = match Song::load_snapshot(&self.snapshot_path) {
            Ok(song) => song,
            Err(e) => {
                debug!(
                    "Skipping refresh, no snapshot at {}: {}",
                    self.snapshot_path.display(),
                    e
                );
                return None;
            }
        };

        self.assets.update(&song);
        Some(self.writer.handle_outputs(&self.renderer, &song))
    }

    /// File the snapshot is read from.
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }
}

/// Open the config, pass the gate and refresh until `shutdown` is set.
///
/// Blocks the calling thread. The gate is torn down before returning.
pub fn run<P>(config_path: &Path, prompt: &P, shutdown: &Arc<AtomicBool>) -> Result<()>
where
    P: CompatibilityPrompt + ?Sized,
{
    let manager = ConfigManager::open(config_path)?;
    let module = native_module(&manager.config().native_module);
    run_with_module(manager, module, prompt, shutdown)
}

fn run_with_module<P>(
    mut manager: ConfigManager,
    module: Box<dyn NativeModule>,
    prompt: &P,
    shutdown: &Arc<AtomicBool>,
) -> Result<()>
where
    P: CompatibilityPrompt + ?Sized,
{
    let config = manager.config().clone();

    let mut gate = CompatibilityGate::new(config.target_api_version, module);
    let loaded = gate.startup(config.host_version(), &mut manager, prompt);
    info!(
        "Native module {} ({:?})",
        if loaded { "enabled" } else { "disabled" },
        gate.outcome()
    );

    let mut session = Session::from_config(&config)?;
    let interval = Duration::from_millis(config.refresh_interval_ms);
    info!(
        "Watching {} every {} ms",
        session.snapshot_path().display(),
        config.refresh_interval_ms
    );

    while !shutdown.load(Ordering::SeqCst) {
        let started = Instant::now();
        if let Some(written) = session.refresh()
            && written > 0
        {
            debug!("Refreshed {} output(s)", written);
        }
        sleep_until(started + interval, shutdown);
    }

    gate.unload();
    info!("Session stopped");
    Ok(())
}

fn sleep_until(deadline: Instant, shutdown: &AtomicBool) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        std::thread::sleep(remaining.min(SHUTDOWN_POLL));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::fs;
    use std::io::{self, BufReader};
    use std::sync::Mutex;
    use std::thread;

    use super::*;
    use tempfile::TempDir;
    use tunesync_core::{ApiVersion, AssetPaths, Error, LoadStage, OutputTarget};

    use crate::prompt::LinePrompt;
    use crate::prompt::tests::SilentInput;

    /// Writes a fixed body and records every URL it was asked for.
    #[derive(Default)]
    struct RecordingFetcher {
        urls: Mutex<Vec<String>>,
    }

    impl Fetcher for RecordingFetcher {
        fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
            self.urls.lock().unwrap().push(url.to_string());
            fs::write(dest, url)?;
            Ok(url.len() as u64)
        }
    }

    struct Never;

    impl CompatibilityPrompt for Never {
        fn confirm_force_enable(&self, _host: ApiVersion, _expected: ApiVersion) -> Option<bool> {
            panic!("prompt must not be shown for matching versions");
        }
    }

    fn config_in(dir: &Path) -> AppConfig {
        let assets = AssetPaths::in_directory(dir);
        fs::write(&assets.cover_placeholder, b"placeholder").expect("Should write placeholder");
        AppConfig {
            assets,
            placeholder: "idle".to_string(),
            outputs: vec![OutputTarget::new(dir.join("now.txt"), "{title}")],
            snapshot_path: dir.join("song.json"),
            ..Default::default()
        }
    }

    #[test]
    fn test_refresh_without_snapshot_is_skipped() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let config = config_in(temp_dir.path());
        let mut session = Session::with_fetcher(&config, RecordingFetcher::default());

        assert_eq!(session.refresh(), None);
        assert!(!temp_dir.path().join("now.txt").exists());
    }

    #[test]
    fn test_refresh_syncs_assets_and_outputs() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let config = config_in(temp_dir.path());
        fs::write(
            &config.snapshot_path,
            r#"{"capabilities": 9, "state": "playing", "title": "Roads", "cover_url": "http://covers/roads.png"}"#,
        )
        .expect("Should write snapshot");

        let mut session = Session::with_fetcher(&config, RecordingFetcher::default());
        assert_eq!(session.refresh(), Some(1));
        assert_eq!(session.refresh(), Some(0));

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("now.txt")).unwrap(),
            "Roads"
        );
        assert_eq!(
            fs::read_to_string(&config.assets.cover).unwrap(),
            "http://covers/roads.png"
        );
        assert_eq!(session.assets.paths(), &config.assets);
    }

    #[test]
    fn test_refresh_with_malformed_snapshot_is_skipped() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let config = config_in(temp_dir.path());
        fs::write(&config.snapshot_path, "{").expect("Should write snapshot");

        let mut session = Session::with_fetcher(&config, RecordingFetcher::default());
        assert_eq!(session.refresh(), None);
    }

    #[test]
    fn test_run_stops_when_flag_is_set() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let config_path = temp_dir.path().join("config.json");
        let config = AppConfig {
            native_module: tunesync_core::NativeModuleConfig {
                enabled: false,
                library_path: None,
            },
            ..config_in(temp_dir.path())
        };
        config.save_to(&config_path).expect("Should save config");

        let shutdown = Arc::new(AtomicBool::new(true));
        run(&config_path, &Never, &shutdown).expect("Should run");
    }

    /// Supported by the build but missing on disk.
    struct MissingLibrary;

    impl NativeModule for MissingLibrary {
        fn load_library(&mut self) -> Result<()> {
            Err(Error::stage_failed(LoadStage::LoadLibrary, "missing"))
        }

        fn resolve_functions(&mut self) -> Result<()> {
            Ok(())
        }

        fn initialize(&mut self) -> Result<()> {
            Ok(())
        }

        fn unload(&mut self) {}
    }

    #[test]
    fn test_run_stops_while_question_is_pending() {
        let temp_dir = TempDir::new().expect("Should create temp dir");
        let config_path = temp_dir.path().join("config.json");
        let config = AppConfig {
            target_api_version: ApiVersion::new(3, 0, 0),
            host_api_version: Some(ApiVersion::new(4, 0, 0)),
            ..config_in(temp_dir.path())
        };
        config.save_to(&config_path).expect("Should save config");

        let shutdown = Arc::new(AtomicBool::new(false));
        let prompt = LinePrompt::new(
            BufReader::new(SilentInput),
            io::sink(),
            Arc::clone(&shutdown),
        );
        let stopper = {
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(200));
                shutdown.store(true, Ordering::SeqCst);
            })
        };

        let started = Instant::now();
        let manager = ConfigManager::open(&config_path).expect("Should open config");
        run_with_module(manager, Box::new(MissingLibrary), &prompt, &shutdown)
            .expect("Should run");
        assert!(started.elapsed() < Duration::from_secs(5));
        let _ = stopper.join();

        // Nothing was answered, so the question comes back next start.
        let reopened = ConfigManager::open(&config_path).expect("Should reopen config");
        assert!(!reopened.config().compatibility.warning_shown);
    }

    #[test]
    fn test_sleep_until_returns_on_shutdown() {
        let shutdown = AtomicBool::new(true);
        let started = Instant::now();
        sleep_until(started + Duration::from_secs(60), &shutdown);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
