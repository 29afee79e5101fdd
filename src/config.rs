use eyre::{Context, Result};
use hetsched::generator::DEFAULT_MAX_INTERARRIVAL_MS;
use hetsched::scheduler::{DEFAULT_MS_PER_INTENSITY, SchedulerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::commands::RunArgs;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub scheduler: SchedulerSection,
    pub generator: GeneratorSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub queue_capacity: usize,
    pub cpu_workers: usize,
    pub gpu_workers: usize,
    pub idle_poll_ms: u64,
    pub ms_per_intensity: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            cpu_workers: 3,
            gpu_workers: 3,
            idle_poll_ms: 10,
            ms_per_intensity: DEFAULT_MS_PER_INTENSITY,
        }
    }
}

impl SchedulerSection {
    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::new(self.queue_capacity, self.cpu_workers, self.gpu_workers)
            .with_idle_poll(Duration::from_millis(self.idle_poll_ms))
            .with_ms_per_intensity(self.ms_per_intensity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSection {
    pub tasks: usize,
    pub max_intensity: f64,
    pub max_interarrival_ms: u64,
    pub seed: Option<u64>,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            tasks: 50,
            max_intensity: 10.0,
            max_interarrival_ms: DEFAULT_MAX_INTERARRIVAL_MS,
            seed: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            scheduler: SchedulerSection::default(),
            generator: GeneratorSection::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply command-line overrides on top of the loaded values
    pub fn apply_overrides(&mut self, args: &RunArgs) {
        if let Some(tasks) = args.tasks {
            self.generator.tasks = tasks;
        }
        if let Some(seed) = args.seed {
            self.generator.seed = Some(seed);
        }
        if let Some(capacity) = args.queue_capacity {
            self.scheduler.queue_capacity = capacity;
        }
        if let Some(cpu) = args.cpu_workers {
            self.scheduler.cpu_workers = cpu;
        }
        if let Some(gpu) = args.gpu_workers {
            self.scheduler.gpu_workers = gpu;
        }
    }

    /// Parsed log level, if set and valid
    pub fn level_filter(&self) -> Option<log::LevelFilter> {
        self.log_level.as_deref().and_then(|level| level.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.scheduler.queue_capacity, 10);
        assert_eq!(config.scheduler.cpu_workers, 3);
        assert_eq!(config.scheduler.gpu_workers, 3);
        assert_eq!(config.generator.tasks, 50);
        assert_eq!(config.level_filter(), Some(log::LevelFilter::Info));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hetsched.yml");
        fs::write(
            &path,
            "log_level: debug\nscheduler:\n  queue_capacity: 2\n  gpu_workers: 0\ngenerator:\n  seed: 9\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.scheduler.queue_capacity, 2);
        assert_eq!(config.scheduler.gpu_workers, 0);
        assert_eq!(config.scheduler.cpu_workers, 3);
        assert_eq!(config.generator.seed, Some(9));
        assert_eq!(config.generator.tasks, 50);
        assert_eq!(config.level_filter(), Some(log::LevelFilter::Debug));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_invalid_yaml_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.yml");
        fs::write(&path, "scheduler: [not, a, map]\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        let args = RunArgs {
            tasks: Some(5),
            seed: Some(1),
            queue_capacity: Some(1),
            cpu_workers: None,
            gpu_workers: Some(0),
            json: false,
        };

        config.apply_overrides(&args);

        assert_eq!(config.generator.tasks, 5);
        assert_eq!(config.generator.seed, Some(1));
        assert_eq!(config.scheduler.queue_capacity, 1);
        assert_eq!(config.scheduler.cpu_workers, 3);
        assert_eq!(config.scheduler.gpu_workers, 0);
    }

    #[test]
    fn test_to_scheduler_config() {
        let section = SchedulerSection {
            queue_capacity: 4,
            cpu_workers: 1,
            gpu_workers: 2,
            idle_poll_ms: 5,
            ms_per_intensity: 20,
        };
        let config = section.to_scheduler_config();

        assert_eq!(config.queue_capacity, 4);
        assert_eq!(config.cpu_workers, 1);
        assert_eq!(config.gpu_workers, 2);
        assert_eq!(config.idle_poll, Duration::from_millis(5));
        assert_eq!(config.ms_per_intensity, 20);
    }

    #[test]
    fn test_invalid_log_level_ignored() {
        let config = Config {
            log_level: Some("loud".to_string()),
            ..Config::default()
        };
        assert_eq!(config.level_filter(), None);
    }
}
