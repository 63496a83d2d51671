use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use directories::BaseDirs;
use tracing::warn;

/// Prefix for environment overrides, e.g. `RAMCHECK_STRESS_WORKERS=4`.
pub const ENV_PREFIX: &str = "RAMCHECK_";

const KEYS: &[&str] = &[
    "LOG_DIR",
    "LOG_PREFIX",
    "PACKAGE_MANAGER",
    "STRESS_WORKERS",
    "STRESS_VM_PERCENT",
    "STRESS_TIMEOUT",
    "SYSBENCH_THREADS",
    "SYSBENCH_BLOCK_SIZE",
    "SYSBENCH_TOTAL_SIZE",
    "MBW_RUNS",
    "MBW_SIZE_MB",
    "PAUSE_BETWEEN_STEPS",
    "COLOR",
];

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&default_config_path(), env::vars())
    }

    /// Defaults, then the rc file at `path`, then `RAMCHECK_*` variables.
    pub fn load_from<I>(path: &Path, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = default_map();

        if path.exists() {
            if let Ok(file) = fs::File::open(path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        for (k, v) in vars {
            if let Some(key) = k.strip_prefix(ENV_PREFIX) {
                if is_config_key(key) {
                    map.insert(key.to_string(), v);
                }
            }
        }

        Self { inner: map, config_path: path.to_path_buf() }
    }

    /// Built-in defaults only.
    pub fn defaults() -> Self {
        Self { inner: default_map(), config_path: default_config_path() }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        match self.get(key) {
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => {
                    warn!(key, value = %v, "not a boolean, using default");
                    default_bool(key)
                }
            },
            None => default_bool(key),
        }
    }

    /// Positive integer value, falling back to the built-in default.
    pub fn get_usize(&self, key: &str) -> usize {
        let parsed = self.get(key).and_then(|v| match v.parse::<usize>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                warn!(key, value = %v, "not a positive integer, using default");
                None
            }
        });
        parsed.unwrap_or_else(|| {
            default_map()
                .get(key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(1)
        })
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    /// Value that must satisfy `valid`, else the built-in default.
    pub fn get_checked(&self, key: &str, valid: impl Fn(&str) -> bool) -> String {
        match self.get(key) {
            Some(v) if valid(&v) => v,
            other => {
                if let Some(v) = other {
                    warn!(key, value = %v, "invalid value, using default");
                }
                default_map().remove(key).unwrap_or_default()
            }
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.get_path("LOG_DIR")
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR))
    }

    pub fn log_prefix(&self) -> String {
        self.get_checked("LOG_PREFIX", |v| {
            !v.is_empty() && !v.contains(std::path::MAIN_SEPARATOR)
        })
    }
}

const DEFAULT_LOG_DIR: &str = "/var/log/ramcheck";

fn is_config_key(k: &str) -> bool {
    KEYS.contains(&k)
}

fn default_bool(key: &str) -> bool {
    default_map()
        .get(key)
        .map(|v| v == "true")
        .unwrap_or(false)
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/etc"));
    base.join("ramcheck").join("ramcheckrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    // Paths
    m.insert("LOG_DIR".into(), DEFAULT_LOG_DIR.into());
    m.insert("LOG_PREFIX".into(), "ramcheck".into());

    // Tools
    m.insert("PACKAGE_MANAGER".into(), "auto".into());
    m.insert("STRESS_WORKERS".into(), "2".into());
    m.insert("STRESS_VM_PERCENT".into(), "75".into());
    m.insert("STRESS_TIMEOUT".into(), "5m".into());
    m.insert("SYSBENCH_THREADS".into(), "4".into());
    m.insert("SYSBENCH_BLOCK_SIZE".into(), "1M".into());
    m.insert("SYSBENCH_TOTAL_SIZE".into(), "10G".into());
    m.insert("MBW_RUNS".into(), "10".into());
    m.insert("MBW_SIZE_MB".into(), "1024".into());

    // Bools as strings
    m.insert("PAUSE_BETWEEN_STEPS".into(), "true".into());
    m.insert("COLOR".into(), "true".into());

    m
}
