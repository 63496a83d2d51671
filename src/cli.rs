use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ramcheck", about = "Guided RAM kit evaluation with a session log", version)]
pub struct Cli {
    /// Read settings from this file instead of the default ramcheckrc.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for session logs.
    #[arg(long = "log-dir", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Do not wait for Enter between steps.
    #[arg(long = "no-pause")]
    pub no_pause: bool,

    /// Skip refreshing the package index and installing the tools.
    #[arg(long = "skip-install")]
    pub skip_install: bool,

    /// Number of stress-ng vm workers.
    #[arg(long = "stress-workers", value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub stress_workers: Option<u32>,

    /// stress-ng run time (e.g. 90s, 5m, 1h).
    #[arg(long = "stress-timeout", value_name = "DURATION")]
    pub stress_timeout: Option<String>,

    /// Disable colored console output.
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Print the step table and exit.
    #[arg(long = "list-steps")]
    pub list_steps: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Flags take precedence over file and environment settings.
    pub fn apply(&self, cfg: &mut Config) {
        if let Some(dir) = &self.log_dir {
            cfg.set("LOG_DIR", dir.to_string_lossy());
        }
        if self.no_pause {
            cfg.set("PAUSE_BETWEEN_STEPS", "false");
        }
        if let Some(n) = self.stress_workers {
            cfg.set("STRESS_WORKERS", n.to_string());
        }
        if let Some(t) = &self.stress_timeout {
            cfg.set("STRESS_TIMEOUT", t.as_str());
        }
        if self.no_color {
            cfg.set("COLOR", "false");
        }
    }
}
