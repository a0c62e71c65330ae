use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::CovidError;

pub trait ChartViewer {
    fn show(&self, chart: &Path) -> Result<(), CovidError>;
}

#[derive(Debug, Clone)]
pub struct SystemViewer {
    launcher: Option<PathBuf>,
}

impl SystemViewer {
    pub fn new() -> Self {
        Self {
            launcher: find_in_path(launcher_name()),
        }
    }

    fn require_launcher(&self) -> Result<&PathBuf, CovidError> {
        self.launcher
            .as_ref()
            .ok_or_else(|| CovidError::MissingTool(launcher_name().to_string()))
    }
}

impl Default for SystemViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartViewer for SystemViewer {
    fn show(&self, chart: &Path) -> Result<(), CovidError> {
        let launcher = self.require_launcher()?;
        let mut cmd = Command::new(launcher);
        if cfg!(windows) {
            cmd.args(["/C", "start", "/WAIT", ""]);
        }
        cmd.arg(chart);
        debug!(launcher = %launcher.display(), chart = %chart.display(), "opening chart");
        let status = cmd
            .status()
            .map_err(|err| CovidError::Viewer(err.to_string()))?;
        if status.success() {
            return Ok(());
        }
        Err(CovidError::Viewer(format!(
            "{} exited with {status}",
            launcher.display()
        )))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrintPathViewer;

impl ChartViewer for PrintPathViewer {
    fn show(&self, chart: &Path) -> Result<(), CovidError> {
        println!("{}", chart.display());
        Ok(())
    }
}

fn launcher_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "cmd"
    } else {
        "xdg-open"
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}
