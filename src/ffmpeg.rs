use std::ffi::OsString;
use std::path::PathBuf;

use tokio::process::Command;
use tracing::debug;

/// Lines of stderr kept in the error when the tool fails.
const STDERR_TAIL: usize = 20;

/// The ffmpeg command line tool.
#[derive(Debug, Clone)]
pub(crate) struct Ffmpeg {
    binary: PathBuf,
}

impl Ffmpeg {
    pub(crate) fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub(crate) async fn run(&self, args: &[OsString]) -> anyhow::Result<()> {
        debug!("{} {:?}", self.binary.display(), args);
        let output = Command::new(&self.binary)
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start {}: {}", self.binary.display(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL)..].join("\n");
            return Err(anyhow::anyhow!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                tail
            ));
        }
        Ok(())
    }
}
