use std::{
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

use crate::{
    Error, Result,
    optimizer::{OptimizationRequest, RemoteOptimization, RouteOptimizer},
};

/// Runs an external optimizer executable per request.
///
/// The request is written to the child's stdin as JSON and the response is
/// read from its stdout. Anything that keeps a well-formed response from
/// arriving is reported as [`Error::RemoteOptimizationUnavailable`].
pub struct CommandOptimizer {
    exe_path: PathBuf,
    args: Vec<String>,
}

impl CommandOptimizer {
    pub fn new(exe_path: impl Into<PathBuf>) -> Self {
        Self {
            exe_path: exe_path.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn exe_path(&self) -> &Path {
        &self.exe_path
    }

    fn run(&self, input: &[u8]) -> std::io::Result<Output> {
        let mut child = Command::new(&self.exe_path)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // The child sees EOF once `stdin` drops after this statement.
        if let Some(mut stdin) = child.stdin.take()
            && let Err(err) = stdin.write_all(input)
        {
            let _ = child.kill();
            let _ = child.wait();
            return Err(err);
        }

        child.wait_with_output()
    }
}

impl RouteOptimizer for CommandOptimizer {
    fn optimize(&self, request: &OptimizationRequest) -> Result<RemoteOptimization> {
        let input = serde_json::to_vec(request)?;
        log::debug!(
            "optimizer: spawn exe={} tour={}",
            self.exe_path.display(),
            request.tour_id
        );

        let output = self.run(&input).map_err(|err| {
            Error::remote_unavailable(format!(
                "failed to run {}: {err}",
                self.exe_path.display()
            ))
        })?;

        if !output.status.success() {
            return Err(Error::remote_unavailable(format!(
                "optimizer exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|err| {
            Error::remote_unavailable(format!("optimizer returned malformed JSON: {err}"))
        })
    }
}
