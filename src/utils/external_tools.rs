use crate::coverage::Stage;
use crate::error::{PipelineError, Result};
use anyhow::Context;
use log::debug;
use std::ffi::OsString;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Fails with an install hint when `program` cannot be started.
pub fn check_tool(program: &str, install_hint: &str) -> anyhow::Result<()> {
    Command::new(program)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .with_context(|| {
            format!(
                "{} not found. Please install it ({}) and ensure it's in your PATH",
                program, install_hint
            )
        })
        .map(|_| ())
}

/// A single blocking invocation of an external program, with the pipeline
/// stage and the file it works on attached for error reporting.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    program: String,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    stdout: Option<PathBuf>,
    stage: Stage,
    subject: PathBuf,
    timeout: Duration,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>, stage: Stage, subject: &Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            stdout: None,
            stage,
            subject: subject.to_path_buf(),
            timeout: Duration::from_secs(6 * 60 * 60),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets an environment variable for the program only.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Redirects the program's standard output into `path`.
    pub fn stdout_to(mut self, path: &Path) -> Self {
        self.stdout = Some(path.to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command_line(&self) -> String {
        let mut line = String::new();
        for (key, value) in &self.envs {
            line.push_str(&key.to_string_lossy());
            line.push('=');
            line.push_str(&value.to_string_lossy());
            line.push(' ');
        }
        line.push_str(&self.program);
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        if let Some(out) = &self.stdout {
            line.push_str(" > ");
            line.push_str(&out.to_string_lossy());
        }
        line
    }

    /// Runs the program to completion. A nonzero exit, a failure to start
    /// or exceeding the timeout are all errors.
    pub fn run(&self) -> Result<()> {
        debug!("[{}] {}", self.stage, self.command_line());

        let stdout = match &self.stdout {
            Some(path) => Stdio::from(File::create(path).map_err(|e| PipelineError::fs(path, e))?),
            None => Stdio::null(),
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.failure(format!("could not be started ({})", e), String::new()))?;

        // Drain stderr concurrently so a verbose tool cannot block on a full pipe.
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                buf
            })
        });

        let status = self.wait_with_timeout(&mut child)?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(self.failure(format!("exited with {}", status), stderr))
        }
    }

    fn wait_with_timeout(&self, child: &mut Child) -> Result<std::process::ExitStatus> {
        // A timeout too large to represent means no deadline at all.
        let deadline = Instant::now().checked_add(self.timeout);
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if deadline.is_some_and(|d| Instant::now() >= d) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(PipelineError::ExternalToolTimeout {
                        stage: self.stage,
                        tool: self.program.clone(),
                        path: self.subject.clone(),
                        timeout: self.timeout,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(self.failure(format!("could not be waited on ({})", e), String::new()))
                }
            }
        }
    }

    fn failure(&self, status: String, stderr: String) -> PipelineError {
        PipelineError::ExternalToolFailure {
            stage: self.stage,
            tool: self.program.clone(),
            path: self.subject.clone(),
            status,
            stderr,
        }
    }
}
