use crate::config::ShellConfig;
use crate::prompt::{PromptContext, PromptTemplate};
use anyhow::{Context, Result};
use shellmark_core::{ShellHost, MODE_PROMPT, PRIMARY_PROMPT};
use std::io::Write;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Where command output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Commands share the shell's terminal (interactive use).
    Inherit,
    /// Output is collected and written to the shell's writer.
    Capture,
}

/// Result of one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Ran; this is its exit status.
    Status(i32),
    /// `exit [n]`
    Exit(i32),
}

pub struct Repl<W: Write> {
    host: ShellHost,
    context: PromptContext,
    shell: String,
    mode: ExecMode,
    out: W,
}

impl<W: Write> std::fmt::Debug for Repl<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repl")
            .field("host", &self.host)
            .field("shell", &self.shell)
            .field("mode", &self.mode)
            .finish()
    }
}

impl<W: Write> Repl<W> {
    pub fn new(config: &ShellConfig, out: W, mode: ExecMode) -> Self {
        let context = PromptContext::new();
        let mut host = ShellHost::new();

        host.hooks.define(
            PRIMARY_PROMPT,
            PromptTemplate::parse(config.prompt.clone()).into_hook(context.clone()),
        );
        if let Some(mode_prompt) = &config.mode_prompt {
            host.hooks.define(
                MODE_PROMPT,
                PromptTemplate::parse(mode_prompt.clone()).into_hook(context.clone()),
            );
        }

        Self {
            host,
            context,
            shell: config.shell.clone(),
            mode,
            out,
        }
    }

    pub fn host(&self) -> &ShellHost {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut ShellHost {
        &mut self.host
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run until `exit` or end of input. Returns the session's exit status.
    pub async fn run<R>(&mut self, input: R) -> Result<i32>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();

        loop {
            self.draw_prompt();

            let line = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    // Drop the half-typed line and start a fresh prompt.
                    let _ = writeln!(self.out);
                    continue;
                }
                line = lines.next_line() => line.context("stdin read failed")?,
            };

            let Some(line) = line else {
                tracing::debug!("end of input");
                let _ = writeln!(self.out);
                break;
            };

            match self.eval(&line).await {
                Some(Outcome::Exit(code)) => return Ok(code),
                Some(Outcome::Status(_)) | None => {}
            }
        }

        Ok(self.context.status())
    }

    /// One prompt: the prompt event, then the mode and primary hooks.
    ///
    /// A failing user prompt is reported and the loop carries on.
    /// A broken mode indicator still leaves a primary prompt behind it.
    pub fn draw_prompt(&mut self) {
        if let Err(e) = self.host.fire_prompt(&mut self.out) {
            report("prompt event", &e);
        }
        if let Err(e) = self.host.render_mode_prompt(&mut self.out) {
            report("mode prompt", &e);
        }
        if let Err(e) = self.host.render_primary_prompt(&mut self.out) {
            report("prompt", &e);
        }
        let _ = self.out.flush();
    }

    /// Execute one command line between pre-exec and post-exec.
    ///
    /// Blank lines run nothing and fire no events.
    pub async fn eval(&mut self, line: &str) -> Option<Outcome> {
        let command_line = line.trim();
        if command_line.is_empty() {
            return None;
        }

        if let Err(e) = self.host.fire_preexec(command_line, &mut self.out) {
            tracing::warn!(error = %e, "preexec handler failed");
        }

        let outcome = self.execute(command_line).await;
        let status = match &outcome {
            Outcome::Status(s) | Outcome::Exit(s) => *s,
        };
        self.context.set_status(status);

        if let Err(e) = self.host.fire_postexec(command_line, status, &mut self.out) {
            tracing::warn!(error = %e, "postexec handler failed");
        }

        Some(outcome)
    }

    async fn execute(&mut self, command_line: &str) -> Outcome {
        let mut words = command_line.split_whitespace();
        match words.next() {
            Some("exit") => {
                let code = words
                    .next()
                    .and_then(|s| s.parse::<i32>().ok())
                    .unwrap_or_else(|| self.context.status());
                Outcome::Exit(code)
            }
            Some("cd") => Outcome::Status(self.change_dir(words.next())),
            _ => match self.spawn(command_line).await {
                Ok(status) => Outcome::Status(status),
                Err(e) => {
                    let _ = writeln!(self.out, "shellmark: {e:#}");
                    Outcome::Status(127)
                }
            },
        }
    }

    fn change_dir(&mut self, target: Option<&str>) -> i32 {
        let target = match target {
            Some(t) => std::path::PathBuf::from(t),
            None => match directories::BaseDirs::new() {
                Some(dirs) => dirs.home_dir().to_path_buf(),
                None => return 1,
            },
        };

        match std::env::set_current_dir(&target) {
            Ok(()) => 0,
            Err(e) => {
                let _ = writeln!(self.out, "cd: {}: {}", target.display(), e);
                1
            }
        }
    }

    async fn spawn(&mut self, command_line: &str) -> Result<i32> {
        let flag = if cfg!(windows) { "/C" } else { "-c" };
        let mut cmd = tokio::process::Command::new(&self.shell);
        cmd.args([flag, command_line]);

        tracing::debug!(shell = %self.shell, command = command_line, "spawn");

        match self.mode {
            ExecMode::Inherit => {
                let status = cmd
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .await
                    .with_context(|| format!("failed to run {}", self.shell))?;
                Ok(exit_code(status))
            }
            ExecMode::Capture => {
                let output = cmd
                    .stdin(Stdio::null())
                    .output()
                    .await
                    .with_context(|| format!("failed to run {}", self.shell))?;
                self.out.write_all(&output.stdout)?;
                self.out.write_all(&output.stderr)?;
                Ok(exit_code(output.status))
            }
        }
    }
}

fn report(what: &str, e: &anyhow::Error) {
    tracing::warn!(error = %e, "{what} failed");
    eprintln!("shellmark: {what}: {e:#}");
}

/// Shell convention: 128 + signal number when killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }

    -1
}
