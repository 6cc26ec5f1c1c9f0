use std::{
    ffi::OsStr,
    io,
    process::{Command, Output, Stdio},
    string::FromUtf8Error,
};

use anyhow::anyhow;
use console::style;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::logger;

/// A wrapper around [`xshell::Cmd`] that allows for improved error handling,
/// and verbose logging.
#[derive(Debug)]
pub struct Cmd<'a> {
    inner: xshell::Cmd<'a>,
    verbose: bool,
}

#[derive(thiserror::Error, Debug)]
#[error("Cmd error: {source} {stderr:?}")]
pub struct CmdError {
    stderr: Option<String>,
    source: anyhow::Error,
}

impl From<xshell::Error> for CmdError {
    fn from(value: xshell::Error) -> Self {
        Self {
            stderr: None,
            source: value.into(),
        }
    }
}

impl From<io::Error> for CmdError {
    fn from(value: io::Error) -> Self {
        Self {
            stderr: None,
            source: value.into(),
        }
    }
}

impl From<FromUtf8Error> for CmdError {
    fn from(value: FromUtf8Error) -> Self {
        Self {
            stderr: None,
            source: value.into(),
        }
    }
}

pub type CmdResult<T> = Result<T, CmdError>;

/// Exit code, stdout and stderr of a command run with [`Cmd::run_streamed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    fn spawn_failure(command: &str, error: io::Error) -> Self {
        Self {
            exit_code: 1,
            stdout: String::new(),
            stderr: format!("Failed to spawn `{command}`: {error}"),
        }
    }
}

impl<'a> Cmd<'a> {
    /// Create a new `Cmd` instance.
    pub fn new(cmd: xshell::Cmd<'a>) -> Self {
        Self {
            inner: cmd,
            verbose: false,
        }
    }

    /// Log the command line and its completion.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set env variables for the command.
    pub fn env<K: AsRef<OsStr>, V: AsRef<OsStr>>(mut self, key: K, value: V) -> Self {
        self.inner = self.inner.env(key, value);
        self
    }

    /// Run the command without capturing its output.
    pub fn run(mut self) -> CmdResult<()> {
        let command_txt = self.inner.to_string();
        let output = if self.verbose {
            logger::debug(format!("Running: {}", self.inner));
            logger::new_empty_line();
            let output = run_low_level_process_command(self.inner.into())?;
            if let Ok(data) = String::from_utf8(output.stderr.clone()) {
                if !data.is_empty() {
                    logger::info(data)
                }
            }
            logger::new_empty_line();
            logger::new_line();
            output
        } else {
            // Command will be logged manually.
            self.inner.set_quiet(true);
            // Error will be handled manually.
            self.inner.set_ignore_status(true);
            self.inner.output()?
        };

        check_output_status(&command_txt, &output)?;
        if self.verbose {
            logger::debug(format!("Command completed: {}", command_txt));
        }

        Ok(())
    }

    /// Run the command, mirroring stdout and stderr to the console as they are
    /// produced while also capturing both streams.
    ///
    /// Never fails: a command that cannot be spawned reports exit code 1 with the
    /// spawn error as its stderr, and a command terminated by a signal reports 1.
    pub async fn run_streamed(self) -> CmdOutput {
        let command_txt = self.inner.to_string();
        if self.verbose {
            logger::debug(format!("Running: {command_txt}"));
        }

        let mut command = tokio::process::Command::from(Command::from(self.inner));
        command
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => return CmdOutput::spawn_failure(&command_txt, err),
        };

        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();
        let (stdout, stderr, status) = tokio::join!(
            tee(child_stdout, tokio::io::stdout()),
            tee(child_stderr, tokio::io::stderr()),
            child.wait(),
        );

        let mut stderr = String::from_utf8_lossy(&stderr).into_owned();
        let exit_code = match status {
            Ok(status) => status.code().unwrap_or(1),
            Err(err) => {
                stderr.push_str(&format!("\nFailed to wait for `{command_txt}`: {err}"));
                1
            }
        };

        if self.verbose {
            logger::debug(format!(
                "Command completed with exit code {exit_code}: {command_txt}"
            ));
        }

        CmdOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr,
        }
    }
}

async fn tee<R, W>(source: Option<R>, mut sink: W) -> Vec<u8>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut captured = Vec::new();
    let Some(mut source) = source else {
        return captured;
    };

    let mut buf = [0u8; 8192];
    loop {
        match source.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                captured.extend_from_slice(&buf[..n]);
                // Mirroring is best effort, the captured copy is what callers rely on.
                let _ = sink.write_all(&buf[..n]).await;
                let _ = sink.flush().await;
            }
        }
    }

    captured
}

fn check_output_status(command_text: &str, output: &Output) -> CmdResult<()> {
    if !output.status.success() {
        logger::new_line();
        logger::error_note(
            &format!("Command failed to run: {}", command_text),
            &log_output(output),
        );
        return Err(CmdError {
            stderr: Some(String::from_utf8(output.stderr.clone())?),
            source: anyhow!("Command failed to run: {}", command_text),
        });
    }

    Ok(())
}

fn run_low_level_process_command(mut command: Command) -> io::Result<Output> {
    command.stdout(Stdio::inherit());
    command.stderr(Stdio::piped());
    let child = command.spawn()?;
    child.wait_with_output()
}

fn log_output(output: &Output) -> String {
    let (status, stdout, stderr) = get_indented_output(output, 4, 120);
    let status_header = style("  Status:").bold();
    let stdout_header = style("  Stdout:").bold();
    let stderr_header = style("  Stderr:").bold();

    format!("{status_header}\n{status}\n{stdout_header}\n{stdout}\n{stderr_header}\n{stderr}")
}

// Indent output and wrap text.
fn get_indented_output(output: &Output, indentation: usize, wrap: usize) -> (String, String, String) {
    let status = output.status.to_string();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    let indent = |s: &str| {
        s.lines()
            .map(|l| format!("{:indent$}{}", "", l, indent = indentation))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let wrap_text_to_len = |s: &str| {
        let mut result = String::new();

        for original_line in s.split('\n') {
            if original_line.trim().is_empty() {
                result.push('\n');
                continue;
            }

            let mut line = String::new();
            for word in original_line.split_whitespace() {
                if line.len() + word.len() + 1 > wrap {
                    result.push_str(&line);
                    result.push('\n');
                    line.clear();
                }
                if !line.is_empty() {
                    line.push(' ');
                }
                line.push_str(word);
            }
            result.push_str(&line);
            result.push('\n');
        }

        result
    };

    (
        indent(&wrap_text_to_len(&status)),
        indent(&wrap_text_to_len(&stdout)),
        indent(&wrap_text_to_len(&stderr)),
    )
}

#[cfg(test)]
mod tests {
    use xshell::{cmd, Shell};

    use super::*;

    #[tokio::test]
    async fn streamed_run_captures_both_streams_and_exit_code() {
        let shell = Shell::new().unwrap();
        let script = "echo to-stdout; echo to-stderr >&2; exit 3";

        let output = Cmd::new(cmd!(shell, "sh -c {script}")).run_streamed().await;

        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
        assert_eq!(output.stdout.trim(), "to-stdout");
        assert_eq!(output.stderr.trim(), "to-stderr");
    }

    #[tokio::test]
    async fn streamed_run_passes_environment() {
        let shell = Shell::new().unwrap();
        let script = "printf %s \"$ANYFLOW_TEST_VALUE\"";

        let output = Cmd::new(cmd!(shell, "sh -c {script}"))
            .env("ANYFLOW_TEST_VALUE", "42")
            .run_streamed()
            .await;

        assert!(output.success());
        assert_eq!(output.stdout, "42");
    }

    #[tokio::test]
    async fn streamed_run_of_missing_program_does_not_fail() {
        let shell = Shell::new().unwrap();

        let output = Cmd::new(cmd!(shell, "anyflow-test-program-that-does-not-exist"))
            .run_streamed()
            .await;

        assert_ne!(output.exit_code, 0);
        assert!(!output.stderr.is_empty());
        assert!(output.stdout.is_empty());
    }

    #[test]
    fn run_reports_failed_status() {
        let shell = Shell::new().unwrap();
        assert!(Cmd::new(cmd!(shell, "sh -c 'exit 2'")).run().is_err());
        assert!(Cmd::new(cmd!(shell, "true")).run().is_ok());
    }

    #[test]
    fn indented_output_wraps_long_lines() {
        let output = Command::new("sh")
            .args(["-c", "echo one two three"])
            .output()
            .unwrap();

        let (_, stdout, _) = get_indented_output(&output, 2, 8);

        assert!(stdout.starts_with("  one two\n  three\n"));
    }
}
