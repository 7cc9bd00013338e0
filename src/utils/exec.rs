//! External command execution utilities.
//!
//! Provides a Builder-based API for running `git` subprocesses with proper
//! output handling, PTY support, and stdin piping.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! // Simple command
//! Cmd::new("git").args(["rev-parse", "HEAD"]).cwd(root).run()?;
//!
//! // With stdin piping (fast-import reads its stream from stdin)
//! Cmd::new("git")
//!     .args(["fast-import", "--quiet"])
//!     .cwd(root)
//!     .stdin(stream)
//!     .run()?;
//!
//! // Or stream stdin from a writer instead of a buffer
//! Cmd::new("git")
//!     .args(["fast-import", "--quiet"])
//!     .stdin_with(|out| encode(&plan, out))
//!     .run()?;
//!
//! // With PTY, so credential prompts reach the terminal
//! exec!(pty=true; root; "git"; "push", "origin", "gh-pages")?;
//! ```

use crate::log;
use anyhow::{Context, Result};
use portable_pty::{CommandBuilder, NativePtySystem, PtySize, PtySystem};
use regex::Regex;
use std::{
    ffi::{OsStr, OsString},
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
    sync::OnceLock,
    thread,
};

// ============================================================================
// Builder API
// ============================================================================

/// Producer of a child's stdin, run on its own thread.
type StdinWriter<'a> = Box<dyn FnOnce(&mut dyn Write) -> io::Result<()> + Send + 'a>;

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd<'a> {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    stdin: Option<StdinWriter<'a>>,
    use_pty: bool,
    filter: Option<&'static FilterRule>,
}

impl<'a> Cmd<'a> {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Add a single argument. Empty arguments are dropped.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set stdin data to pipe to the process.
    pub fn stdin<D: Into<Vec<u8>>>(self, data: D) -> Self {
        let data = data.into();
        self.stdin_with(move |out| out.write_all(&data))
    }

    /// Produce stdin with `write` while the process runs.
    ///
    /// Nothing is buffered beyond what `write` holds at once.
    pub fn stdin_with<F>(mut self, write: F) -> Self
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()> + Send + 'a,
    {
        self.stdin = Some(Box::new(write));
        self
    }

    /// Enable PTY (pseudo-terminal) mode.
    ///
    /// PTY lets `git push` behave as if running in a real terminal,
    /// so progress output and credential prompts work.
    pub fn pty(mut self, enable: bool) -> Self {
        self.use_pty = enable;
        self
    }

    /// Set output filter for logging.
    pub fn filter(mut self, filter: &'static FilterRule) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Execute the command and return output.
    pub fn run(mut self) -> Result<Output> {
        let filter = self.filter.unwrap_or(&EMPTY_FILTER);

        match self.stdin.take() {
            Some(write) => self.run_with_stdin(write, filter),
            None if self.use_pty => self.run_with_pty(filter),
            None => self.run_simple(filter),
        }
    }

    /// Get the program name for error messages.
    fn program_name(&self) -> String {
        let mut name = self.program.to_string_lossy().to_string();
        // `git fast-import` reads better than `git` in failures
        if let Some(sub) = self.args.first() {
            name.push(' ');
            name.push_str(&sub.to_string_lossy());
        }
        name
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Simple execution without PTY or stdin.
    fn run_simple(self, filter: &'static FilterRule) -> Result<Output> {
        let name = self.program_name();
        let output = self
            .command()
            .output()
            .with_context(|| format!("Failed to execute `{name}`"))?;

        log_output(&name, &output, filter)?;
        Ok(output)
    }

    /// Execution with stdin piping.
    ///
    /// stdin is written on a scoped thread while stdout and stderr are
    /// collected, so a child that exits early still reports its stderr.
    fn run_with_stdin(self, write: StdinWriter<'a>, filter: &'static FilterRule) -> Result<Output> {
        let name = self.program_name();

        let mut child = self
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn `{name}`"))?;
        let stdin = child
            .stdin
            .take()
            .with_context(|| format!("No stdin pipe for `{name}`"))?;

        let (written, output) = thread::scope(|scope| {
            let writer = scope.spawn(move || {
                let mut stdin = BufWriter::new(stdin);
                write(&mut stdin)?;
                stdin.flush()
                // stdin drops here so the child sees EOF
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output.with_context(|| format!("Failed to wait for `{name}`"))?;
        let written = written.unwrap_or_else(|panic| std::panic::resume_unwind(panic));

        // The child's own error explains a broken pipe better than EPIPE
        if !output.status.success() {
            anyhow::bail!(format_error(&name, &output));
        }
        written.with_context(|| format!("Failed to write stdin to `{name}`"))?;

        log_output(&name, &output, filter)?;
        Ok(output)
    }

    /// Execution with PTY support.
    fn run_with_pty(self, filter: &'static FilterRule) -> Result<Output> {
        let name = self.program_name();

        let mut cmd_builder = CommandBuilder::new(&self.program);
        cmd_builder.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd_builder.cwd(dir);
        }

        let pty_system = NativePtySystem::default();
        let pair = pty_system.openpty(PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        })?;

        let mut child = pair
            .slave
            .spawn_command(cmd_builder)
            .with_context(|| format!("Failed to spawn `{name}`"))?;
        drop(pair.slave);

        // Read output in separate thread (PTY blocks until EOF)
        let mut reader = pair.master.try_clone_reader()?;
        let output_handle = std::thread::spawn(move || {
            let mut output = String::new();
            let _ = reader.read_to_string(&mut output);
            output
        });

        let status = child.wait()?;
        drop(pair.master);

        let output_str = output_handle
            .join()
            .map_err(|_| anyhow::anyhow!("Failed to join output reader thread"))?;

        if !status.success() {
            anyhow::bail!(
                "Command `{name}` failed with exit code {}\n{}",
                status.exit_code(),
                strip_ansi(output_str.trim())
            );
        }

        filter.log(&name, &output_str);

        #[cfg(unix)]
        #[allow(clippy::cast_possible_wrap)]
        let std_status = {
            use std::os::unix::process::ExitStatusExt;
            std::process::ExitStatus::from_raw((status.exit_code() as i32) << 8)
        };
        #[cfg(windows)]
        let std_status = {
            use std::os::windows::process::ExitStatusExt;
            std::process::ExitStatus::from_raw(status.exit_code())
        };

        Ok(Output {
            status: std_status,
            stdout: output_str.into_bytes(),
            stderr: Vec::new(),
        })
    }
}

// ============================================================================
// Macro (syntax sugar for simple cases)
// ============================================================================

/// Run an external command with arguments.
///
/// # Syntax
///
/// ```ignore
/// exec!(root; "git"; "status", "-s")?;
/// exec!(pty=true; root; "git"; "push")?;
/// exec!(pty=true; filter=&F; root; "git"; args...)?;
/// ```
#[macro_export]
macro_rules! exec {
    (pty=$pty:expr; filter=$filter:expr; $root:expr; $cmd:expr; $($arg:expr),* $(,)?) => {
        $crate::utils::exec::Cmd::new($cmd)
            $(.arg($arg))*
            .cwd($root)
            .pty($pty)
            .filter($filter)
            .run()
    };
    (pty=$pty:expr; $root:expr; $cmd:expr; $($arg:expr),* $(,)?) => {
        $crate::utils::exec::Cmd::new($cmd)
            $(.arg($arg))*
            .cwd($root)
            .pty($pty)
            .run()
    };
    ($root:expr; $cmd:expr; $($arg:expr),* $(,)?) => {
        $crate::utils::exec::Cmd::new($cmd)
            $(.arg($arg))*
            .cwd($root)
            .run()
    };
}

// ============================================================================
// Output Filtering
// ============================================================================

/// Filter rule for command output logging.
///
/// Used to reduce noise by skipping known git chatter.
pub struct FilterRule {
    /// Prefixes to skip when logging output.
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    fn should_skip(&self, line: &str) -> bool {
        line.is_empty() || self.skip_prefixes.iter().any(|p| line.starts_with(p))
    }

    /// Log output lines that pass the filter.
    pub fn log(&self, name: &str, output: &str) {
        let lines: Vec<_> = output
            .lines()
            .map(strip_ansi)
            .filter(|line| !self.should_skip(line.trim()))
            .map(|line| line.trim().to_owned())
            .collect();

        if !lines.is_empty() {
            log!(name; "{}", lines.join("\n"));
        }
    }
}

/// Empty filter (no skipping).
pub const EMPTY_FILTER: FilterRule = FilterRule::new(&[]);

/// Silent filter (skip all output).
pub const SILENT_FILTER: FilterRule = FilterRule::new(&[""]);

// ============================================================================
// Helpers
// ============================================================================

/// Strip ANSI escape codes from string.
fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").unwrap());
    re.replace_all(s, "")
}

/// Log command output, returning error on failure.
fn log_output(name: &str, output: &Output, filter: &'static FilterRule) -> Result<()> {
    if !output.status.success() {
        anyhow::bail!(format_error(name, output));
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    filter.log(name, stderr.trim());
    Ok(())
}

/// Format error message for failed command.
fn format_error(name: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let mut msg = format!("Command `{name}` failed with {}", output.status);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        msg.push('\n');
        msg.push_str(stderr);
    }

    let stdout = stdout.trim();
    if !stdout.is_empty() {
        msg.push_str("\nStdout:\n");
        msg.push_str(stdout);
    }
    msg
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::new("git")
            .arg("push")
            .args(["origin", "", "gh-pages"])
            .cwd("/tmp");

        assert_eq!(cmd.program, OsString::from("git"));
        // empty argument is dropped
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(cmd.program_name(), "git push");
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mremote:\x1b[0m ok"), "remote: ok");
        assert_eq!(strip_ansi("\x1b[2Kplain"), "plain");
        assert_eq!(strip_ansi("no codes"), "no codes");
    }

    #[test]
    fn test_filter_skip() {
        const F: FilterRule = FilterRule::new(&["hint:"]);
        assert!(F.should_skip("hint: use --force"));
        assert!(F.should_skip(""));
        assert!(!F.should_skip("To github.com:user/repo.git"));
        assert!(SILENT_FILTER.should_skip("anything"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_stdin_roundtrip() {
        let output = Cmd::new("cat").stdin("hello").run().unwrap();
        assert_eq!(output.stdout, b"hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_stdin_writer() {
        let lines = ["first", "second"];
        let output = Cmd::new("cat")
            .stdin_with(|out| {
                for line in lines {
                    writeln!(out, "{line}")?;
                }
                Ok(())
            })
            .run()
            .unwrap();
        assert_eq!(output.stdout, b"first\nsecond\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_stdin_early_exit_keeps_stderr() {
        // Far more than a pipe buffer, so the write hits a closed pipe
        let err = Cmd::new("sh")
            .args(["-c", "echo 'fatal: Branch name rejected' >&2; exit 128"])
            .stdin(vec![b'x'; 4 << 20])
            .run()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("`sh -c`"), "{msg}");
        assert!(msg.contains("fatal: Branch name rejected"), "{msg}");
        assert!(!msg.contains("Broken pipe"), "{msg}");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_stdin_writer_error() {
        let err = Cmd::new("cat")
            .stdin_with(|_| Err(io::Error::other("source vanished")))
            .run()
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to write stdin to `cat`"));
        assert_eq!(err.root_cause().to_string(), "source vanished");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_failure_reports_program() {
        let err = Cmd::new("sh").args(["-c", "echo boom >&2; exit 3"]).run().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("`sh -c`"));
        assert!(msg.contains("boom"));
    }
}
