//! Thin process wrapper around the `spicetify` CLI.
//!
//! Every call gets `--bypass-admin` so the tool does not refuse to run from an
//! elevated shell, and `backup`/`apply` additionally get `-q` so nothing waits on
//! an interactive prompt. Output is captured and classified once here.

use crate::error::{FailureKind, InvokeError};
use log::{debug, warn};
use regex::Regex;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

pub const PROGRAM: &str = "spicetify";
pub const BYPASS_ADMIN: &str = "--bypass-admin";
pub const QUIET: &str = "-q";

fn rate_limit_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"(?i)\brate[ -]limit").expect("static regex"))
}

/// Whole words only; "unsuccessful" is not a success.
fn success_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i)\bsuccess(ful(ly)?)?\b|\bspiced up\b").expect("static regex")
    })
}

/// What the process left behind, before any interpretation.
#[derive(Debug, Clone, Default)]
pub struct RawOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Executes the external tool. Swappable so tests can simulate the tool's store.
pub trait ToolRunner {
    fn run(&self, args: &[String]) -> Result<RawOutput, InvokeError>;
    fn is_available(&self) -> bool;
}

/// Runs the real binary, looked up on PATH first and in the install dir second.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    install_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(install_dir: PathBuf) -> Self {
        Self { install_dir }
    }

    /// Resolved on every call; the tool may get installed mid-session.
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Ok(path) = which::which(PROGRAM) {
            return Some(path);
        }
        let local = self.install_dir.join(exe_name());
        local.is_file().then_some(local)
    }
}

fn exe_name() -> String {
    format!("{}{}", PROGRAM, std::env::consts::EXE_SUFFIX)
}

impl ToolRunner for ProcessRunner {
    fn run(&self, args: &[String]) -> Result<RawOutput, InvokeError> {
        let program = self.resolve().ok_or_else(|| InvokeError::NotFound {
            program: PROGRAM.to_string(),
            install_dir: self.install_dir.clone(),
        })?;

        debug!("exec {} {}", program.display(), args.join(" "));
        let output = Command::new(&program)
            .args(args)
            .stdin(Stdio::null()) // never block on a prompt
            .output()
            .map_err(|source| match source.kind() {
                ErrorKind::NotFound => InvokeError::NotFound {
                    program: PROGRAM.to_string(),
                    install_dir: self.install_dir.clone(),
                },
                _ => InvokeError::Launch { program: program.display().to_string(), source },
            })?;

        Ok(RawOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn is_available(&self) -> bool {
        self.resolve().is_some()
    }
}

/// How a finished call should be read by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Non-zero exit, but the output shows the work finished and only a
    /// rate-limit warning tripped the exit code.
    Tolerated(FailureKind),
    Failed(FailureKind),
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub raw_code: i32,
    /// Exit code after the rate-limit override.
    pub code: i32,
    /// stdout followed by stderr.
    pub output: String,
    pub stdout: String,
    pub outcome: Outcome,
}

impl Invocation {
    fn from_raw(raw: RawOutput) -> Self {
        let output = combine(&raw);
        // Killed by a signal: no code at all
        let raw_code = raw.code.unwrap_or(-1);

        let outcome = if raw_code == 0 {
            Outcome::Success
        } else if is_soft_failure(&output) {
            Outcome::Tolerated(FailureKind::RateLimited)
        } else {
            Outcome::Failed(FailureKind::classify(&output))
        };
        let code = match outcome {
            Outcome::Tolerated(_) => 0,
            _ => raw_code,
        };

        Self { raw_code, code, output, stdout: raw.stdout, outcome }
    }

    pub fn succeeded(&self) -> bool {
        self.code == 0
    }
}

fn combine(raw: &RawOutput) -> String {
    match (raw.stdout.trim().is_empty(), raw.stderr.trim().is_empty()) {
        (_, true) => raw.stdout.clone(),
        (true, false) => raw.stderr.clone(),
        (false, false) => format!("{}\n{}", raw.stdout.trim_end(), raw.stderr),
    }
}

fn is_soft_failure(output: &str) -> bool {
    rate_limit_marker().is_match(output) && success_marker().is_match(output)
}

/// Handle to the external customization tool.
#[derive(Debug, Clone)]
pub struct Spicetify<R: ToolRunner = ProcessRunner> {
    runner: R,
}

impl<R: ToolRunner> Spicetify<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn is_available(&self) -> bool {
        self.runner.is_available()
    }

    /// Runs the tool and reports the (possibly overridden) exit status.
    pub fn invoke(&self, args: &[&str]) -> Result<Invocation, InvokeError> {
        let mut full = vec![BYPASS_ADMIN.to_string()];
        if matches!(args.first(), Some(&"backup") | Some(&"apply")) {
            full.push(QUIET.to_string());
        }
        full.extend(args.iter().map(|a| a.to_string()));

        let invocation = Invocation::from_raw(self.runner.run(&full)?);
        match invocation.outcome {
            Outcome::Success => {}
            Outcome::Tolerated(kind) => {
                warn!(
                    "spicetify {} exited {} ({}), output reports success",
                    args.join(" "),
                    invocation.raw_code,
                    kind
                )
            }
            Outcome::Failed(kind) => {
                debug!("spicetify {} exited {} ({})", args.join(" "), invocation.raw_code, kind)
            }
        }
        Ok(invocation)
    }

    /// Runs the tool and returns everything it printed, regardless of exit code.
    pub fn invoke_capture(&self, args: &[&str]) -> Result<String, InvokeError> {
        let mut full = vec![BYPASS_ADMIN.to_string()];
        full.extend(args.iter().map(|a| a.to_string()));
        let raw = self.runner.run(&full)?;
        Ok(combine(&raw))
    }

    pub fn version(&self) -> Option<String> {
        self.invoke_capture(&["-v"])
            .ok()
            .and_then(|out| out.lines().map(str::trim).find(|l| !l.is_empty()).map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Scripted {
        reply: RawOutput,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl Scripted {
        fn new(code: i32, stdout: &str, stderr: &str) -> Self {
            Self {
                reply: RawOutput { code: Some(code), stdout: stdout.into(), stderr: stderr.into() },
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ToolRunner for Scripted {
        fn run(&self, args: &[String]) -> Result<RawOutput, InvokeError> {
            self.calls.borrow_mut().push(args.to_vec());
            Ok(self.reply.clone())
        }
        fn is_available(&self) -> bool {
            true
        }
    }

    struct Missing;

    impl ToolRunner for Missing {
        fn run(&self, _args: &[String]) -> Result<RawOutput, InvokeError> {
            Err(InvokeError::NotFound {
                program: PROGRAM.into(),
                install_dir: PathBuf::from("/nowhere"),
            })
        }
        fn is_available(&self) -> bool {
            false
        }
    }

    #[test]
    fn quiet_flag_only_for_backup_and_apply() {
        let tool = Spicetify::new(Scripted::new(0, "", ""));
        tool.invoke(&["backup"]).unwrap();
        tool.invoke(&["apply", "--no-restart"]).unwrap();
        tool.invoke(&["restart"]).unwrap();
        tool.invoke_capture(&["config"]).unwrap();

        let calls = tool.runner().calls.borrow();
        assert_eq!(calls[0], vec!["--bypass-admin", "-q", "backup"]);
        assert_eq!(calls[1], vec!["--bypass-admin", "-q", "apply", "--no-restart"]);
        assert_eq!(calls[2], vec!["--bypass-admin", "restart"]);
        assert_eq!(calls[3], vec!["--bypass-admin", "config"]);
    }

    #[test]
    fn rate_limit_with_success_is_tolerated() {
        let tool = Spicetify::new(Scripted::new(
            1,
            "success Spotify is spiced up!",
            "warning GitHub API rate limit exceeded",
        ));
        let inv = tool.invoke(&["apply"]).unwrap();
        assert_eq!(inv.raw_code, 1);
        assert_eq!(inv.code, 0);
        assert_eq!(inv.outcome, Outcome::Tolerated(FailureKind::RateLimited));
        assert!(inv.succeeded());
    }

    #[test]
    fn rate_limit_without_success_stays_failed() {
        let tool = Spicetify::new(Scripted::new(1, "", "error API rate limit exceeded"));
        let inv = tool.invoke(&["apply"]).unwrap();
        assert_eq!(inv.code, 1);
        assert_eq!(inv.outcome, Outcome::Failed(FailureKind::RateLimited));
    }

    #[test]
    fn unsuccessful_is_not_a_success_marker() {
        let tool = Spicetify::new(Scripted::new(
            1,
            "",
            "error: apply unsuccessful: GitHub API rate limit exceeded",
        ));
        let inv = tool.invoke(&["apply", "--no-restart"]).unwrap();
        assert_eq!(inv.code, 1);
        assert_eq!(inv.outcome, Outcome::Failed(FailureKind::RateLimited));
        assert!(!inv.succeeded());
    }

    #[test]
    fn missing_tool_is_a_distinct_error() {
        let tool = Spicetify::new(Missing);
        let err = tool.invoke(&["apply"]).unwrap_err();
        assert!(matches!(err, InvokeError::NotFound { .. }));
        assert!(!tool.is_available());
    }

    #[test]
    fn capture_merges_stderr() {
        let tool = Spicetify::new(Scripted::new(0, "2.38.5\n", "warning: update available\n"));
        let out = tool.invoke_capture(&["-v"]).unwrap();
        assert!(out.contains("2.38.5"));
        assert!(out.contains("update available"));
        assert_eq!(tool.version().as_deref(), Some("2.38.5"));
    }
}
