//! Capture the environment a batch script leaves behind.
//!
//! The script runs inside `cmd` with its own output sent to `NUL`, chained to
//! `set`; only what `set` prints reaches our stdout. `/u` makes `cmd` write
//! that output as UTF-16LE, so values outside the console code page survive.

use std::path::Path;
use std::time::Duration;

use crate::env::{parse_env_lines, EnvironmentTable};
use crate::errors::{Result, VcvarsError};
use crate::process::{CommandSpec, ProcessRunner};

/// `cmd /u /c ""<script>" <arg> > NUL && set"`.
pub fn capture_command(script: &Path, arg: &str) -> CommandSpec {
    let line = format!("\"\"{}\" {} > NUL && set\"", script.display(), arg);
    CommandSpec::new("cmd")
        .arg("/u")
        .arg("/c")
        .arg(line)
        .verbatim(true)
        .wide_output(true)
}

/// Run `script arg` and return the environment it produced.
///
/// Nothing is returned unless the process exits with status zero.
pub fn capture_environment(
    runner: &dyn ProcessRunner,
    script: &Path,
    arg: &str,
    timeout: Duration,
) -> Result<EnvironmentTable> {
    let spec = capture_command(script, arg);
    tracing::debug!(script = %script.display(), arg, "Running vcvarsall");
    let output = runner.run(&spec, timeout)?;

    if !output.success() {
        let stderr = output.stderr.trim();
        let message = if stderr.is_empty() {
            match output.exit_code {
                Some(code) => format!("vcvarsall exited with code {}", code),
                None => "vcvarsall was terminated".to_string(),
            }
        } else {
            stderr.to_string()
        };
        return Err(VcvarsError::ExecutionError(message));
    }

    Ok(parse_env_lines(&output.stdout_lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessOutput;
    use std::cell::RefCell;

    struct ScriptedRunner {
        output: ProcessOutput,
        seen: RefCell<Vec<CommandSpec>>,
    }

    impl ProcessRunner for ScriptedRunner {
        fn run(&self, spec: &CommandSpec, _timeout: Duration) -> Result<ProcessOutput> {
            self.seen.borrow_mut().push(spec.clone());
            Ok(self.output.clone())
        }
    }

    fn runner(exit_code: i32, stdout: &[&str], stderr: &str) -> ScriptedRunner {
        ScriptedRunner {
            output: ProcessOutput {
                exit_code: Some(exit_code),
                stdout_lines: stdout.iter().map(|s| s.to_string()).collect(),
                stderr: stderr.to_string(),
            },
            seen: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn test_capture_command_suppresses_script_output() {
        let spec = capture_command(Path::new(r"C:\VS\VC\vcvarsall.bat"), "amd64");
        assert_eq!(spec.program, "cmd");
        assert_eq!(spec.args[0], "/u");
        assert_eq!(spec.args[1], "/c");
        assert_eq!(
            spec.args[2],
            r#"""C:\VS\VC\vcvarsall.bat" amd64 > NUL && set""#
        );
        assert!(spec.verbatim);
        assert!(spec.wide_output);
    }

    #[test]
    fn test_capture_parses_set_output() {
        let runner = runner(0, &["INCLUDE=C:\\VC\\include", "", "  ", "LIB=C:\\VC\\lib"], "");
        let table = capture_environment(
            &runner,
            Path::new("vcvarsall.bat"),
            "x86",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("LIB"), Some("C:\\VC\\lib"));
        assert_eq!(runner.seen.borrow().len(), 1);
    }

    #[test]
    fn test_nonzero_exit_discards_output() {
        let runner = runner(1, &["A=1"], "ERROR: Cannot determine the location of the VS Common Tools folder.\r\n");
        let err = capture_environment(
            &runner,
            Path::new("vcvarsall.bat"),
            "x86",
            Duration::from_secs(1),
        )
        .unwrap_err();
        match err {
            VcvarsError::ExecutionError(msg) => {
                assert_eq!(
                    msg,
                    "ERROR: Cannot determine the location of the VS Common Tools folder."
                )
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nonzero_exit_without_stderr_reports_code() {
        let runner = runner(2, &[], "");
        let err = capture_environment(
            &runner,
            Path::new("vcvarsall.bat"),
            "x86",
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, VcvarsError::ExecutionError(msg) if msg.contains("code 2")));
    }
}
