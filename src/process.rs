use std::borrow::Cow;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

use crate::errors::{Result, VcvarsError};

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Pass `args` to the program unquoted. Needed on Windows for `cmd /c`
    /// lines that carry their own quoting; ignored elsewhere.
    pub verbatim: bool,
    /// Stdout is UTF-16LE (what `cmd /u` writes) rather than UTF-8.
    pub wide_output: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            verbatim: false,
            wide_output: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn verbatim(mut self, verbatim: bool) -> Self {
        self.verbatim = verbatim;
        self
    }

    pub fn wide_output(mut self, wide: bool) -> Self {
        self.wide_output = wide;
        self
    }
}

/// What a finished process left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
    pub stdout_lines: Vec<String>,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Starts a process and collects its output.
pub trait ProcessRunner {
    fn run(&self, spec: &CommandSpec, timeout: Duration) -> Result<ProcessOutput>;
}

impl<T: ProcessRunner + ?Sized> ProcessRunner for Rc<T> {
    fn run(&self, spec: &CommandSpec, timeout: Duration) -> Result<ProcessOutput> {
        (**self).run(spec, timeout)
    }
}

/// Runs commands on this machine, draining stdout and stderr on their own
/// threads so a full pipe never stalls the child.
///
/// The timeout bounds the whole call, output collection included. A
/// grandchild that inherits the pipes and outlives the child cannot hold
/// the caller past the deadline.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec, timeout: Duration) -> Result<ProcessOutput> {
        let mut cmd = build_command(spec);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            VcvarsError::ExecutionError(format!("Failed to spawn {}: {}", spec.program, e))
        })?;
        tracing::debug!(program = %spec.program, pid = child.id(), "Spawned process");

        let wide = spec.wide_output;
        let stdout_rx = spawn_reader(child.stdout.take(), move |stdout| {
            if wide {
                read_wide_lines(stdout)
            } else {
                read_lines(stdout)
            }
        });
        let stderr_rx = spawn_reader(child.stderr.take(), read_text);

        let started = Instant::now();
        let deadline = started + timeout;
        let status = match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                // Readers are left detached: a grandchild may still hold the pipes.
                return Err(timed_out(&spec.program, timeout));
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VcvarsError::ExecutionError(format!(
                    "Error waiting on {}: {}",
                    spec.program, e
                )));
            }
        };

        let stdout_lines = collect_reader(&stdout_rx, deadline, &spec.program, timeout)?;
        let stderr = collect_reader(&stderr_rx, deadline, &spec.program, timeout)?;
        tracing::debug!(
            program = %spec.program,
            exit_code = ?status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Process finished"
        );

        Ok(ProcessOutput {
            exit_code: status.code(),
            stdout_lines,
            stderr,
        })
    }
}

fn build_command(spec: &CommandSpec) -> Command {
    let mut cmd = Command::new(&spec.program);
    #[cfg(windows)]
    {
        if spec.verbatim {
            use std::os::windows::process::CommandExt;
            for arg in &spec.args {
                cmd.raw_arg(arg);
            }
            return cmd;
        }
    }
    cmd.args(&spec.args);
    cmd
}

fn timed_out(program: &str, timeout: Duration) -> VcvarsError {
    VcvarsError::ExecutionError(format!(
        "{} timed out after {}",
        program,
        humantime::format_duration(timeout)
    ))
}

/// Reads `stream` to the end on its own thread. A missing stream yields a
/// receiver whose sender is already gone.
fn spawn_reader<R, T, F>(stream: Option<R>, read: F) -> Receiver<std::io::Result<T>>
where
    R: Read + Send + 'static,
    T: Send + 'static,
    F: FnOnce(R) -> std::io::Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    if let Some(stream) = stream {
        thread::spawn(move || {
            let _ = tx.send(read(stream));
        });
    }
    rx
}

fn collect_reader<T>(
    rx: &Receiver<std::io::Result<T>>,
    deadline: Instant,
    program: &str,
    timeout: Duration,
) -> Result<T> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(VcvarsError::ExecutionError(format!(
            "Failed to read process output: {}",
            e
        ))),
        Err(RecvTimeoutError::Timeout) => {
            tracing::warn!(program = %program, "Output pipes still open after the process exited");
            Err(timed_out(program, timeout))
        }
        Err(RecvTimeoutError::Disconnected) => Err(VcvarsError::ExecutionError(
            "Output reader was interrupted".to_string(),
        )),
    }
}

fn read_lines(stream: impl Read) -> std::io::Result<Vec<String>> {
    let mut reader = BufReader::new(stream);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    let mut lossy = 0usize;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        if let Cow::Owned(_) = line {
            lossy += 1;
        }
        lines.push(line.trim_end_matches(['\r', '\n']).to_string());
    }
    if lossy > 0 {
        tracing::warn!(lines = lossy, "Output was not valid UTF-8; some characters were replaced");
    }
    Ok(lines)
}

/// Decodes UTF-16LE output into lines.
fn read_wide_lines(mut stream: impl Read) -> std::io::Result<Vec<String>> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    let units: Vec<u16> = buf
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let text = match String::from_utf16(&units) {
        Ok(text) if buf.len() % 2 == 0 => text,
        _ => {
            tracing::warn!("Output was not valid UTF-16; some characters were replaced");
            String::from_utf16_lossy(&units)
        }
    };
    Ok(text.lines().map(|line| line.trim_end_matches('\r').to_string()).collect())
}

fn read_text(mut stream: impl Read) -> std::io::Result<String> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
