use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use vcvars::arch::vcvarsall_arg;
use vcvars::config::{ToolchainLayout, VS7_KEY};
use vcvars::host::{HostBits, HostProbe, StaticHost, HOST_64BIT_MARKER};
use vcvars::process::{CommandSpec, ProcessOutput, ProcessRunner};
use vcvars::registry::{Hive, MapRegistry};
use vcvars::{
    Architecture, EnvironmentResolver, Result, ToolchainSelector, ToolchainVersion, VcvarsError,
};

const WOW64_VS7_KEY: &str = r"SOFTWARE\Wow6432Node\Microsoft\VisualStudio\SxS\VS7";

/// Windows host whose file checks go to the real filesystem.
struct DiskHost {
    vars: HashMap<String, String>,
}

impl DiskHost {
    fn new(bits: HostBits) -> Self {
        let mut vars = HashMap::new();
        if bits.is_64bit() {
            vars.insert(HOST_64BIT_MARKER.to_string(), "C:\\Program Files (x86)".to_string());
        }
        Self { vars }
    }
}

impl HostProbe for DiskHost {
    fn os(&self) -> &str {
        "windows"
    }

    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[derive(Default)]
struct FakeRunner {
    output: ProcessOutput,
    calls: RefCell<Vec<CommandSpec>>,
}

impl FakeRunner {
    fn succeeding(lines: &[&str]) -> Self {
        Self {
            output: ProcessOutput {
                exit_code: Some(0),
                stdout_lines: lines.iter().map(|s| s.to_string()).collect(),
                stderr: String::new(),
            },
            calls: RefCell::new(Vec::new()),
        }
    }

    fn failing(code: i32, stdout: &[&str], stderr: &str) -> Self {
        Self {
            output: ProcessOutput {
                exit_code: Some(code),
                stdout_lines: stdout.iter().map(|s| s.to_string()).collect(),
                stderr: stderr.to_string(),
            },
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, spec: &CommandSpec, _timeout: Duration) -> Result<ProcessOutput> {
        self.calls.borrow_mut().push(spec.clone());
        Ok(self.output.clone())
    }
}

fn install_vs(root: &Path, version: ToolchainVersion) {
    let script = ToolchainLayout::default_for(version).script_in(root);
    fs::create_dir_all(script.parent().unwrap()).unwrap();
    fs::write(&script, "@echo off\r\n").unwrap();
}

#[test]
fn test_arch_mapping_on_simulated_hosts() {
    for version in [ToolchainVersion::Vs2015, ToolchainVersion::Vs2017] {
        let layout = ToolchainLayout::default_for(version);
        assert_eq!(vcvarsall_arg(Architecture::X86, HostBits::Bits64, &layout), "amd64_x86");
        assert_eq!(vcvarsall_arg(Architecture::X86_64, HostBits::Bits64, &layout), "amd64");
    }
    for version in ToolchainVersion::ALL {
        let layout = ToolchainLayout::default_for(version);
        assert_eq!(vcvarsall_arg(Architecture::X86, HostBits::Bits32, &layout), "x86");
        assert_eq!(vcvarsall_arg(Architecture::X86_64, HostBits::Bits32, &layout), "x86_amd64");
    }
}

#[test]
fn test_resolves_installed_toolchain_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    install_vs(dir.path(), ToolchainVersion::Vs2017);

    let registry = Rc::new(MapRegistry::new().with_value(
        Hive::LocalMachine,
        WOW64_VS7_KEY,
        "15.0",
        &dir.path().to_string_lossy(),
    ));
    let runner = Rc::new(FakeRunner::succeeding(&[
        "INCLUDE=C:\\VS\\VC\\include",
        "",
        "Platform=x64",
        "PLATFORM=X64",
    ]));

    let resolver = EnvironmentResolver::new(
        Box::new(DiskHost::new(HostBits::Bits64)),
        Box::new(registry.clone()),
        Box::new(runner.clone()),
    );
    let table = resolver
        .resolve(&ToolchainSelector::new(ToolchainVersion::Vs2017, Architecture::X86_64))
        .unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.get("platform"), Some("X64"));
    assert_eq!(registry.reads(), 1);

    let calls = runner.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, "cmd");
    assert!(calls[0].args[2].contains("vcvarsall.bat\" amd64 > NUL && set"));
}

#[test]
fn test_missing_registry_key_never_starts_process() {
    let runner = Rc::new(FakeRunner::succeeding(&["A=1"]));
    let resolver = EnvironmentResolver::new(
        Box::new(DiskHost::new(HostBits::Bits64)),
        Box::new(MapRegistry::new()),
        Box::new(runner.clone()),
    );

    let err = resolver
        .resolve(&ToolchainSelector::new(ToolchainVersion::Vs2015, Architecture::X86))
        .unwrap_err();
    assert!(matches!(err, VcvarsError::LookupError(_)));
    assert!(runner.calls.borrow().is_empty());
}

#[test]
fn test_script_missing_on_disk_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let registry = MapRegistry::new().with_value(
        Hive::LocalMachine,
        VS7_KEY,
        "14.0",
        &dir.path().to_string_lossy(),
    );
    let runner = Rc::new(FakeRunner::succeeding(&["A=1"]));
    let resolver = EnvironmentResolver::new(
        Box::new(DiskHost::new(HostBits::Bits32)),
        Box::new(registry),
        Box::new(runner.clone()),
    );

    let err = resolver
        .resolve(&ToolchainSelector::new(ToolchainVersion::Vs2015, Architecture::X86))
        .unwrap_err();
    assert!(matches!(err, VcvarsError::NotFoundError(_)));
    assert!(runner.calls.borrow().is_empty());
}

#[test]
fn test_nonzero_exit_is_execution_error_with_stderr() {
    let dir = tempfile::tempdir().unwrap();
    install_vs(dir.path(), ToolchainVersion::Vs2013);
    let registry = MapRegistry::new().with_value(
        Hive::LocalMachine,
        WOW64_VS7_KEY,
        "12.0",
        &dir.path().to_string_lossy(),
    );
    let runner = Rc::new(FakeRunner::failing(
        1,
        &["PARTIAL=1"],
        "The input line is too long.",
    ));
    let resolver = EnvironmentResolver::new(
        Box::new(DiskHost::new(HostBits::Bits64)),
        Box::new(registry),
        Box::new(runner.clone()),
    );

    let err = resolver
        .resolve(&ToolchainSelector::new(ToolchainVersion::Vs2013, Architecture::X86_64))
        .unwrap_err();
    match err {
        VcvarsError::ExecutionError(msg) => assert!(msg.contains("The input line is too long.")),
        other => panic!("expected ExecutionError, got {other}"),
    }
    // 2013 only has 32-bit-hosted compilers, even on a 64-bit host.
    assert!(runner.calls.borrow()[0].args[2].contains(" x86_amd64 "));
}

#[test]
fn test_wrong_platform_fails_before_registry_access() {
    let registry = Rc::new(MapRegistry::new().with_value(
        Hive::LocalMachine,
        VS7_KEY,
        "15.0",
        "C:\\VS",
    ));
    let runner = Rc::new(FakeRunner::succeeding(&["A=1"]));
    let resolver = EnvironmentResolver::new(
        Box::new(StaticHost::with_os("linux")),
        Box::new(registry.clone()),
        Box::new(runner.clone()),
    );

    let err = resolver
        .resolve(&ToolchainSelector::new(ToolchainVersion::Vs2017, Architecture::X86))
        .unwrap_err();
    assert!(matches!(err, VcvarsError::PlatformError(_)));
    assert_eq!(registry.reads(), 0);
    assert!(runner.calls.borrow().is_empty());
}

#[cfg(not(windows))]
#[test]
fn test_system_resolver_off_windows_is_platform_error() {
    let err = EnvironmentResolver::system()
        .resolve(&ToolchainSelector::new(ToolchainVersion::Vs2017, Architecture::X86_64))
        .unwrap_err();
    assert!(matches!(err, VcvarsError::PlatformError(_)));
}
