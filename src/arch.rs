use crate::config::{Architecture, ToolchainLayout};
use crate::host::HostBits;

/// Argument vcvarsall.bat expects for the host/target pair.
///
/// A 64-bit host uses the native 64-bit compilers unless the toolchain only
/// ships 32-bit-hosted ones.
pub fn vcvarsall_arg(arch: Architecture, host: HostBits, layout: &ToolchainLayout) -> &'static str {
    let use_64bit_host = host.is_64bit() && !layout.native_32bit_tooling;
    match (arch, use_64bit_host) {
        (Architecture::X86, true) => "amd64_x86",
        (Architecture::X86, false) => "x86",
        (Architecture::X86_64, true) => "amd64",
        (Architecture::X86_64, false) => "x86_amd64",
    }
}
