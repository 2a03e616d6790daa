//! Best-effort POSIX resource limits applied to the sandbox child
//! process, ported from `SecureProcessRunner.set_resource_limits` (which
//! itself wraps `resource.setrlimit`). On platforms without these
//! primitives (anything non-Unix) the caps degrade to a no-op, per
//! spec.md §4.4's "degrade to best-effort" wording.

use crate::executor::config::SecurityConfig;

/// Sets `RLIMIT_AS` (virtual memory), `RLIMIT_CPU`, `RLIMIT_NOFILE`,
/// `RLIMIT_NPROC`, and `RLIMIT_FSIZE` in the current process — intended
/// to be called from within a `pre_exec` hook installed on the child
/// `Command`, i.e. after `fork()` and before `exec()`.
///
/// # Safety
///
/// Must only be called between `fork` and `exec` (i.e. from a
/// `pre_exec` closure). It calls only async-signal-safe `setrlimit`
/// syscalls and never allocates or touches Rust-level shared state.
#[cfg(unix)]
pub unsafe fn apply_resource_limits(config: &SecurityConfig) -> std::io::Result<()> {
    use rlimit::{Resource, setrlimit};

    let memory_bytes = config.memory_limit_mb.saturating_mul(1024 * 1024);
    let _ = setrlimit(Resource::AS, memory_bytes, memory_bytes);
    let _ = setrlimit(Resource::CPU, config.cpu_time_limit, config.cpu_time_limit);
    let _ = setrlimit(
        Resource::NOFILE,
        config.file_descriptor_limit,
        config.file_descriptor_limit,
    );
    let _ = setrlimit(Resource::NPROC, config.max_processes, config.max_processes);
    let max_file_bytes = config.max_file_size_mb.saturating_mul(1024 * 1024);
    let _ = setrlimit(Resource::FSIZE, max_file_bytes, max_file_bytes);
    Ok(())
}

#[cfg(not(unix))]
pub unsafe fn apply_resource_limits(_config: &SecurityConfig) -> std::io::Result<()> {
    // No POSIX rlimit primitives on this platform; caps degrade to
    // best-effort per spec.md §4.4. The wall-clock timeout in
    // `SandboxRunner::execute` still bounds execution unconditionally.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applying_limits_in_this_process_does_not_error() {
        // Exercises the syscalls directly (not under fork/exec) purely to
        // confirm the resource constants resolve and the calls don't
        // panic; this process's own limits are usually already tighter
        // than a permissive default config so most calls are no-ops.
        let config = SecurityConfig {
            memory_limit_mb: 4096,
            cpu_time_limit: 300,
            file_descriptor_limit: 1024,
            max_file_size_mb: 1024,
            max_processes: 256,
            ..SecurityConfig::default()
        };
        let result = unsafe { apply_resource_limits(&config) };
        assert!(result.is_ok());
    }
}
