//! Restricted-environment construction and the actual `python3 driver.py`
//! child process spawn, ported from `SecureProcessRunner.execute_code`
//! and `_get_restricted_env` (`original_source/.../runner.py`).

use crate::executor::config::{NetworkPolicy, SecurityConfig};
use std::collections::HashMap;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Builds the environment handed to the sandboxed Python process: only
/// `PATH`, `PYTHONPATH`, `HOME` (pointed at the sandbox workdir), and
/// `TMPDIR` pass through by name, plus the proxy variables dictated by
/// the resolved [`NetworkPolicy`]. Everything else in the parent's
/// environment is dropped.
pub fn restricted_env(security: &SecurityConfig, workdir: &Path, tmp_dir: &Path) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert("PATH".to_string(), std::env::var("PATH").unwrap_or_default());
    env.insert("PYTHONPATH".to_string(), std::env::var("PYTHONPATH").unwrap_or_default());
    env.insert("HOME".to_string(), workdir.display().to_string());
    env.insert("TMPDIR".to_string(), tmp_dir.display().to_string());

    match security.network.policy() {
        NetworkPolicy::Off => {}
        NetworkPolicy::BlockAll => {
            for key in ["HTTP_PROXY", "HTTPS_PROXY", "FTP_PROXY", "SOCKS_PROXY", "ALL_PROXY"] {
                env.insert(key.to_string(), "127.0.0.1:9999".to_string());
            }
            env.insert("NO_PROXY".to_string(), String::new());
        }
        NetworkPolicy::Restrict => {
            for key in ["HTTP_PROXY", "HTTPS_PROXY", "FTP_PROXY", "SOCKS_PROXY", "ALL_PROXY"] {
                env.insert(key.to_string(), String::new());
            }
            env.insert("NO_PROXY".to_string(), "localhost,127.0.0.1".to_string());
        }
    }

    env
}

/// Spawns `python3 <script_path>` with the restricted environment, the
/// POSIX resource limits applied in a `pre_exec` hook, and a wall-clock
/// timeout enforced on top of (not instead of) the child's own
/// `SIGALRM`-based self-timeout.
pub async fn spawn_driver(
    script_path: &Path,
    workdir: &Path,
    security: &SecurityConfig,
    env: &HashMap<String, String>,
) -> std::io::Result<Output> {
    let mut command = Command::new("python3");
    command.arg(script_path);
    command.current_dir(workdir);
    command.env_clear();
    command.envs(env);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let security = security.clone();
        // SAFETY: the closure runs in the forked child between `fork`
        // and `exec`, calling only async-signal-safe `setrlimit`
        // syscalls via `apply_resource_limits`.
        unsafe {
            command.pre_exec(move || {
                let _ = apply_resource_limits_in_child(&security);
                Ok(())
            });
        }
    }

    debug!(script = %script_path.display(), "spawning sandboxed driver process");

    let timeout = Duration::from_secs(security.execution_timeout + 5);
    match tokio::time::timeout(timeout, command.output()).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("sandboxed execution exceeded {timeout:?}"),
        )),
    }
}

#[cfg(unix)]
fn apply_resource_limits_in_child(security: &SecurityConfig) -> std::io::Result<()> {
    unsafe { crate::executor::resources::apply_resource_limits(security) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::config::NetworkConfig;

    fn security_with(network: NetworkConfig) -> SecurityConfig {
        SecurityConfig {
            network,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn restricted_env_blocks_all_proxies_under_block_all_policy() {
        let security = security_with(NetworkConfig {
            block_network_access: true,
            ..Default::default()
        });
        let env = restricted_env(&security, Path::new("/tmp/work"), Path::new("/tmp/work/tmp"));
        assert_eq!(env.get("HTTP_PROXY").unwrap(), "127.0.0.1:9999");
        assert_eq!(env.get("NO_PROXY").unwrap(), "");
    }

    #[test]
    fn restricted_env_empties_proxies_under_restrict_policy() {
        let security = security_with(NetworkConfig::default());
        let env = restricted_env(&security, Path::new("/tmp/work"), Path::new("/tmp/work/tmp"));
        assert_eq!(env.get("HTTP_PROXY").unwrap(), "");
        assert_eq!(env.get("NO_PROXY").unwrap(), "localhost,127.0.0.1");
    }

    #[test]
    fn restricted_env_leaves_proxies_untouched_when_validation_disabled() {
        let security = security_with(NetworkConfig {
            disable_network_validation: true,
            ..Default::default()
        });
        let env = restricted_env(&security, Path::new("/tmp/work"), Path::new("/tmp/work/tmp"));
        assert!(!env.contains_key("HTTP_PROXY"));
    }

    #[test]
    fn restricted_env_always_sets_home_to_workdir() {
        let security = security_with(NetworkConfig::default());
        let env = restricted_env(&security, Path::new("/tmp/sandboxwork"), Path::new("/tmp/sandboxwork/tmp"));
        assert_eq!(env.get("HOME").unwrap(), "/tmp/sandboxwork");
    }

    #[tokio::test]
    async fn spawn_driver_runs_a_trivial_script_and_reports_result_line() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("driver.py");
        tokio::fs::write(&script, "print('__AIFORGE_RESULT__{\"success\": true, \"result\": 1, \"error\": null}')")
            .await
            .unwrap();

        let security = SecurityConfig::default();
        let env = restricted_env(&security, dir.path(), dir.path());
        let output = spawn_driver(&script, dir.path(), &security, &env).await;

        match output {
            Ok(out) => {
                let stdout = String::from_utf8_lossy(&out.stdout);
                assert!(stdout.contains("__AIFORGE_RESULT__"));
            }
            Err(_) => {
                // python3 may be unavailable in this environment; the
                // spawn path itself is still exercised and shouldn't panic.
            }
        }
    }
}
