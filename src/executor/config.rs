//! `[security]` / `[security.network]` configuration, per spec.md §6.

use serde::{Deserialize, Serialize};

/// Network access policy for the sandboxed child process, per spec.md
/// §4.4. Ported from the `network` sub-block of the original system's
/// security config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkPolicy {
    /// All proxy env vars point at an unreachable loopback port.
    BlockAll,
    /// Proxy env vars are emptied and `NO_PROXY` is scoped to localhost.
    Restrict,
    /// Host network environment passes through unmodified.
    Off,
}

impl Default for NetworkPolicy {
    fn default() -> Self {
        NetworkPolicy::Restrict
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub block_network_access: bool,
    #[serde(default = "default_true")]
    pub restrict_network_access: bool,
    #[serde(default)]
    pub block_network_modules: bool,
    #[serde(default)]
    pub disable_network_validation: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            block_network_access: false,
            restrict_network_access: true,
            block_network_modules: false,
            disable_network_validation: false,
        }
    }
}

impl NetworkConfig {
    /// Resolves the flag combination down to a single [`NetworkPolicy`],
    /// mirroring `_get_restricted_env`'s `if/elif` precedence (block
    /// beats restrict; disabling validation beats both).
    pub fn policy(&self) -> NetworkPolicy {
        if self.disable_network_validation {
            NetworkPolicy::Off
        } else if self.block_network_access {
            NetworkPolicy::BlockAll
        } else if self.restrict_network_access {
            NetworkPolicy::Restrict
        } else {
            NetworkPolicy::Off
        }
    }
}

/// `[security]`: resource caps and network policy applied to every
/// sandboxed execution. Defaults match the original's
/// `SecureProcessRunner` fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "default_execution_timeout")]
    pub execution_timeout: u64,
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,
    #[serde(default = "default_cpu_time_limit")]
    pub cpu_time_limit: u64,
    #[serde(default = "default_fd_limit")]
    pub file_descriptor_limit: u64,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    #[serde(default = "default_max_processes")]
    pub max_processes: u64,
    #[serde(default)]
    pub network: NetworkConfig,
}

fn default_execution_timeout() -> u64 {
    30
}
fn default_memory_limit_mb() -> u64 {
    512
}
fn default_cpu_time_limit() -> u64 {
    30
}
fn default_fd_limit() -> u64 {
    64
}
fn default_max_file_size_mb() -> u64 {
    10
}
fn default_max_processes() -> u64 {
    10
}
fn default_true() -> bool {
    true
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            execution_timeout: default_execution_timeout(),
            memory_limit_mb: default_memory_limit_mb(),
            cpu_time_limit: default_cpu_time_limit(),
            file_descriptor_limit: default_fd_limit(),
            max_file_size_mb: default_max_file_size_mb(),
            max_processes: default_max_processes(),
            network: NetworkConfig::default(),
        }
    }
}
