//! Environment constants and path utilities.
//!
//! Centralizes the on-disk layout described in the configuration section:
//! a workdir-rooted cache of generated modules, an index, and the
//! dynamic task-type registry.

use std::path::{Path, PathBuf};

/// Directory name for the code cache within the workdir.
pub const CACHE_DIR_NAME: &str = "cache";

/// Subdirectory holding raw generated source modules.
pub const MODULES_DIR_NAME: &str = "modules";

/// File name of the module metadata index.
pub const CACHE_INDEX_FILE_NAME: &str = "index.json";

/// File name of the dynamic task-type registry.
pub const TASK_TYPES_FILE_NAME: &str = "task_types.json";

/// Subdirectory used for sandbox scratch files (temp driver scripts, HOME, TMPDIR).
pub const SANDBOX_DIR_NAME: &str = "sandbox";

/// User config directory name (e.g. `~/.codeforge`).
pub const USER_CONFIG_DIR_NAME: &str = ".codeforge";

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Build the cache root directory path from a workdir.
pub fn cache_dir_path(workdir: &Path) -> PathBuf {
    workdir.join(CACHE_DIR_NAME)
}

/// Build the modules directory path from a workdir.
pub fn modules_dir_path(workdir: &Path) -> PathBuf {
    cache_dir_path(workdir).join(MODULES_DIR_NAME)
}

/// Build the cache index file path from a workdir.
pub fn cache_index_file_path(workdir: &Path) -> PathBuf {
    cache_dir_path(workdir).join(CACHE_INDEX_FILE_NAME)
}

/// Build the dynamic task-type registry file path from a workdir.
pub fn task_types_file_path(workdir: &Path) -> PathBuf {
    cache_dir_path(workdir).join(TASK_TYPES_FILE_NAME)
}

/// Build the module source file path for a given module id.
pub fn module_file_path(workdir: &Path, module_id: &str) -> PathBuf {
    modules_dir_path(workdir).join(format!("{module_id}.py"))
}

/// Build the sandbox scratch directory path from a workdir.
pub fn sandbox_dir_path(workdir: &Path) -> PathBuf {
    workdir.join(SANDBOX_DIR_NAME)
}

/// Build the user configuration directory path from a home directory.
pub fn user_config_dir_path(home_dir: &Path) -> PathBuf {
    home_dir.join(USER_CONFIG_DIR_NAME)
}

/// Build the user configuration file path from a home directory.
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    user_config_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build the local (current-directory) configuration file path.
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join("codeforge.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_construction() {
        let workdir = Path::new("/tmp/codeforge-work");

        assert_eq!(
            cache_dir_path(workdir),
            Path::new("/tmp/codeforge-work/cache")
        );
        assert_eq!(
            modules_dir_path(workdir),
            Path::new("/tmp/codeforge-work/cache/modules")
        );
        assert_eq!(
            cache_index_file_path(workdir),
            Path::new("/tmp/codeforge-work/cache/index.json")
        );
        assert_eq!(
            task_types_file_path(workdir),
            Path::new("/tmp/codeforge-work/cache/task_types.json")
        );
        assert_eq!(
            module_file_path(workdir, "data_fetch_12345"),
            Path::new("/tmp/codeforge-work/cache/modules/data_fetch_12345.py")
        );
    }

    #[test]
    fn test_config_paths() {
        let home_dir = Path::new("/home/user");
        let current_dir = Path::new("/current/project");

        assert_eq!(
            user_config_file_path(home_dir),
            Path::new("/home/user/.codeforge/config.toml")
        );
        assert_eq!(
            local_config_file_path(current_dir),
            Path::new("/current/project/codeforge.toml")
        );
    }
}
