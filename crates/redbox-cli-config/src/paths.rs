// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! XDG Base Directory compliant path resolution.

use std::path::{Path, PathBuf};

use crate::ConfigError;

/// Workspace config file, relative to the working directory.
pub const WORKSPACE_CONFIG_FILE: &str = ".redbox/config.toml";

/// Resolved XDG paths for redbox.
#[derive(Debug, Clone)]
pub struct PathsConfig {
	/// User config file: ~/.config/redbox/config.toml
	pub user_config_file: PathBuf,
	/// Cache directory: ~/.cache/redbox/
	pub cache_dir: PathBuf,
}

impl PathsConfig {
	/// Get the config directory (parent of user_config_file)
	pub fn config_dir(&self) -> PathBuf {
		self
			.user_config_file
			.parent()
			.map(Path::to_path_buf)
			.unwrap_or_else(|| self.user_config_file.clone())
	}
}

impl Default for PathsConfig {
	fn default() -> Self {
		Self {
			user_config_file: PathBuf::from("~/.config/redbox/config.toml"),
			cache_dir: PathBuf::from("~/.cache/redbox"),
		}
	}
}

/// Resolve XDG paths, honouring XDG_CONFIG_HOME and XDG_CACHE_HOME.
pub fn resolve_xdg_paths() -> Result<PathsConfig, ConfigError> {
	let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;

	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(".config"));

	let cache_home = std::env::var_os("XDG_CACHE_HOME")
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(".cache"));

	tracing::debug!(
		config_home = %config_home.display(),
		cache_home = %cache_home.display(),
		"resolved XDG paths"
	);

	Ok(paths_under(&config_home, &cache_home))
}

fn paths_under(config_home: &Path, cache_home: &Path) -> PathsConfig {
	PathsConfig {
		user_config_file: config_home.join("redbox/config.toml"),
		cache_dir: cache_home.join("redbox"),
	}
}

/// Get the workspace config file path from current directory.
pub fn workspace_config_path() -> Result<PathBuf, ConfigError> {
	let cwd = std::env::current_dir()?;
	Ok(cwd.join(WORKSPACE_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_paths_under_xdg_homes() {
		let paths = paths_under(Path::new("/xdg/config"), Path::new("/xdg/cache"));
		assert_eq!(
			paths.user_config_file,
			PathBuf::from("/xdg/config/redbox/config.toml")
		);
		assert_eq!(paths.cache_dir, PathBuf::from("/xdg/cache/redbox"));
	}

	/// Test config_dir() returns parent of config file.
	#[test]
	fn test_config_dir_returns_parent() {
		let paths = paths_under(Path::new("/xdg/config"), Path::new("/xdg/cache"));
		assert_eq!(paths.config_dir(), PathBuf::from("/xdg/config/redbox"));
	}

	/// Test workspace config path is relative to cwd.
	#[test]
	fn test_workspace_config_path() {
		let path = workspace_config_path().unwrap();
		assert!(path.ends_with(".redbox/config.toml"));
	}
}
