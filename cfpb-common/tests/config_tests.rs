//! Unit tests for configuration and graceful degradation
//!
//! Covers:
//! - Missing TOML files do not cause termination (defaults are used)
//! - Priority order for config file and root folder resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate CFPB_ROOT_FOLDER or CFPB_CONFIG are marked with #[serial].

use cfpb_common::config::{
    default_root_folder, ensure_root_folder, load_toml_config, locate_config_file,
    LoggingConfig, RootFolderResolver, CONFIG_ENV_VAR, ROOT_FOLDER_ENV_VAR,
};
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(Debug, Default, Deserialize)]
struct BootstrapConfig {
    #[serde(default)]
    root_folder: Option<PathBuf>,
    #[serde(default)]
    logging: LoggingConfig,
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV_VAR);

    let root_folder = RootFolderResolver::new().resolve();

    assert_eq!(root_folder, default_root_folder());
}

#[test]
#[serial]
fn test_resolver_env_var_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV_VAR, "/tmp/cfpb-test-env-folder");

    let root_folder = RootFolderResolver::new()
        .with_toml_value(Some(PathBuf::from("/tmp/cfpb-test-toml-folder")))
        .resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/cfpb-test-env-folder"));

    // Cleanup
    env::remove_var(ROOT_FOLDER_ENV_VAR);
}

#[test]
#[serial]
fn test_resolver_toml_value_used_without_env() {
    env::remove_var(ROOT_FOLDER_ENV_VAR);

    let root_folder = RootFolderResolver::new()
        .with_toml_value(Some(PathBuf::from("/tmp/cfpb-test-toml-folder")))
        .resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/cfpb-test-toml-folder"));
}

#[test]
#[serial]
fn test_locate_config_from_env() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "root_folder = \"/tmp/from-file\"\n").unwrap();
    env::set_var(CONFIG_ENV_VAR, &path);

    let located = locate_config_file(None);
    assert_eq!(located, Some(path.clone()));

    let config: BootstrapConfig = load_toml_config(located.as_deref()).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/tmp/from-file")));
    assert_eq!(config.logging.level, "info");

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_locate_config_cli_arg_beats_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/env.toml");

    let cli = PathBuf::from("/tmp/cli.toml");
    assert_eq!(locate_config_file(Some(&cli)), Some(cli.clone()));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_logging_section_parsed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cfpb.toml");
    std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

    let config: BootstrapConfig = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert!(config.root_folder.is_none());
}

#[test]
fn test_malformed_toml_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cfpb.toml");
    std::fs::write(&path, "this is = = not toml").unwrap();

    let result: cfpb_common::Result<BootstrapConfig> = load_toml_config(Some(&path));
    assert!(matches!(result, Err(cfpb_common::Error::Config(_))));
}

#[test]
fn test_ensure_root_folder_creates_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("nested").join("root");

    ensure_root_folder(&root).unwrap();
    assert!(root.is_dir());

    // Idempotent
    ensure_root_folder(&root).unwrap();
}
