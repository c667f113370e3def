//! Configuration loading and precedence tests

use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use verdict_config::{ConfigError, ConfigLoader, GlobalConfig, ProjectConfig};

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let config_path = dir.join("verdict.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

fn create_global_file(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("global.toml");
    fs::write(&path, content).unwrap();
    path
}

/// Loader reading global defaults from inside `dir`
fn loader_in(dir: &Path) -> ConfigLoader {
    ConfigLoader::new().with_global_config_path(dir.join("global.toml"))
}

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
#[serial]
fn test_load_with_empty_config() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "");

    let config = loader_in(temp_dir.path())
        .load_from_directory(temp_dir.path())
        .unwrap();

    // Empty config is valid (all sections optional)
    assert!(config.is_project());
    assert_eq!(config.format(), "text");
    assert!(!config.fail_fast());
    assert!(config.color());
}

#[test]
#[serial]
fn test_load_from_nested_subdirectory() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[run]\nshuffle_seed = 9\n");

    let nested = temp_dir.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let config = loader_in(temp_dir.path())
        .load_from_directory(&nested)
        .unwrap();

    assert_eq!(config.shuffle_seed(), Some(9));
    assert_eq!(config.project_root(), Some(temp_dir.path()));
}

#[test]
#[serial]
fn test_invalid_project_config_is_error() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[run\nbroken");

    let result = loader_in(temp_dir.path()).load_from_directory(temp_dir.path());
    assert!(matches!(result, Err(ConfigError::TomlParseError { .. })));
}

#[test]
#[serial]
fn test_invalid_global_config_is_error() {
    let temp_dir = TempDir::new().unwrap();
    create_global_file(temp_dir.path(), "[defaults]\nparallelism = 0\n");

    let result = loader_in(temp_dir.path()).load_from_directory(temp_dir.path());
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

// ============================================================================
// Precedence Tests
// ============================================================================

#[test]
#[serial]
fn test_global_defaults_apply_without_project_values() {
    let temp_dir = TempDir::new().unwrap();
    create_global_file(
        temp_dir.path(),
        "[defaults]\nformat = \"json\"\nparallelism = 3\ncolor = false\n",
    );
    create_config_file(temp_dir.path(), "[run]\nfail_fast = true\n");

    let config = loader_in(temp_dir.path())
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert_eq!(config.format(), "json");
    assert_eq!(config.parallelism(), 3);
    assert!(!config.color());
}

#[test]
#[serial]
fn test_project_overrides_global() {
    let temp_dir = TempDir::new().unwrap();
    create_global_file(temp_dir.path(), "[defaults]\nformat = \"json\"\nparallelism = 3\n");
    create_config_file(temp_dir.path(), "[run]\nformat = \"text\"\nparallelism = 5\n");

    let config = loader_in(temp_dir.path())
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert_eq!(config.format(), "text");
    assert_eq!(config.parallelism(), 5);
}

#[rstest]
#[case::parallelism("TEST_PARALLELISM", "7")]
#[case::format("VERDICT_FORMAT", "JSON")]
#[case::timeout("VERDICT_TIMEOUT", "0.25")]
#[serial]
fn test_env_overrides_project(#[case] var: &str, #[case] value: &str) {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        "[run]\nformat = \"text\"\nparallelism = 2\ntimeout_secs = 10\n",
    );

    env::set_var(var, value);
    let config = loader_in(temp_dir.path()).load_from_directory(temp_dir.path());
    env::remove_var(var);
    let config = config.unwrap();

    match var {
        "TEST_PARALLELISM" => assert_eq!(config.parallelism(), 7),
        "VERDICT_FORMAT" => assert_eq!(config.format(), "json"),
        _ => assert_eq!(config.timeout(), Some(Duration::from_millis(250))),
    }
}

#[rstest]
#[case("TEST_PARALLELISM", "0")]
#[case("TEST_PARALLELISM", "many")]
#[case("VERDICT_FORMAT", "yaml")]
#[case("VERDICT_TIMEOUT", "-3")]
#[case("VERDICT_TIMEOUT", "1e300")]
#[serial]
fn test_invalid_env_values(#[case] var: &str, #[case] value: &str) {
    let temp_dir = TempDir::new().unwrap();

    env::set_var(var, value);
    let result = loader_in(temp_dir.path()).load_from_directory(temp_dir.path());
    env::remove_var(var);

    assert!(result.is_err(), "{}={} should be rejected", var, value);
}

#[test]
#[serial]
fn test_blank_env_value_ignored() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[run]\nparallelism = 2\n");

    env::set_var("TEST_PARALLELISM", "  ");
    let config = loader_in(temp_dir.path()).load_from_directory(temp_dir.path());
    env::remove_var("TEST_PARALLELISM");

    assert_eq!(config.unwrap().parallelism(), 2);
}

// ============================================================================
// Serialization
// ============================================================================

#[test]
fn test_project_config_round_trips_through_toml() {
    let mut config = ProjectConfig::default();
    config.run_mut().fail_fast = Some(true);
    config.run_mut().format = Some("json".to_string());

    let text = toml::to_string(&config).unwrap();
    assert!(text.contains("[run]"));
    assert!(!text.contains("discovery"));

    let parsed = ProjectConfig::parse(&text, Path::new("verdict.toml")).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_global_config_default_is_empty() {
    let config = GlobalConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.default_format(), None);
}
