use flowbuilder::core::config::ConfigLoader;
use flowbuilder::core::types::{ErrorCategory, IdStrategy};
use insta::assert_debug_snapshot;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

fn clear_flowbuilder_env() {
    for v in &["FLOWBUILDER_DEFAULT_TASK_WAIT_DAYS", "FLOWBUILDER_ID_STRATEGY"] {
        env::remove_var(v);
    }
}

#[test]
#[serial]
fn test_config_loading_integration() {
    clear_flowbuilder_env();
    let temp_dir = TempDir::new().unwrap();
    let config_content = r#"
[compiler]
default_task_wait_days = 3
statuses_file = "statuses.json"

[ids]
strategy = "sequential"

[session]
copy_suffix = " copy"
"#;
    fs::write(temp_dir.path().join("flowbuilder.toml"), config_content).unwrap();

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    assert_debug_snapshot!(config, @r###"
    FlowbuilderConfig {
        compiler: CompilerConfig {
            default_task_wait_days: 3,
            statuses_file: Some(
                "statuses.json",
            ),
        },
        ids: IdsConfig {
            strategy: Sequential,
        },
        session: SessionConfig {
            copy_suffix: " copy",
        },
    }
    "###);
    assert_eq!(config.compile_options().default_task_wait_days, 3);
}

#[test]
#[serial]
fn test_env_overrides_file_values() {
    clear_flowbuilder_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("flowbuilder.toml"),
        "[compiler]\ndefault_task_wait_days = 3\n",
    )
    .unwrap();

    env::set_var("FLOWBUILDER_DEFAULT_TASK_WAIT_DAYS", "10");
    env::set_var("FLOWBUILDER_ID_STRATEGY", "Sequential");
    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    clear_flowbuilder_env();

    assert_eq!(config.compiler.default_task_wait_days, 10);
    assert_eq!(config.ids.strategy, IdStrategy::Sequential);
}

#[test]
#[serial]
fn test_unparseable_env_values_are_ignored() {
    clear_flowbuilder_env();
    let temp_dir = TempDir::new().unwrap();

    env::set_var("FLOWBUILDER_DEFAULT_TASK_WAIT_DAYS", "soon");
    env::set_var("FLOWBUILDER_ID_STRATEGY", "uuid");
    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    clear_flowbuilder_env();

    assert_eq!(config.compiler.default_task_wait_days, 7);
    assert_eq!(config.ids.strategy, IdStrategy::Random);
}

#[test]
#[serial]
fn test_invalid_files_are_config_errors() {
    clear_flowbuilder_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("flowbuilder.toml"),
        "[compiler\ndefault_task_wait_days = ",
    )
    .unwrap();
    let err = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ConfigError);

    fs::write(
        temp_dir.path().join("flowbuilder.toml"),
        "[compiler]\ndefault_task_wait_days = 0\n",
    )
    .unwrap();
    let err = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ConfigError);
}
