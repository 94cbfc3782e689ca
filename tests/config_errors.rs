// tests/config_errors.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder, WatchConfigBuilder};

use std::path::Path;
use std::sync::Arc;

use assetflow::config::{load_and_validate, ConfigFile};
use assetflow::errors::AssetflowError;
use assetflow::fs::RealFileSystem;
use assetflow::tasks::{build_registry, BuildContext};
use assetflow::types::BuildMode;

fn validate(builder: ConfigFileBuilder) -> Result<ConfigFile, AssetflowError> {
    ConfigFile::try_from(builder.raw())
}

fn assert_startup_error(builder: ConfigFileBuilder, needle: &str) {
    match validate(builder) {
        Err(AssetflowError::StartupConfig(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} does not mention {needle:?}")
        }
        other => panic!("expected StartupConfig error, got {other:?}"),
    }
}

#[test]
fn empty_task_file_is_rejected() {
    assert_startup_error(ConfigFileBuilder::new(), "at least one");
}

#[test]
fn cycle_through_after_is_rejected() {
    let builder = ConfigFileBuilder::new()
        .with_task("a", TaskConfigBuilder::group().after("b").build())
        .with_task("b", TaskConfigBuilder::group().after("a").build());
    let err = validate(builder).unwrap_err();
    assert!(matches!(err, AssetflowError::Cycle(_)));
    assert!(err.is_startup_error());
}

#[test]
fn cycle_through_sequence_is_rejected() {
    let builder = ConfigFileBuilder::new()
        .with_task("build", TaskConfigBuilder::sequence(&["del"]).build())
        .with_task("del", TaskConfigBuilder::clean(&["dist/*"]).after("build").build());
    assert!(matches!(validate(builder), Err(AssetflowError::Cycle(_))));
}

#[test]
fn self_dependency_is_rejected() {
    let builder =
        ConfigFileBuilder::new().with_task("sass", TaskConfigBuilder::group().after("sass").build());
    assert_startup_error(builder, "itself");
}

#[test]
fn invalid_task_name_is_rejected() {
    let builder = ConfigFileBuilder::new().with_task("bad name", TaskConfigBuilder::group().build());
    assert_startup_error(builder, "invalid task name");
}

#[test]
fn invalid_glob_is_rejected() {
    let builder =
        ConfigFileBuilder::new().with_task("sass", TaskConfigBuilder::pipeline(&["styles/[*.scss"]).build());
    assert_startup_error(builder, "invalid glob");
}

#[test]
fn watch_task_needs_defined_bindings() {
    let builder = ConfigFileBuilder::new()
        .with_task("watch", TaskConfigBuilder::watch(&["styles"]).build());
    assert_startup_error(builder, "unknown binding 'styles'");
}

#[test]
fn bindings_need_defined_tasks() {
    let builder = ConfigFileBuilder::new()
        .with_task("pug", TaskConfigBuilder::command("pug").build())
        .with_binding("styles", WatchConfigBuilder::new("**/*.scss").task("sass").build());
    assert_startup_error(builder, "unknown task 'sass'");
}

#[test]
fn unknown_prerequisite_is_only_a_resolution_error() {
    let cfg = ConfigFileBuilder::new()
        .with_task("watch-server", TaskConfigBuilder::group().after("serve").build())
        .with_task("pug", TaskConfigBuilder::command("pug").build())
        .build();
    let ctx = BuildContext::new(BuildMode::Development, std::env::temp_dir(), Arc::new(RealFileSystem));
    let registry = build_registry(&cfg, &ctx).unwrap();

    assert!(registry.plan("pug").is_ok());
    let err = registry.plan("watch-server").unwrap_err();
    assert!(matches!(err, AssetflowError::UnknownPrerequisite { .. }));
    assert!(err.is_startup_error());
}

#[test]
fn missing_task_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_and_validate(dir.path().join("Assetflow.toml")).unwrap_err();
    assert!(matches!(err, AssetflowError::Io(_)));
}

#[test]
fn malformed_toml_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Assetflow.toml");
    std::fs::write(&path, "[task.pug\nkind = ").unwrap();
    assert!(matches!(load_and_validate(&path), Err(AssetflowError::Toml(_))));
}

#[test]
fn demo_task_file_is_valid_and_resolves() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/Assetflow.toml");
    let cfg = load_and_validate(&path).unwrap();

    for name in [
        "pug",
        "copy",
        "sass",
        "compilation",
        "elm-init",
        "elm-compile",
        "elm-compile-production",
        "serve",
        "watch-server",
        "watch",
        "del",
        "build",
        "default",
        "serverless",
        "compile",
    ] {
        assert!(cfg.tasks().contains_key(name), "demo is missing task {name}");
    }

    let ctx = BuildContext::new(
        BuildMode::Production,
        path.parent().unwrap().to_path_buf(),
        Arc::new(RealFileSystem),
    );
    let registry = build_registry(&cfg, &ctx).unwrap();

    let plan = registry.plan("default").unwrap();
    let pos = |t: &str| plan.order.iter().position(|n| n == t).unwrap();
    assert!(pos("elm-init") < pos("elm-compile"));
    assert!(pos("serve") < pos("watch-server"));
    assert_eq!(plan.order.last().map(String::as_str), Some("default"));
}
