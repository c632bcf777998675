// tests/config_validation.rs

mod common;
use crate::common::init_tracing;

use command_runner::config::{load_and_validate, load_from_path, ConfigFile, RawConfigFile};
use command_runner::errors::RunnerError;
use command_runner::plugins::{PluginRegistry, WaitStrategy};
use command_runner::Runner;
use command_runner_test_utils::{CommandBuilder, ConfigBuilder};
use serde_json::json;

fn validate(value: serde_json::Value) -> Result<ConfigFile, RunnerError> {
    load_and_validate(value, &PluginRegistry::with_builtins())
}

#[test]
fn string_cmd_is_coerced_to_argv_and_defaults_apply() {
    init_tracing();

    let cfg = validate(json!({ "a": { "cmd": "echo" } })).unwrap();
    let a = cfg.get("a").unwrap();
    assert_eq!(a.argv, vec!["echo".to_string()]);
    assert!(!a.exit_on_success);
    assert!(a.abort_on_error);
    assert!(a.depends_on.is_empty());
    assert!(a.wait.is_none() && a.log.is_none());
}

#[test]
fn missing_and_empty_cmd_are_rejected() {
    let err = validate(json!({ "a": { "cwd": "/tmp" } })).unwrap_err();
    assert!(err.to_string().contains("missing \"cmd\""), "got: {err}");

    for cmd in [json!(""), json!([]), json!([""])] {
        let err = validate(json!({ "a": { "cmd": cmd } })).unwrap_err();
        assert!(err.to_string().contains("is empty"), "got: {err}");
    }
}

#[test]
fn unknown_dependency_is_rejected_before_anything_runs() {
    let cfg = ConfigBuilder::new()
        .with_command("a", CommandBuilder::new("true"))
        .with_command("b", CommandBuilder::new("true").depends("ghost"));

    let err = cfg.try_build().unwrap_err();
    assert!(
        matches!(err, RunnerError::UnknownDependency { ref command, ref dependency }
            if command == "b" && dependency == "ghost"),
        "got: {err}"
    );
}

#[test]
fn self_dependency_is_rejected() {
    let err = validate(json!({ "a": { "cmd": "true", "depends": ["a"] } })).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn cycle_names_its_members() {
    let err = validate(json!({
        "a": { "cmd": "true", "depends": ["c"] },
        "b": { "cmd": "true", "depends": ["a"] },
        "c": { "cmd": "true", "depends": ["b"] },
        "d": { "cmd": "true" }
    }))
    .unwrap_err();

    let RunnerError::DagCycle(message) = &err else {
        panic!("expected a cycle error, got: {err}");
    };
    for name in ["\"a\"", "\"b\"", "\"c\""] {
        assert!(message.contains(name), "cycle message {message:?} misses {name}");
    }
    assert!(!message.contains("\"d\""));
}

#[test]
fn empty_configuration_is_rejected() {
    assert!(validate(json!({})).unwrap_err().is_config());
    assert!(validate(json!(["a"])).unwrap_err().is_config());
}

#[test]
fn timer_below_minimum_is_a_validation_error() {
    let err = validate(json!({
        "a": { "cmd": "true", "wait": { "type": "timer", "options": { "duration": 99 } } }
    }))
    .unwrap_err();
    assert!(matches!(err, RunnerError::Config { .. }), "got: {err}");

    let ok = validate(json!({
        "a": { "cmd": "true", "wait": { "type": "timer", "options": { "duration": 100 } } }
    }))
    .unwrap();
    assert!(matches!(ok.get("a").unwrap().wait, Some(WaitStrategy::Timer(_))));
}

#[test]
fn plugin_descriptors_are_checked() {
    let err = validate(json!({ "a": { "cmd": "true", "wait": { "type": "http" } } })).unwrap_err();
    assert!(matches!(err, RunnerError::UnknownPlugin { .. }), "got: {err}");

    let err = validate(json!({ "a": { "cmd": "true", "log": { "options": {} } } })).unwrap_err();
    assert!(err.to_string().contains("type is missing or empty"), "got: {err}");

    let err = validate(json!({ "a": { "cmd": "true", "wait": { "type": "socket" } } })).unwrap_err();
    assert!(err.is_config(), "socket without port must fail: {err}");

    let err = validate(json!({ "a": { "cmd": "true", "wait": { "type": "output", "options": {} } } }))
        .unwrap_err();
    assert!(err.to_string().contains("Match option"), "got: {err}");
}

#[test]
fn custom_plugins_can_be_registered() {
    let mut registry = PluginRegistry::with_builtins();
    registry.register_wait("instant", |_opts| {
        Ok(WaitStrategy::Timer(command_runner::plugins::wait::TimerWait {
            duration: std::time::Duration::from_millis(100),
        }))
    });

    let cfg = load_and_validate(
        json!({ "a": { "cmd": "true", "wait": { "type": "instant" } } }),
        &registry,
    )
    .unwrap();
    assert_eq!(cfg.get("a").unwrap().wait.as_ref().map(|w| w.kind()), Some("timer"));
}

#[test]
fn runner_refuses_to_run_an_invalid_configuration() {
    let mut runner = Runner::new();
    assert!(runner.load(json!({ "a": { "cmd": "true", "depends": ["b"] } })).is_err());
    assert!(runner.config().is_none());

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let err = rt.block_on(runner.run()).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn config_file_is_read_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("runner.json");
    std::fs::write(&path, r#"{ "a": { "cmd": ["echo", "hi"], "depends": [] } }"#).unwrap();

    let raw: RawConfigFile = load_from_path(&path).unwrap();
    let cfg = ConfigFile::try_from(raw).unwrap();
    assert_eq!(cfg.get("a").unwrap().argv, vec!["echo", "hi"]);

    let err = load_from_path(dir.path().join("missing.json")).unwrap_err();
    assert!(err.to_string().contains("missing.json"), "got: {err}");
}
