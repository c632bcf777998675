// src/config/validate.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{CommandSpec, ConfigFile, RawCommand, RawConfigFile};
use crate::errors::{Result, RunnerError};
use crate::plugins::PluginRegistry;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RunnerError;

    /// Validate against the built-in plugin registry.
    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(raw, &PluginRegistry::with_builtins())
    }
}

/// Turn a raw configuration into a validated [`ConfigFile`].
///
/// This checks, in order:
/// - there is at least one command
/// - every command has a non-empty `cmd`
/// - `wait` / `log` descriptors name a registered kind with valid options
/// - every `depends` entry refers to a declared command (and not itself)
/// - the dependency graph has no cycles
///
/// Nothing is spawned on failure.
pub fn validate_config(raw: RawConfigFile, registry: &PluginRegistry) -> Result<ConfigFile> {
    ensure_has_commands(&raw)?;
    validate_dependencies(&raw)?;
    validate_dag(&raw)?;

    let mut commands = BTreeMap::new();
    for (name, command) in raw.commands {
        let spec = build_command_spec(&name, command, registry)?;
        commands.insert(name, spec);
    }

    Ok(ConfigFile::new_unchecked(commands))
}

fn ensure_has_commands(cfg: &RawConfigFile) -> Result<()> {
    if cfg.commands.is_empty() {
        return Err(RunnerError::Config {
            command: "<root>".to_string(),
            field: "configuration".to_string(),
            message: "must declare at least one command".to_string(),
        });
    }
    Ok(())
}

fn build_command_spec(
    name: &str,
    raw: RawCommand,
    registry: &PluginRegistry,
) -> Result<CommandSpec> {
    let argv = match raw.cmd {
        Some(cmd) => cmd.into_argv(),
        None => return Err(RunnerError::config(name, "options", "is missing \"cmd\" property")),
    };
    if argv.first().is_none_or(|program| program.is_empty()) {
        return Err(RunnerError::config(name, "options \"cmd\"", "is empty"));
    }

    let wait = raw
        .wait
        .as_ref()
        .map(|desc| registry.resolve_wait(name, desc))
        .transpose()?;
    let log = raw
        .log
        .as_ref()
        .map(|desc| registry.resolve_log(name, desc))
        .transpose()?;

    // Duplicate entries would double-count readiness in the scheduler.
    let mut seen = BTreeSet::new();
    let depends_on = raw
        .depends
        .unwrap_or_default()
        .into_iter()
        .filter(|dep| seen.insert(dep.clone()))
        .collect();

    Ok(CommandSpec {
        name: name.to_string(),
        argv,
        working_directory: raw.cwd,
        depends_on,
        exit_on_success: raw.exit_on_success,
        abort_on_error: raw.abort_on_error,
        wait,
        log,
    })
}

fn validate_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, command) in cfg.commands.iter() {
        for dep in command.depends.iter().flatten() {
            if dep == name {
                return Err(RunnerError::config(
                    name,
                    "options \"depends\"",
                    "cannot reference the command itself",
                ));
            }
            if !cfg.commands.contains_key(dep) {
                return Err(RunnerError::UnknownDependency {
                    command: name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.commands.keys() {
        graph.add_node(name.as_str());
    }

    for (name, command) in cfg.commands.iter() {
        for dep in command.depends.iter().flatten() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            let members = tarjan_scc(&graph)
                .into_iter()
                .find(|scc| scc.len() > 1 && scc.contains(&node))
                .unwrap_or_else(|| vec![node]);

            let mut names: Vec<String> = members.iter().map(|n| format!("\"{n}\"")).collect();
            names.sort();

            Err(RunnerError::DagCycle(format!(
                "cycle detected between commands {}",
                names.join(", ")
            )))
        }
    }
}
