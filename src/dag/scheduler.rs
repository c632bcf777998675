use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::task_info::{CommandInfo, CommandState, ScheduledCommand};
use crate::engine::{CommandName, ExitOutcome, Failure};

/// Scheduler holds the immutable DAG plus mutable per-command state.
///
/// It is responsible for:
/// - counting down each command's unresolved dependencies
/// - queueing commands whose count reached zero and dispatching them together
/// - tracking spawn / readiness / exit per command
/// - stopping all further dispatch after the first failure, and reporting
///   which in-flight commands must be cancelled
///
/// Every command is dispatched at most once.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    commands: BTreeMap<CommandName, CommandInfo>,
    ready: VecDeque<CommandName>,
    started: bool,
    first_failure: Option<Failure>,
}

impl Scheduler {
    /// Construct a scheduler from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let graph = DagGraph::from_config(cfg);
        let commands = cfg
            .commands
            .iter()
            .map(|(name, spec)| (name.clone(), CommandInfo::from_spec(spec)))
            .collect();

        Self {
            graph,
            commands,
            ready: VecDeque::new(),
            started: false,
            first_failure: None,
        }
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn state_of(&self, command: &str) -> Option<CommandState> {
        self.commands.get(command).map(|info| info.state)
    }

    pub fn info(&self, command: &str) -> Option<&CommandInfo> {
        self.commands.get(command)
    }

    pub fn first_failure(&self) -> Option<&Failure> {
        self.first_failure.as_ref()
    }

    pub fn is_aborted(&self) -> bool {
        self.first_failure.is_some()
    }

    /// Whether every command's task has resolved successfully.
    pub fn is_complete(&self) -> bool {
        self.commands.values().all(|info| info.resolved)
    }

    /// Commands handed to the executor that are not terminal yet.
    pub fn in_flight(&self) -> Vec<CommandName> {
        self.commands
            .values()
            .filter(|info| info.state.is_in_flight())
            .map(|info| info.spec.name.clone())
            .collect()
    }

    /// Seed the ready queue with every root (production API).
    pub fn start(&mut self) -> Vec<ScheduledCommand> {
        self.step_start().newly_scheduled
    }

    /// Record that a command's task resolved (production API).
    pub fn handle_ready(&mut self, command: &str) -> Vec<ScheduledCommand> {
        self.step_ready(command).newly_scheduled
    }

    /// Manual-step variant of `start`.
    pub fn step_start(&mut self) -> SchedulerStep {
        if self.started {
            warn!("scheduler already started; ignoring");
            return SchedulerStep::default();
        }
        self.started = true;

        for name in self.graph.roots() {
            self.ready.push_back(name.to_string());
        }
        debug!(roots = self.ready.len(), "scheduler: starting run");

        self.finish_step(SchedulerStep::default())
    }

    /// The command's process has been spawned.
    pub fn handle_spawned(&mut self, command: &str) {
        let Some(info) = self.commands.get_mut(command) else {
            warn!(command = %command, "spawn of unknown command; ignoring");
            return;
        };
        let next = if info.spec.wait.is_some() {
            CommandState::Waiting
        } else {
            CommandState::Running
        };
        info.advance(next);
    }

    /// Manual-step variant of `handle_ready`.
    ///
    /// Decrements the counter of every dependent and dispatches those that
    /// reach zero, unless the run has already failed.
    pub fn step_ready(&mut self, command: &str) -> SchedulerStep {
        let Some(info) = self.commands.get_mut(command) else {
            warn!(command = %command, "readiness of unknown command; ignoring");
            return SchedulerStep::default();
        };
        if info.resolved || info.state == CommandState::Failed {
            debug!(command = %command, "command already resolved; ignoring");
            return SchedulerStep::default();
        }
        info.resolved = true;
        info.advance(CommandState::Ready);
        debug!(command = %command, "command resolved");

        let dependents = self.graph.dependents_of(command).to_vec();
        for dependent in dependents {
            if let Some(dep_info) = self.commands.get_mut(&dependent) {
                dep_info.remaining = dep_info.remaining.saturating_sub(1);
                if dep_info.remaining == 0 && dep_info.state == CommandState::Pending {
                    self.ready.push_back(dependent);
                }
            }
        }

        self.finish_step(SchedulerStep::default())
    }

    /// Record that a command's task failed.
    ///
    /// The first failure is kept; nothing is dispatched afterwards, and every
    /// other in-flight command is reported as cancelled.
    pub fn handle_failure(&mut self, command: &str, reason: &str) -> SchedulerStep {
        let Some(info) = self.commands.get_mut(command) else {
            warn!(command = %command, "failure of unknown command; ignoring");
            return SchedulerStep::default();
        };
        if info.resolved {
            debug!(command = %command, "failure after resolution; ignoring");
            return SchedulerStep::default();
        }
        info.advance(CommandState::Failed);

        let mut step = SchedulerStep::default();
        if self.first_failure.is_none() {
            warn!(command = %command, reason = %reason, "first failure; aborting run");
            self.first_failure = Some(Failure::of(command, reason));
            step.first_failure = true;
        }

        self.ready.clear();
        step.cancelled = self
            .in_flight()
            .into_iter()
            .filter(|name| name != command)
            .collect();
        if !step.cancelled.is_empty() {
            info!(cancelled = ?step.cancelled, "requesting cancellation of in-flight commands");
        }
        step
    }

    /// The command's process has exited.
    pub fn handle_exited(&mut self, command: &str, outcome: ExitOutcome) {
        let Some(info) = self.commands.get_mut(command) else {
            warn!(command = %command, "exit of unknown command; ignoring");
            return;
        };
        debug!(command = %command, exit_code = ?outcome.code(), "command exited");
        info.advance(CommandState::Exited);
    }

    /// Drain the ready queue into the step.
    fn finish_step(&mut self, mut step: SchedulerStep) -> SchedulerStep {
        if self.is_aborted() {
            self.ready.clear();
        }

        while let Some(name) = self.ready.pop_front() {
            if let Some(info) = self.commands.get_mut(&name) {
                if info.advance(CommandState::Spawning) {
                    step.newly_scheduled.push(ScheduledCommand::from_spec(&info.spec));
                }
            }
        }

        if !step.newly_scheduled.is_empty() {
            debug!(commands = ?step.scheduled_names(), "scheduler: dispatching");
        }
        step.all_complete = self.is_complete();
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::CommandSpec;
    use std::collections::BTreeMap;

    fn cfg(edges: &[(&str, &[&str])]) -> ConfigFile {
        let commands = edges
            .iter()
            .map(|(name, deps)| {
                (
                    name.to_string(),
                    CommandSpec {
                        name: name.to_string(),
                        argv: vec!["true".to_string()],
                        working_directory: None,
                        depends_on: deps.iter().map(|d| d.to_string()).collect(),
                        exit_on_success: false,
                        abort_on_error: true,
                        wait: None,
                        log: None,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();
        ConfigFile::new_unchecked(commands)
    }

    #[test]
    fn diamond_dispatches_join_only_after_both_branches() {
        let mut s = Scheduler::from_config(&cfg(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["b", "c"]),
        ]));

        assert_eq!(s.step_start().scheduled_names(), vec!["a"]);
        let mut siblings = s.step_ready("a").scheduled_names().into_iter().map(String::from).collect::<Vec<_>>();
        siblings.sort();
        assert_eq!(siblings, vec!["b", "c"]);
        assert!(s.step_ready("b").newly_scheduled.is_empty());

        let last = s.step_ready("c");
        assert_eq!(last.scheduled_names(), vec!["d"]);
        assert!(!last.all_complete);
        assert!(s.step_ready("d").all_complete);
    }

    #[test]
    fn duplicate_readiness_is_not_double_counted() {
        let mut s = Scheduler::from_config(&cfg(&[("a", &[]), ("b", &[]), ("c", &["a", "b"])]));
        s.start();
        assert!(s.handle_ready("a").is_empty());
        assert!(s.handle_ready("a").is_empty());
        assert_eq!(s.state_of("c"), Some(CommandState::Pending));
    }

    #[test]
    fn failure_stops_dispatch_and_cancels_in_flight() {
        let mut s = Scheduler::from_config(&cfg(&[("a", &[]), ("b", &[]), ("c", &["a"])]));
        s.start();
        s.handle_spawned("a");
        s.handle_spawned("b");

        let step = s.handle_failure("b", "boom");
        assert!(step.first_failure);
        assert_eq!(step.cancelled, vec!["a".to_string()]);

        assert!(s.handle_ready("a").is_empty());
        assert_eq!(s.state_of("c"), Some(CommandState::Pending));
        assert_eq!(s.first_failure().map(|f| f.reason.as_str()), Some("boom"));

        let second = s.handle_failure("a", "later");
        assert!(!second.first_failure);
        assert_eq!(s.first_failure().map(|f| f.reason.as_str()), Some("boom"));
    }

    #[test]
    fn readiness_after_exit_still_releases_dependents() {
        let mut s = Scheduler::from_config(&cfg(&[("a", &[]), ("b", &["a"])]));
        s.start();
        s.handle_spawned("a");
        s.handle_exited("a", ExitOutcome::Success);
        assert_eq!(s.state_of("a"), Some(CommandState::Exited));
        assert_eq!(s.step_ready("a").scheduled_names(), vec!["b"]);
    }
}
