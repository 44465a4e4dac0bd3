//! Replayable ownership walkthroughs.
//!
//! Each scenario drives the holders through one lifecycle and returns a
//! [`ScenarioReport`] describing what it observed, so the demo binary can print
//! it and the tests can check it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use clap::ValueEnum;
use log::info;
use serde::Deserialize;
use thiserror::Error;

use crate::error::HolderError;
use crate::exclusive::ExclusiveHolder;
use crate::shared::SharedHolder;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    #[error(transparent)]
    Holder(#[from] HolderError),

    #[error("{scenario} walkthrough overflows: {value} + {step} does not fit in i64")]
    Overflow {
        scenario: &'static str,
        value: i64,
        step: i64,
    },
}

fn step_value(scenario: &'static str, value: i64, step: i64) -> Result<i64, ScenarioError> {
    value
        .checked_add(step)
        .ok_or(ScenarioError::Overflow { scenario, value, step })
}

//==============================================================================
// Milestone 1: Observable resources
//==============================================================================

/// EventLog: shared transcript of construction and destruction events
#[derive(Debug, Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<String>>>);

impl EventLog {
    pub fn record(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count_ending_with(&self, suffix: &str) -> usize {
        self.0.borrow().iter().filter(|e| e.ends_with(suffix)).count()
    }
}

/// Tracked: integer resource that reports its own lifetime to an [`EventLog`]
#[derive(Debug)]
pub struct Tracked {
    label: &'static str,
    value: Cell<i64>,
    log: EventLog,
}

impl Tracked {
    pub fn new(label: &'static str, value: i64, log: &EventLog) -> Self {
        log.record(format!("{label} constructed"));
        Tracked {
            label,
            value: Cell::new(value),
            log: log.clone(),
        }
    }

    pub fn value(&self) -> i64 {
        self.value.get()
    }

    pub fn set(&self, value: i64) {
        self.value.set(value);
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.log.record(format!("{} destroyed", self.label));
    }
}

//==============================================================================
// Milestone 2: Scenario catalogue
//==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Exclusive,
    Shared,
    Fanout,
    Scope,
    #[default]
    All,
}

impl Scenario {
    pub fn expand(self) -> Vec<Scenario> {
        match self {
            Scenario::All => vec![
                Scenario::Exclusive,
                Scenario::Shared,
                Scenario::Fanout,
                Scenario::Scope,
            ],
            single => vec![single],
        }
    }
}

/// ScenarioReport: what a walkthrough observed
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    pub name: &'static str,
    /// Values read through a holder, in order.
    pub observed: Vec<i64>,
    /// Shared count of the last holder touched, after the walkthrough.
    pub final_count: usize,
    /// How many times the resource was destroyed.
    pub releases: usize,
    pub events: Vec<String>,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "  observed:    {:?}", self.observed)?;
        writeln!(f, "  final count: {}", self.final_count)?;
        writeln!(f, "  releases:    {}", self.releases)?;
        for event in &self.events {
            writeln!(f, "  - {event}")?;
        }
        Ok(())
    }
}

//==============================================================================
// Milestone 3: Walkthroughs
//==============================================================================

/// Exclusive holder over `initial`: increment, read, dispose twice.
pub fn exclusive_increment(initial: i64) -> Result<ScenarioReport, ScenarioError> {
    let log = EventLog::default();
    let mut holder = ExclusiveHolder::new(Tracked::new("exclusive", initial, &log));

    let resource = holder.access()?;
    resource.set(step_value("exclusive", resource.value(), 1)?);
    let observed = vec![holder.get()?.value()];

    holder.dispose();
    holder.dispose();
    log.record("disposed twice");

    Ok(ScenarioReport {
        name: "exclusive",
        observed,
        final_count: 0,
        releases: log.count_ending_with("destroyed"),
        events: log.events(),
    })
}

/// Shared holders `p` and `q`: the resource outlives `p` because `q` still holds it.
pub fn shared_handoff(initial: i64) -> Result<ScenarioReport, ScenarioError> {
    let log = EventLog::default();
    let mut p: SharedHolder<Tracked> = SharedHolder::new(Tracked::new("shared", initial, &log));
    let mut q = p.clone();

    p.access()?.set(step_value("shared", initial, 1)?);
    p.dispose();
    log.record(format!("p disposed, q count {}", q.count()));

    let mut observed = vec![q.access()?.value()];
    q.access()?.set(step_value("shared", initial, 2)?);
    observed.push(q.access()?.value());
    q.dispose();

    Ok(ScenarioReport {
        name: "shared",
        observed,
        final_count: q.count(),
        releases: log.count_ending_with("destroyed"),
        events: log.events(),
    })
}

/// One resource cloned `copies` times, then every holder disposed in turn.
pub fn shared_fanout(copies: usize) -> Result<ScenarioReport, ScenarioError> {
    let log = EventLog::default();
    let root: SharedHolder<Tracked> = SharedHolder::new(Tracked::new("fanout", 0, &log));

    let mut holders: Vec<_> = (0..copies).map(|_| root.clone()).collect();
    holders.push(root);

    let mut observed = vec![holders[0].count() as i64];
    for index in 0..holders.len() {
        holders[index].access()?;
        holders[index].dispose();
        log.record("holder disposed");
        observed.push(holders.get(index + 1).map_or(0, SharedHolder::count) as i64);
    }

    Ok(ScenarioReport {
        name: "fanout",
        observed,
        final_count: holders.iter().map(SharedHolder::count).sum(),
        releases: log.count_ending_with("destroyed"),
        events: log.events(),
    })
}

/// An inner-scope holder is destroyed on scope exit unless `keep_alive`
/// assigns it to a holder from the outer scope first.
pub fn scope_release(keep_alive: bool) -> Result<ScenarioReport, ScenarioError> {
    let log = EventLog::default();
    let mut outer: SharedHolder<Tracked> = SharedHolder::empty();

    {
        let inner = SharedHolder::new(Tracked::new("scoped", 0, &log));
        if keep_alive {
            outer.assign_from(&inner);
        }
    }
    log.record("left scope");
    let final_count = outer.count();
    drop(outer);

    Ok(ScenarioReport {
        name: if keep_alive { "scope (kept alive)" } else { "scope" },
        observed: Vec::new(),
        final_count,
        releases: log.count_ending_with("destroyed"),
        events: log.events(),
    })
}

/// Runs `scenario` (or every scenario for [`Scenario::All`]).
pub fn run(
    scenario: Scenario,
    initial: i64,
    copies: usize,
) -> Result<Vec<ScenarioReport>, ScenarioError> {
    let mut reports = Vec::new();
    for single in scenario.expand() {
        info!("running {single:?} scenario");
        match single {
            Scenario::Exclusive => reports.push(exclusive_increment(initial)?),
            Scenario::Shared => reports.push(shared_handoff(initial)?),
            Scenario::Fanout => reports.push(shared_fanout(copies)?),
            Scenario::Scope => {
                reports.push(scope_release(false)?);
                reports.push(scope_release(true)?);
            }
            Scenario::All => unreachable!("expand never yields All"),
        }
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_increment_observes_two() {
        let report = exclusive_increment(1).unwrap();
        assert_eq!(report.observed, vec![2]);
        assert_eq!(report.releases, 1);
        assert_eq!(
            report.events,
            vec!["exclusive constructed", "exclusive destroyed", "disposed twice"]
        );
    }

    #[test]
    fn test_shared_handoff_keeps_resource_for_q() {
        let report = shared_handoff(1).unwrap();
        assert_eq!(report.observed, vec![2, 3]);
        assert_eq!(report.final_count, 0);
        assert_eq!(report.releases, 1);
        assert_eq!(report.events[1], "p disposed, q count 1");
        assert_eq!(report.events.last().map(String::as_str), Some("shared destroyed"));
    }

    #[test]
    fn test_fanout_releases_on_last_dispose() {
        let report = shared_fanout(3).unwrap();
        assert_eq!(report.observed, vec![4, 3, 2, 1, 0]);
        assert_eq!(report.releases, 1);
        assert_eq!(report.final_count, 0);

        let destroyed = report.events.iter().position(|e| e == "fanout destroyed").unwrap();
        let last_dispose = report.events.iter().rposition(|e| e == "holder disposed").unwrap();
        assert!(destroyed < last_dispose);
        assert_eq!(destroyed, last_dispose - 1);
    }

    #[test]
    fn test_scope_release_order() {
        let report = scope_release(false).unwrap();
        assert_eq!(
            report.events,
            vec!["scoped constructed", "scoped destroyed", "left scope"]
        );

        let kept = scope_release(true).unwrap();
        assert_eq!(kept.final_count, 1);
        assert_eq!(
            kept.events,
            vec!["scoped constructed", "left scope", "scoped destroyed"]
        );
    }

    #[test]
    fn test_increment_past_i64_max_is_reported() {
        assert_eq!(
            exclusive_increment(i64::MAX).unwrap_err(),
            ScenarioError::Overflow {
                scenario: "exclusive",
                value: i64::MAX,
                step: 1,
            }
        );
        assert!(matches!(
            shared_handoff(i64::MAX - 1),
            Err(ScenarioError::Overflow { scenario: "shared", step: 2, .. })
        ));
        assert_eq!(exclusive_increment(i64::MAX - 1).unwrap().observed, vec![i64::MAX]);
    }

    #[test]
    fn test_run_reports_overflow() {
        let error = run(Scenario::Exclusive, i64::MAX, 0).unwrap_err();
        assert!(error.to_string().contains("does not fit in i64"));
    }

    #[test]
    fn test_run_all_expands_every_scenario() {
        let reports = run(Scenario::All, 1, 2).unwrap();
        let names: Vec<_> = reports.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec!["exclusive", "shared", "fanout", "scope", "scope (kept alive)"]
        );
        assert!(reports.iter().all(|r| r.releases == 1));
    }
}
