//! Runs scenarios through the harness and grades them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dungeon_core::Topic;
use tracing::info;
use walkdir::WalkDir;

use crate::harness::Harness;
use crate::report::{CheckResult, ScenarioInfo, ScenarioReport};
use crate::scenario::{Expectations, Scenario};

pub fn run_scenario(scenario: &Scenario, run_id: impl Into<String>) -> ScenarioReport {
    let mut harness = Harness::new(scenario.game.clone(), scenario.seed);
    let dt = scenario.tick_duration();
    for tick in 0..scenario.ticks {
        harness.step(&scenario.keys_at(tick), dt);
    }

    let checks = evaluate(&scenario.expect, &mut harness);
    let info = ScenarioInfo {
        name: scenario.name.clone(),
        seed: scenario.seed,
        ticks: scenario.ticks,
        source: None,
    };
    let report = ScenarioReport::new(run_id, info, checks, harness.trace().to_vec());
    info!(
        target: "playtest.replay",
        scenario = %scenario.name,
        status = ?report.summary.status,
        "scenario finished"
    );
    report
}

pub fn run_scenario_file(path: &Path, run_id: impl Into<String>) -> Result<ScenarioReport> {
    let scenario = Scenario::from_path(path)
        .with_context(|| format!("loading scenario {}", path.display()))?;
    let mut report = run_scenario(&scenario, run_id);
    report.scenario.source = Some(path.to_path_buf());
    Ok(report)
}

/// Every `*.toml` under `root`, sorted so batch order is stable.
pub fn discover_scenarios(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_hidden(e.path())) {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            found.push(path.to_path_buf());
        }
    }
    found.sort();
    Ok(found)
}

pub fn run_batch(root: &Path, run_id: &str) -> Result<Vec<ScenarioReport>> {
    discover_scenarios(root)?
        .iter()
        .map(|path| {
            let stem = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("scenario");
            run_scenario_file(path, format!("{run_id}-{stem}"))
        })
        .collect()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.') && name.len() > 1)
}

fn evaluate(expect: &Expectations, harness: &mut Harness) -> Vec<CheckResult> {
    let mut checks = Vec::new();
    let health = harness.player_health();

    if let Some(expected) = expect.hit_points {
        let actual = health.as_ref().map(|h| h.current_hit_points());
        checks.push(CheckResult::equal("hit_points", Some(expected), actual));
    }
    if let Some(expected) = &expect.health_changes {
        checks.push(CheckResult::equal(
            "health_changes",
            expected.clone(),
            harness.values(Topic::HealthChanged),
        ));
    }
    if let Some(minimum) = expect.coins_at_least {
        checks.push(CheckResult::compare(
            "coins_at_least",
            minimum,
            harness.coins(),
            |min, got| got >= min,
        ));
    }
    if let Some(expected) = expect.active_projectiles {
        checks.push(CheckResult::equal(
            "active_projectiles",
            expected,
            harness.active_projectiles(),
        ));
    }
    if let Some(expected) = expect.player_state {
        let actual = health.as_ref().map(|h| h.state());
        checks.push(CheckResult::equal("player_state", Some(expected), actual));
    }
    checks
}
