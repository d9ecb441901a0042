//! Headless playtesting for the dungeon gameplay: scripted key input,
//! scenario files and pass/fail reports.

pub mod harness;
pub mod replay;
pub mod report;
pub mod scenario;

pub use harness::{Harness, TraceEntry};
pub use replay::{discover_scenarios, run_batch, run_scenario, run_scenario_file};
pub use report::{CheckResult, CheckStatus, ReportStatus, ReportSummary, ScenarioInfo, ScenarioReport};
pub use scenario::{Expectations, InputSpan, Scenario, ScenarioError};
