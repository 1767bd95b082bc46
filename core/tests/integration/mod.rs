//! Scenario modules, one per testable-property group.

mod datalog_scenarios;
mod ingestion_scenarios;
mod resource_bound_scenarios;
