//! Construction stage records: field validation, derived durations, and CRUD
//! access over a pluggable store.
//!
//! Write requests flow through [`stage::validate`] and then
//! [`stage::calculate`] before reaching a [`store::StageStore`]; the
//! [`service::StageService`] owns that sequencing and the [`server`] module
//! exposes it over HTTP.

pub mod db;
pub mod prom_metrics;
pub mod server;
pub mod service;
pub mod stage;
pub mod store;
