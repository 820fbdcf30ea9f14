//! Contract scenarios for the BI platform.
//!
//! Each module covers one subsystem and exposes scenario builders plus the
//! `SUBSYSTEM` name used to pick its base URL from
//! [`HarnessConfiguration`](contract_harness::HarnessConfiguration).
//! Project and dataset IDs are fixtures, never constants.

pub mod expressions;
pub mod link_types;
pub mod project_explorer;
pub mod schemas;
