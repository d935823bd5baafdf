//! Client for a spreadsheet-backed portfolio endpoint: cached, de-duplicated
//! reads with an offline-aware retry queue, and a contact form pipeline.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod presentation;
pub mod state;
