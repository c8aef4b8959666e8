//! Persistence for appointments, services, settings and the reminder journal.
//!
//! `JsonMapStore` keeps a JSON object on disk; `AppStore` maps the document
//! keys onto typed records.

pub mod json_map_store;
pub mod app_store;

pub use app_store::AppStore;
