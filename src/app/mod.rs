//! # Application State
//!
//! Session state shared between the run pipeline and whatever renders it.

pub mod state;

pub use state::Dashboard;
