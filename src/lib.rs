uniffi::setup_scaffolding!();

mod api;
mod async_worker;
pub mod capability;
mod trace_init;

pub use api::*;
