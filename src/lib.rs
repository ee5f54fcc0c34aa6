#[macro_use]
extern crate tracing;

pub mod cmd;
pub mod config;
pub mod constants;
pub mod container_registry;
pub mod errors;
pub mod events;
pub mod io_models;
pub mod lifecycle;
pub mod logger;
pub mod mirror;
pub mod models;
pub mod runtime;
