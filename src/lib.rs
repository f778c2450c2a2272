pub mod config;
pub mod errors;
pub mod flow;
pub mod logging;
pub mod registry;
