//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled                                              |
//! |-----------|---------------------------------------------------------------|
//! | `query`   | `Validate`, `Export`, `Stats`, `Next`, `Previous`, `History`, |
//! |           | `IsFinal`, `Skipped`, `FinalProduction`, `Flows`, `Status`,   |
//! |           | `ByKind`                                                      |
//! | `convert` | `Convert`                                                     |
//! | `config`  | `Config`                                                      |

pub mod config;
pub mod convert;
pub mod query;

use opflow::config::OpflowConfig;
use opflow::registry::{JsonDirProvider, MapRegistry};
use std::path::Path;
use std::sync::Arc;

pub use config::cmd_config;
pub use convert::cmd_convert;
pub use query::{
    cmd_by_kind, cmd_export, cmd_final_production, cmd_flows, cmd_history, cmd_is_final,
    cmd_next, cmd_previous, cmd_skipped, cmd_stats, cmd_status, cmd_validate,
};

/// Shared state for commands that read order maps.
pub struct Context {
    pub provider: Arc<JsonDirProvider>,
    pub registry: MapRegistry,
}

impl Context {
    pub fn new(config: OpflowConfig, data_dir: &Path) -> Self {
        let provider = Arc::new(JsonDirProvider::new(data_dir));
        let registry = MapRegistry::new(provider.clone(), Arc::new(config));
        Self { provider, registry }
    }
}
