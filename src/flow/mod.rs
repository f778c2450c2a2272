//! Operation flow maps for production orders.
//!
//! Each production order routes its components through a sequence of
//! manufacturing operations. This module turns the order's flat edge records
//! into a directed graph, validates it and answers the routing questions that
//! gate shop-floor scans.
//!
//! ## Architecture
//!
//! 1. **Builder** - Materializes nodes and forward/backward adjacency from records
//! 2. **Validator** - Checks cycles, reachability, terminal operations and unlink config
//! 3. **Map** - Read-only query engine over a validated graph
//!
//! ## Example
//!
//! ```
//! use opflow::flow::{EdgeRecord, KindTable, OperationMap, TerminalPolicy};
//!
//! let records = vec![
//!     EdgeRecord::new("Cut", "Body", "Sew", 1),
//!     EdgeRecord::new("Sew", "Body", "QC", 1),
//!     EdgeRecord::new("QC", "Body", "Pack", 1),
//!     EdgeRecord::new("Pack", "Body", "", 1),
//! ];
//!
//! let map = OperationMap::build("TRK-001", &records, &KindTable::default(), &TerminalPolicy::default());
//! assert!(map.is_valid());
//! assert!(map.is_final_operation("Pack", "Body"));
//! assert_eq!(map.skipped_operations("Body", "Cut", "Pack").len(), 2);
//! ```

mod builder;
mod kind;
mod map;
mod node;
mod record;
mod validator;

pub use builder::{GraphBuilder, OperationGraph};
pub use kind::{KindRule, KindTable};
pub use map::{ComponentStatus, MapExport, NodeExport, OperationMap, OperationStats};
pub use node::{NodeIndex, OperationKind, OperationNode, OperationRef};
pub use record::{EdgeRecord, ProcessEdge, ProcessMap, ProcessNode, load_records};
pub use validator::{
    MERGE_COMPONENTS_KEY, SPLIT_COMPONENTS_KEY, Severity, TerminalPolicy, ValidationResult,
    Validator,
};
