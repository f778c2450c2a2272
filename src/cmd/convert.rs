//! Process map conversion: `opflow convert`.

use anyhow::{Context, Result};
use opflow::flow::ProcessMap;
use std::path::Path;

pub fn cmd_convert(input: &Path, output: Option<&Path>) -> Result<()> {
    let process_map = ProcessMap::load(input)?;
    let records = process_map.to_edge_records();
    let json = serde_json::to_string_pretty(&records).context("Failed to serialize edge records")?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Wrote {} edge records to {}",
                records.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}
