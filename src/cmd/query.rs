//! Map query commands: `opflow validate`, `next`, `skipped` and friends.
//!
//! Everything except `validate` goes through the registry, so an invalid
//! order fails with its validation errors instead of answering.

use anyhow::{Context as _, Result};
use opflow::flow::{OperationKind, OperationMap, OperationRef};
use opflow::registry::OrderDataProvider;
use serde::Serialize;
use std::sync::Arc;

use super::Context;
use crate::NodeArgs;

fn load(ctx: &Context, order: &str) -> Result<Arc<OperationMap>> {
    Ok(ctx.registry.get(order)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn print_refs(refs: &[OperationRef]) {
    for r in refs {
        println!("{}\tseq {}", r, r.sequence_no);
    }
}

/// Build the map without the registry so warnings of a valid map and
/// errors of an invalid one are both reported.
pub fn cmd_validate(ctx: &Context, order: &str) -> Result<()> {
    let records = ctx
        .provider
        .fetch_edges(order)
        .with_context(|| format!("Failed to load edge records for order {}", order))?;
    let config = ctx.registry.config();
    let map = OperationMap::build(order, &records, &config.classification, &config.terminal);

    println!();
    println!("Order {}: {} operations", order, map.graph().len());
    println!();

    if !map.validation_errors().is_empty() {
        println!("Errors:");
        for error in map.validation_errors() {
            println!("  - {}", error);
        }
        println!();
    }
    if !map.validation_warnings().is_empty() {
        println!("Warnings:");
        for warning in map.validation_warnings() {
            println!("  - {}", warning);
        }
        println!();
    }

    if !map.is_valid() {
        anyhow::bail!(
            "Operation map for order {} is invalid ({} errors)",
            order,
            map.validation_errors().len()
        );
    }
    println!("Operation map is valid.");
    Ok(())
}

pub fn cmd_export(ctx: &Context, order: &str) -> Result<()> {
    let map = load(ctx, order)?;
    let export = map
        .export()
        .with_context(|| format!("Order {} has no exportable map", order))?;
    print_json(&export)
}

pub fn cmd_stats(ctx: &Context, order: &str) -> Result<()> {
    let map = load(ctx, order)?;
    let stats = map
        .operation_stats()
        .with_context(|| format!("Order {} has no statistics", order))?;
    print_json(&stats)
}

pub fn cmd_next(ctx: &Context, order: &str, node: &NodeArgs) -> Result<()> {
    let map = load(ctx, order)?;
    print_refs(&map.next_operations(&node.operation, &node.component, node.seq));
    Ok(())
}

pub fn cmd_previous(ctx: &Context, order: &str, node: &NodeArgs) -> Result<()> {
    let map = load(ctx, order)?;
    print_refs(&map.previous_operations(&node.operation, &node.component, node.seq));
    Ok(())
}

pub fn cmd_history(ctx: &Context, order: &str, node: &NodeArgs) -> Result<()> {
    let map = load(ctx, order)?;
    for name in map.all_previous_operations(&node.operation, &node.component, node.seq) {
        println!("{}", name);
    }
    Ok(())
}

pub fn cmd_is_final(ctx: &Context, order: &str, operation: &str, component: &str) -> Result<()> {
    let map = load(ctx, order)?;
    println!("{}", map.is_final_operation(operation, component));
    Ok(())
}

pub fn cmd_skipped(
    ctx: &Context,
    order: &str,
    component: &str,
    last: &str,
    current: &str,
) -> Result<()> {
    let map = load(ctx, order)?;
    print_refs(&map.skipped_operations(component, last, current));
    Ok(())
}

pub fn cmd_final_production(ctx: &Context, order: &str) -> Result<()> {
    let map = load(ctx, order)?;
    match map.final_production_operation() {
        Some(operation) => println!("{}", operation),
        None => anyhow::bail!("Order {} has no final production operation", order),
    }
    Ok(())
}

pub fn cmd_flows(ctx: &Context, order: &str, component: &str) -> Result<()> {
    let map = load(ctx, order)?;
    for flow in map.operation_flows(component) {
        let names: Vec<&str> = flow.iter().map(|r| r.operation.as_str()).collect();
        println!("{}", names.join(" -> "));
    }
    Ok(())
}

pub fn cmd_status(ctx: &Context, order: &str, component: &str, last: &str) -> Result<()> {
    let map = load(ctx, order)?;
    let status = map.component_status(component, last).with_context(|| {
        format!("Operation {} not found in component {} of order {}", last, component, order)
    })?;
    print_json(&status)
}

pub fn cmd_by_kind(ctx: &Context, order: &str, kind: &str) -> Result<()> {
    let kind: OperationKind = kind.parse()?;
    let map = load(ctx, order)?;
    print_refs(&map.operations_by_kind(kind));
    Ok(())
}
