use anyhow::{anyhow, Context, Result};
use std::path::Path;

use SlotSwap::host::scene::Scene;
use SlotSwap::{Host, MemoryHost, NodeId};

pub fn load_host(scene: &Path) -> Result<MemoryHost> {
    let scene = Scene::load(scene)?;
    MemoryHost::from_scene(&scene).context("build host from scene")
}

pub fn resolve_root(host: &MemoryHost, entity: &str) -> Result<NodeId> {
    host.resolve_entity(entity)
        .ok_or_else(|| anyhow!("entity '{}' not found in scene", entity))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
