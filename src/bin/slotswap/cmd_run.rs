use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::task::Poll;
use std::time::{Duration, Instant};

use SlotSwap::metrics;
use SlotSwap::swap::{CLOTHING_FIELD, HAIR_FIELD};
use SlotSwap::{
    ControlEvent, CreateTask, Host, MemoryHost, NodeId, SwapBuilder, SwapConfig, SwapControls,
    SwapManager,
};

use super::util::{load_host, print_json, resolve_root};

const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Deserialize)]
struct RawOp {
    op: String,
    id: Option<String>,
    store_id: Option<String>,
    key: Option<String>,
    value: Option<Value>,
    slot: Option<u32>,
    field: Option<String>,
    on: Option<bool>,
}

pub fn exec(scene: PathBuf, entity: String, script: PathBuf, out: Option<PathBuf>) -> Result<()> {
    let raw = std::fs::read_to_string(&script)
        .with_context(|| format!("read script {}", script.display()))?;
    let ops: Vec<RawOp> = serde_json::from_str(&raw).context("parse script json (array of objects)")?;
    if ops.is_empty() {
        println!("No ops to execute.");
        return Ok(());
    }

    let mut host = load_host(&scene)?;
    let root = resolve_root(&host, &entity)?;
    let cfg = SwapBuilder::new().build();
    let mut controls = SwapControls::from_config(&cfg);
    let mut manager = SwapManager::with_config(root, cfg);

    let mut failed = 0usize;
    for (i, op) in ops.into_iter().enumerate() {
        let event = match op.op.to_ascii_lowercase().as_str() {
            "add-slot" => Some(ControlEvent::AddSlot),
            "advance" => Some(ControlEvent::Advance),
            "capture" => Some(ControlEvent::Capture),
            "select" => {
                let slot = op.slot.ok_or_else(|| anyhow!("op #{}: select requires slot", i))?;
                Some(controls.set_current_slot(slot))
            }
            "set" => {
                set_field(&mut host, root, &op).with_context(|| format!("op #{}", i))?;
                None
            }
            "preserve" => {
                let on = op.on.unwrap_or(true);
                match op.field.as_deref() {
                    Some(CLOTHING_FIELD) => controls.set_preserve_clothing(on),
                    Some(HAIR_FIELD) => controls.set_preserve_hair(on),
                    other => return Err(anyhow!("op #{}: unknown preserve field {:?}", i, other)),
                }
                None
            }
            "spawn" => {
                let id = op.id.as_deref().ok_or_else(|| anyhow!("op #{}: spawn requires id", i))?;
                spawn(&mut host, manager.config(), id).with_context(|| format!("op #{}", i))?;
                None
            }
            "dump" => {
                match manager.current_slot() {
                    Some(slot) => print_json(&slot.fragment())?,
                    None => println!("(no slots)"),
                }
                None
            }
            other => return Err(anyhow!("op #{}: unknown op '{}'", i, other)),
        };

        if let Some(event) = event {
            let ok = manager.dispatch(&mut host, &controls, event);
            controls.sync(&manager);
            if !ok {
                failed += 1;
            }
            println!(
                "{:>3} {:?}: {} (slot {}/{})",
                i,
                event,
                if ok { "OK" } else { "FAILED" },
                controls.current_slot(),
                controls.slot_count()
            );
        }
    }

    let m = metrics::snapshot();
    println!(
        "Metrics: slots_added={} advances={} restore_failures={} rollbacks={} busy_rejections={} avg_set_size={:.2}",
        m.slots_added,
        m.advances,
        m.advance_restore_failures,
        m.advance_rollbacks,
        m.busy_rejections,
        m.avg_set_size()
    );

    if let Some(path) = out {
        host.to_scene().save(&path)?;
        println!("Scene written to {}", path.display());
    }
    if failed > 0 {
        return Err(anyhow!("{} operation(s) failed", failed));
    }
    Ok(())
}

// Drive a creation task frame by frame until it settles.
fn spawn(host: &mut MemoryHost, cfg: &SwapConfig, id: &str) -> Result<()> {
    let mut task = CreateTask::start(host, &cfg.entity_type, id, cfg.create_timeout(), Instant::now())?;
    loop {
        if let Poll::Ready(handle) = task.poll(&*host, Instant::now()) {
            match handle.node() {
                Some(node) => println!("spawned {} as {}", id, node),
                None => println!("spawn {}: N/A", id),
            }
            return Ok(());
        }
        host.tick();
        std::thread::sleep(FRAME);
    }
}

fn set_field(host: &mut MemoryHost, root: NodeId, op: &RawOp) -> Result<()> {
    let store_id = op.store_id.as_deref().ok_or_else(|| anyhow!("set requires store_id"))?;
    let key = op.key.as_deref().ok_or_else(|| anyhow!("set requires key"))?;
    let value = op.value.clone().unwrap_or(Value::Null);
    if !host.contains_node(root) {
        return Err(anyhow!("root {} is gone", root));
    }
    let component = host
        .find_by_store_id(root, store_id)
        .ok_or_else(|| anyhow!("no component '{}' under {}", store_id, root))?;
    host.set_field(&component, key, value)
}
