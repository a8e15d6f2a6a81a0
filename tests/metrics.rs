use anyhow::Result;
use serde_json::json;

use SlotSwap::metrics;
use SlotSwap::{ComponentKind, MemoryHost, SwapBuilder, SwapManager};

// Counters are process-wide; this file holds a single test.
#[test]
fn counters_follow_manager_activity() -> Result<()> {
    metrics::reset();

    let mut host = MemoryHost::new();
    let root = host.add_entity("Person", "Person");
    host.attach(root, ComponentKind::Geometry, "geometry", "geometry", json!({"character": "A"}))?;
    let body = host.add_child(root, "skin")?;
    host.attach(body, ComponentKind::CharacterMaterials, "Skin", "skin", json!({"tone": 0.5}))?;

    let cfg = SwapBuilder::from_default().logging(false).rollback_on_failure(true).build();
    let mut mgr = SwapManager::with_config(root, cfg);
    mgr.add_slot(&mut host)?;
    mgr.add_slot(&mut host)?;
    mgr.advance(&mut host)?;

    host.fail_apply_for("skin");
    assert!(mgr.advance(&mut host).is_err());

    let guard = mgr.busy_flag().try_enter("test")?;
    assert!(mgr.capture(&mut host).is_err());
    drop(guard);

    let m = metrics::snapshot();
    assert_eq!(m.slots_added, 2);
    assert_eq!(m.advances, 2);
    assert_eq!(m.advance_restore_failures, 1);
    assert_eq!(m.advance_rollbacks, 1);
    assert_eq!(m.busy_rejections, 1);
    assert!((m.advance_failure_ratio() - 0.5).abs() < 1e-9);
    assert!(m.set_rebuilds > 0);
    assert!(m.avg_set_size() > 0.0);

    metrics::reset();
    assert_eq!(metrics::snapshot().advances, 0);
    Ok(())
}
