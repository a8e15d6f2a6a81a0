use anyhow::Result;
use std::path::PathBuf;

use SlotSwap::{SwapBuilder, SwapManager};

use super::util::{load_host, print_json, resolve_root};

pub fn exec(scene: PathBuf, entity: String, json: bool) -> Result<()> {
    let mut host = load_host(&scene)?;
    let root = resolve_root(&host, &entity)?;
    let cfg = SwapBuilder::new().build();
    let manager = SwapManager::with_config(root, cfg);

    let mut collection = manager.default_collection(&mut host)?;
    let tree = collection.update(&mut host)?.clone();

    if json {
        return print_json(&tree);
    }

    println!("{}", collection.name());
    println!("  entries: {}", collection.count());
    if let Some(g) = collection.geometry().and_then(|g| g.fragment()) {
        let keys: Vec<&str> = g.keys().map(String::as_str).collect();
        println!("  geometry: {}", keys.join(", "));
    }
    if let Some(m) = collection.materials() {
        println!("  {} ({})", m.name(), m.count());
        for key in m.keys() {
            println!("    {}", key);
        }
    }
    for part in collection.parts() {
        println!("  {}", part.name());
    }
    for set in collection.part_sets() {
        println!("  {} ({})", set.name(), set.count());
        for key in set.keys() {
            println!("    {}", key);
        }
    }
    Ok(())
}
