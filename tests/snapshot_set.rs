use anyhow::Result;
use oorandom::Rand64;
use serde_json::json;

use SlotSwap::fragment;
use SlotSwap::{ComponentKind, ErrorKind, Host, MemoryHost, NodeId, SnapshotSet};

fn body_with_materials(host: &mut MemoryHost, names: &[&str]) -> Result<NodeId> {
    let root = host.add_entity("Person", "Person");
    let body = host.add_child(root, "body")?;
    for name in names {
        let store_id = name.to_ascii_lowercase();
        host.attach(body, ComponentKind::CharacterMaterials, name, &store_id, json!({"gloss": 0.5}))?;
    }
    Ok(root)
}

#[test]
fn members_ordered_by_descending_name_length() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = body_with_materials(&mut host, &["Leg", "Arm", "LeftUpperLeg", "Torso"])?;

    let mut set = SnapshotSet::new(ComponentKind::CharacterMaterials, root);
    set.update(&mut host, None)?;

    let keys: Vec<&str> = set.keys().collect();
    assert_eq!(
        keys,
        vec!["LeftUpperLeg leftupperleg", "Torso torso", "Leg leg", "Arm arm"]
    );

    // tree entries follow the same order
    let frag = set.fragment();
    let ids: Vec<&str> = fragment::storables(&frag)
        .iter()
        .filter_map(|v| v.get("id").and_then(|id| id.as_str()))
        .collect();
    assert_eq!(ids, vec!["leftupperleg", "torso", "leg", "arm"]);
    Ok(())
}

#[test]
fn ordering_holds_for_random_names() -> Result<()> {
    let mut rng = Rand64::new(0x5EED_u128);
    for round in 0..20 {
        let mut host = MemoryHost::new();
        let root = host.add_entity("Person", "Person");
        let body = host.add_child(root, "body")?;

        let n = 1 + rng.rand_range(0..24) as usize;
        let mut attached: Vec<String> = Vec::new();
        for i in 0..n {
            let len = 1 + rng.rand_range(0..8) as usize;
            let name: String = std::iter::repeat('m').take(len).collect();
            let store_id = format!("s{round}_{i}");
            host.attach(body, ComponentKind::CharacterMaterials, &name, &store_id, json!({}))?;
            attached.push(format!("{name} {store_id}"));
        }

        let mut set = SnapshotSet::new(ComponentKind::CharacterMaterials, root);
        set.update(&mut host, None)?;
        let keys: Vec<String> = set.keys().map(str::to_string).collect();
        assert_eq!(keys.len(), n);

        // expected: stable sort of attach order by descending name length
        let mut expected = attached.clone();
        expected.sort_by(|a, b| name_len(b).cmp(&name_len(a)));
        assert_eq!(keys, expected, "round {round}");
    }
    Ok(())
}

#[test]
fn locked_members_are_filtered_by_default() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = body_with_materials(&mut host, &["Skin", "Eyelashes", "Nails"])?;
    let nails = host.find_by_store_id(root, "nails").expect("nails");
    host.set_locked(&nails, true)?;

    let mut set = SnapshotSet::new(ComponentKind::CharacterMaterials, root);
    set.update(&mut host, None)?;
    assert_eq!(set.count(), 2);
    assert!(set.get("Nails nails").is_none());
    Ok(())
}

#[test]
fn custom_predicate_replaces_default_filter() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = body_with_materials(&mut host, &["Skin", "Eyelashes", "Nails"])?;
    let nails = host.find_by_store_id(root, "nails").expect("nails");
    host.set_locked(&nails, true)?;

    let mut set = SnapshotSet::new(ComponentKind::CharacterMaterials, root)
        .with_predicate(|info| info.key.name.starts_with('N'));
    set.update(&mut host, None)?;
    let keys: Vec<&str> = set.keys().collect();
    assert_eq!(keys, vec!["Nails nails"]);
    Ok(())
}

#[test]
fn update_rebuilds_from_live_graph() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = body_with_materials(&mut host, &["Skin", "Eyelashes"])?;
    let mut set = SnapshotSet::new(ComponentKind::CharacterMaterials, root);
    set.update(&mut host, None)?;
    let first = set.fragment();
    set.update(&mut host, None)?;
    assert_eq!(set.fragment(), first, "update is idempotent");

    let skin = host.find_by_store_id(root, "skin").expect("skin");
    let extra = host.add_child(root, "teeth")?;
    host.attach(extra, ComponentKind::CharacterMaterials, "Teeth", "teeth", json!({}))?;
    host.detach(&skin)?;

    set.update(&mut host, None)?;
    let keys: Vec<&str> = set.keys().collect();
    assert_eq!(keys, vec!["Eyelashes eyelashes", "Teeth teeth"]);
    Ok(())
}

#[test]
fn duplicate_member_key_is_rejected() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = host.add_entity("Person", "Person");
    let a = host.add_child(root, "a")?;
    let b = host.add_child(root, "b")?;
    host.attach(a, ComponentKind::CharacterMaterials, "Skin", "skin", json!({}))?;
    host.attach(b, ComponentKind::CharacterMaterials, "Skin", "skin", json!({}))?;

    let mut set = SnapshotSet::new(ComponentKind::CharacterMaterials, root);
    let err = set.update(&mut host, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capture);
    assert!(err.to_string().contains("duplicate"), "{err}");
    Ok(())
}

#[test]
fn empty_set_yields_empty_tree() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = host.add_entity("Person", "Person");
    let mut set = SnapshotSet::new(ComponentKind::SkinWrapMaterials, root);
    let tree = set.update(&mut host, None)?.clone();
    assert_eq!(serde_json::Value::Object(tree), json!({"storables": []}));
    assert!(set.is_empty());
    set.restore(&mut host, Some(root))?;
    Ok(())
}

#[test]
fn absent_root_is_a_lookup_error() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = body_with_materials(&mut host, &["Skin"])?;
    host.remove_node(root)?;
    let mut set = SnapshotSet::new(ComponentKind::CharacterMaterials, root);
    assert_eq!(set.update(&mut host, None).unwrap_err().kind(), ErrorKind::Lookup);
    Ok(())
}

#[test]
fn restore_applies_every_member() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = body_with_materials(&mut host, &["Skin", "Eyelashes"])?;
    let mut set = SnapshotSet::new(ComponentKind::CharacterMaterials, root);
    set.update(&mut host, None)?;

    let skin = host.find_by_store_id(root, "skin").expect("skin");
    let lashes = host.find_by_store_id(root, "eyelashes").expect("eyelashes");
    host.set_field(&skin, "gloss", json!(0.9))?;
    host.set_field(&lashes, "gloss", json!(0.1))?;

    set.restore(&mut host, Some(root))?;
    assert_eq!(host.state(&skin).expect("skin")["gloss"], json!(0.5));
    assert_eq!(host.state(&lashes).expect("eyelashes")["gloss"], json!(0.5));
    Ok(())
}

#[test]
fn members_rebind_after_host_rebuilds_node() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = host.add_entity("Person", "Person");
    let body = host.add_child(root, "body")?;
    host.attach(body, ComponentKind::CharacterMaterials, "Skin", "skin", json!({"gloss": 0.5}))?;
    let mut set = SnapshotSet::new(ComponentKind::CharacterMaterials, root);
    set.update(&mut host, None)?;

    // host tears the node down and builds a new one with the same storable
    host.remove_node(body)?;
    let rebuilt = host.add_child(root, "body")?;
    let skin = host.attach(rebuilt, ComponentKind::CharacterMaterials, "Skin", "skin", json!({"gloss": 0.0}))?;

    set.restore(&mut host, Some(root))?;
    assert_eq!(host.state(&skin).expect("skin")["gloss"], json!(0.5));
    Ok(())
}

#[test]
fn rebinding_matches_name_and_store_id() -> Result<()> {
    let mut host = MemoryHost::new();
    let source = host.add_entity("Person", "Person");
    let a = host.add_child(source, "a")?;
    let b = host.add_child(source, "b")?;
    host.attach(a, ComponentKind::CharacterMaterials, "Skin", "shared", json!({"gloss": 0.2}))?;
    host.attach(b, ComponentKind::CharacterMaterials, "Nails", "shared", json!({"gloss": 0.8}))?;
    let mut set = SnapshotSet::new(ComponentKind::CharacterMaterials, source);
    set.update(&mut host, None)?;
    assert_eq!(set.count(), 2);

    // same storables on another entity, attached in the opposite order
    let target = host.add_entity("Person 2", "Person");
    let b2 = host.add_child(target, "b")?;
    let a2 = host.add_child(target, "a")?;
    let nails = host.attach(b2, ComponentKind::CharacterMaterials, "Nails", "shared", json!({"gloss": 0.0}))?;
    let skin = host.attach(a2, ComponentKind::CharacterMaterials, "Skin", "shared", json!({"gloss": 0.0}))?;

    set.restore(&mut host, Some(target))?;
    assert_eq!(host.state(&skin).expect("skin")["gloss"], json!(0.2));
    assert_eq!(host.state(&nails).expect("nails")["gloss"], json!(0.8));

    // a store id match under another name is not the same member
    let other = host.add_entity("Person 3", "Person");
    let c = host.add_child(other, "c")?;
    host.attach(c, ComponentKind::CharacterMaterials, "Teeth", "shared", json!({}))?;
    let err = set.restore(&mut host, Some(other)).unwrap_err();
    assert!(err.to_string().contains("reference to component in set was lost"), "{err}");
    Ok(())
}

#[test]
fn failed_update_keeps_previous_members() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = body_with_materials(&mut host, &["Skin", "Eyelashes"])?;
    let mut set = SnapshotSet::new(ComponentKind::CharacterMaterials, root);
    set.update(&mut host, None)?;
    let before = set.fragment();

    let skin = host.find_by_store_id(root, "skin").expect("skin");
    let lashes = host.find_by_store_id(root, "eyelashes").expect("eyelashes");
    host.set_field(&skin, "gloss", json!(0.9))?;
    host.set_field(&lashes, "gloss", json!(0.1))?;
    // eyelashes sorts first and captures fine, then skin fails
    host.fail_export_for("skin");

    let err = set.update(&mut host, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capture);
    assert_eq!(set.fragment(), before);
    assert_eq!(set.count(), 2);

    host.clear_failures();
    set.restore(&mut host, Some(root))?;
    assert_eq!(host.state(&skin).expect("skin")["gloss"], json!(0.5));
    assert_eq!(host.state(&lashes).expect("eyelashes")["gloss"], json!(0.5));
    Ok(())
}

#[test]
fn lost_member_aborts_restore_with_its_name() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = body_with_materials(&mut host, &["Skin", "Eyelashes"])?;
    let mut set = SnapshotSet::new(ComponentKind::CharacterMaterials, root);
    set.update(&mut host, None)?;

    let lashes = host.find_by_store_id(root, "eyelashes").expect("eyelashes");
    host.detach(&lashes)?;

    let err = set.restore(&mut host, Some(root)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Restore);
    let part = err.part().unwrap_or_default().to_string();
    assert!(part.starts_with(set.name()), "{part}");
    assert!(part.ends_with("Eyelashes eyelashes"), "{part}");
    assert!(err.to_string().contains("reference to component in set was lost"), "{err}");
    Ok(())
}

#[test]
fn host_apply_failure_names_the_member() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = body_with_materials(&mut host, &["Skin", "Eyelashes"])?;
    let mut set = SnapshotSet::new(ComponentKind::CharacterMaterials, root);
    set.update(&mut host, None)?;
    host.fail_apply_for("skin");

    let err = set.restore(&mut host, Some(root)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Restore);
    assert!(err.part().unwrap_or_default().ends_with("Skin skin"));
    Ok(())
}

#[test]
fn hair_sims_only_count_under_hair_containers() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = host.add_entity("Person", "Person");
    host.attach(root, ComponentKind::HairSim, "Stray", "stray", json!({}))?;

    let group = host.add_child(root, "scalp")?;
    host.attach(group, ComponentKind::HairGroup, "Scalp", "scalp", json!({}))?;
    let bob = host.add_child(group, "bob")?;
    host.attach(bob, ComponentKind::HairSim, "BobSim", "bobsim", json!({"stiffness": 0.3}))?;

    let mesh = host.add_child(root, "brows")?;
    host.attach(mesh, ComponentKind::HairMesh, "Brows", "brows", json!({}))?;
    host.attach(mesh, ComponentKind::HairSim, "BrowSim", "browsim", json!({}))?;

    let mut set = SnapshotSet::new(ComponentKind::HairSim, root);
    set.update(&mut host, None)?;
    let keys: Vec<&str> = set.keys().collect();
    assert_eq!(keys, vec!["BrowSim browsim", "BobSim bobsim"]);
    Ok(())
}

#[test]
fn set_level_json_calls_return_cached_state() -> Result<()> {
    let mut host = MemoryHost::new();
    let root = body_with_materials(&mut host, &["Skin"])?;
    let mut set = SnapshotSet::new(ComponentKind::CharacterMaterials, root);
    set.update(&mut host, None)?;
    let cached = set.fragment();

    assert_eq!(set.export_json(), cached);
    let ignored = fragment::tree(vec![json!({"id": "other"})]);
    assert_eq!(set.import_json(&ignored), cached);
    assert_eq!(set.count(), 1);
    Ok(())
}

fn name_len(key: &str) -> usize {
    key.split(' ').next().map_or(0, str::len)
}
