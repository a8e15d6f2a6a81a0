//! Closed set of supported component kinds and the per-kind ops table.
//!
//! One snapshot type serves every kind; what differs per kind (how it is
//! looked up, discovered, exported and applied) lives in [`KindOps`].

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SwapError, SwapResult};
use crate::fragment::Fragment;
use crate::host::{
    ComponentInfo, ComponentKey, ExportOptions, Host, LookupScope, NodeId, RestoreOptions,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Character selector: base character plus clothing/hair/morph links.
    Geometry,
    SkinTextures,
    CharacterMaterials,
    SkinWrapMaterials,
    HairSim,
    HairGroup,
    HairMesh,
}

pub struct KindOps {
    /// Host-side type name, used in set names and logs.
    pub type_name: &'static str,
    /// Store id given to a component created by `ensure_component`.
    pub default_store_id: &'static str,
    /// Compound reference fields reset on the target before a restore.
    pub reference_fields: &'static [&'static str],
    pub lookup: fn(&mut dyn Host, NodeId, ComponentKind) -> SwapResult<ComponentInfo>,
    pub discover: fn(&dyn Host, NodeId, ComponentKind) -> Vec<ComponentInfo>,
    pub export: fn(&dyn Host, &ComponentKey) -> anyhow::Result<Fragment>,
    pub apply: fn(&mut dyn Host, &ComponentKey, &Fragment) -> anyhow::Result<()>,
}

/// Reference fields of the character selector, in schema order.
pub const GEOMETRY_REFERENCE_FIELDS: &[&str] = &["clothing", "hair", "morphs"];

const HAIR_CONTAINERS: &[ComponentKind] = &[ComponentKind::HairGroup, ComponentKind::HairMesh];

static GEOMETRY_OPS: KindOps = KindOps {
    type_name: "DAZCharacterSelector",
    default_store_id: "geometry",
    reference_fields: GEOMETRY_REFERENCE_FIELDS,
    lookup: assured_lookup,
    discover: discover_descendants,
    export: export_appearance,
    apply: apply_appearance,
};

static SKIN_TEXTURES_OPS: KindOps = KindOps {
    type_name: "DAZCharacterTextureControl",
    default_store_id: "textures",
    reference_fields: &[],
    lookup: assured_lookup,
    discover: discover_descendants,
    export: export_appearance,
    apply: apply_appearance,
};

static CHARACTER_MATERIALS_OPS: KindOps = KindOps {
    type_name: "DAZCharacterMaterialOptions",
    default_store_id: "skin",
    reference_fields: &[],
    lookup: assured_lookup,
    discover: discover_descendants,
    export: export_appearance,
    apply: apply_appearance,
};

static SKIN_WRAP_MATERIALS_OPS: KindOps = KindOps {
    type_name: "DAZSkinWrapMaterialOptions",
    default_store_id: "skinwrap",
    reference_fields: &[],
    lookup: assured_lookup,
    discover: discover_descendants,
    export: export_appearance,
    apply: apply_appearance,
};

static HAIR_SIM_OPS: KindOps = KindOps {
    type_name: "HairSimControl",
    default_store_id: "hairsim",
    reference_fields: &[],
    lookup: assured_lookup,
    discover: discover_in_hair_containers,
    export: export_appearance,
    apply: apply_appearance,
};

static HAIR_GROUP_OPS: KindOps = KindOps {
    type_name: "DAZHairGroupControl",
    default_store_id: "hairgroup",
    reference_fields: &[],
    lookup: assured_lookup,
    discover: discover_descendants,
    export: export_appearance,
    apply: apply_appearance,
};

static HAIR_MESH_OPS: KindOps = KindOps {
    type_name: "DAZHairMesh",
    default_store_id: "hairmesh",
    reference_fields: &[],
    lookup: assured_lookup,
    discover: discover_descendants,
    export: export_appearance,
    apply: apply_appearance,
};

impl ComponentKind {
    pub fn ops(self) -> &'static KindOps {
        match self {
            ComponentKind::Geometry => &GEOMETRY_OPS,
            ComponentKind::SkinTextures => &SKIN_TEXTURES_OPS,
            ComponentKind::CharacterMaterials => &CHARACTER_MATERIALS_OPS,
            ComponentKind::SkinWrapMaterials => &SKIN_WRAP_MATERIALS_OPS,
            ComponentKind::HairSim => &HAIR_SIM_OPS,
            ComponentKind::HairGroup => &HAIR_GROUP_OPS,
            ComponentKind::HairMesh => &HAIR_MESH_OPS,
        }
    }

    pub fn type_name(self) -> &'static str {
        self.ops().type_name
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Direct attachment, then descendant search, then create-if-missing.
pub fn assured_lookup(
    host: &mut dyn Host,
    root: NodeId,
    kind: ComponentKind,
) -> SwapResult<ComponentInfo> {
    if !host.contains_node(root) {
        return Err(SwapError::Lookup {
            part: String::new(),
            kind,
            root,
            reason: "root is absent".into(),
        });
    }
    if let Some(info) = host.lookup_component(root, kind, LookupScope::Direct) {
        debug!("assured {} on {}: direct", kind, root);
        return Ok(info);
    }
    if let Some(info) = host.lookup_component(root, kind, LookupScope::Descendants) {
        debug!("assured {} on {}: descendant", kind, root);
        return Ok(info);
    }
    let created = host
        .ensure_component(root, kind)
        .map_err(|e| SwapError::Lookup {
            part: String::new(),
            kind,
            root,
            reason: format!("{:#}", e),
        })?;
    debug!("assured {} on {}: created {}", kind, root, created.key.store_id);
    Ok(created)
}

fn discover_descendants(host: &dyn Host, root: NodeId, kind: ComponentKind) -> Vec<ComponentInfo> {
    host.enumerate_descendants(root, kind)
}

// Hair sims only count when they hang under a hair group or a hair mesh.
fn discover_in_hair_containers(
    host: &dyn Host,
    root: NodeId,
    kind: ComponentKind,
) -> Vec<ComponentInfo> {
    let mut out: Vec<ComponentInfo> = Vec::new();
    for container_kind in HAIR_CONTAINERS {
        for container in host.enumerate_descendants(root, *container_kind) {
            for info in host.enumerate_descendants(container.key.node, kind) {
                if !out.iter().any(|seen| seen.key == info.key) {
                    out.push(info);
                }
            }
        }
    }
    out
}

fn export_appearance(host: &dyn Host, key: &ComponentKey) -> anyhow::Result<Fragment> {
    host.export_state(key, ExportOptions::APPEARANCE)
}

fn apply_appearance(host: &mut dyn Host, key: &ComponentKey, fragment: &Fragment) -> anyhow::Result<()> {
    host.apply_state(key, fragment, RestoreOptions::APPEARANCE)
}
