//! JSON scene format for [`MemoryHost`](super::MemoryHost).
//!
//! {
//!   "entities": [
//!     {"id": "Person", "type": "Person",
//!      "components": [{"kind": "geometry", "name": "geometry", "store_id": "geometry",
//!                      "locked": false, "state": {"character": "Female 1"}}],
//!      "children": [{"id": "hair", "components": [..], "children": [..]}]}
//!   ]
//! }

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::fragment::Fragment;
use crate::kind::ComponentKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    pub entities: Vec<SceneNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<SceneComponent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneComponent {
    pub kind: ComponentKind,
    pub name: String,
    pub store_id: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub state: Fragment,
}

impl Scene {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("parse scene JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("parse scene {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self).context("serialize scene")?;
        fs::write(path, data).with_context(|| format!("write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Host, MemoryHost};

    #[test]
    fn scene_loads_into_memory_host() {
        let scene = Scene::from_json(
            r#"{"entities":[{"id":"P","type":"Person",
                "components":[{"kind":"geometry","name":"geometry","store_id":"geometry","state":{"character":"A"}}],
                "children":[{"id":"hair","components":[{"kind":"hair_group","name":"Scalp","store_id":"scalp"}]}]}]}"#,
        )
        .unwrap();
        let host = MemoryHost::from_scene(&scene).unwrap();
        let root = host.resolve_entity("P").unwrap();
        assert_eq!(host.enumerate_descendants(root, ComponentKind::HairGroup).len(), 1);

        let back = host.to_scene();
        assert_eq!(back.entities.len(), 1);
        assert_eq!(back.entities[0].children[0].id, "hair");
    }
}
