#![allow(non_snake_case)]

// Base
pub mod error;
pub mod config;
pub mod metrics;
pub mod logger;

// Scene graph seam + in-memory host
pub mod host;   // src/host/{mod,memory,scene,task}.rs
pub mod kind;
pub mod fragment;

// Capture / restore layers
pub mod snapshot; // src/snapshot/{mod,leaf,set,collection}.rs
pub mod swap;     // src/swap/{mod,manager,controls,busy}.rs

pub use config::{AdvanceFailurePolicy, RestoreMode, SwapBuilder, SwapConfig};
pub use error::{ErrorKind, SwapError, SwapResult};
pub use fragment::Fragment;
pub use host::{
    ComponentInfo, ComponentKey, CreateTask, EntityHandle, Host, MemoryHost, NodeId, RestoreOptions,
};
pub use kind::ComponentKind;
pub use logger::SwapLog;
pub use snapshot::{Snapshot, SnapshotCollection, SnapshotSet};
pub use swap::{ControlEvent, SwapControls, SwapManager, SwapOptions};
