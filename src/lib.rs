mod archetype;
mod bundle;
mod component;
mod config;
mod engine;
mod entity;
mod error;
mod filter;
mod lookup;
mod snapshot;

pub use archetype::{Archetype, ArchetypeID, ArchetypeManager, ArchetypeRegistry, ArchetypeSet};
pub use bundle::{ComponentSet, IntoComponents};
pub use component::storage::{Column, ColumnStore, ErasedColumnStore};
pub use component::{Component, ComponentBox, ComponentID, ComponentRegistry, INVALID_COMPONENT};
pub use config::{EngineConfig, DEFAULT_HOLE_THRESHOLD};
pub use engine::ArchetypeEngine;
pub use entity::{Entity, INVALID_ENTITY};
pub use error::{EngineError, EngineResult};
pub use filter::filter_archetypes;
pub use lookup::LookupList;
pub use snapshot::{EntityRef, EntityRefMut, EntitySnapshot};
