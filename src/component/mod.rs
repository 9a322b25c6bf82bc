mod component;
pub mod storage;
mod value;

pub use component::{Component, ComponentID, ComponentRegistry, INVALID_COMPONENT};
pub use value::ComponentBox;
