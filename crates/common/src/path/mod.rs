pub mod component;

pub use component::{validate_component, ComponentError};
