// noteedit-common: shared types and wire protocol for the noteedit workspace

pub mod path;
pub mod protocol;
pub mod types;
