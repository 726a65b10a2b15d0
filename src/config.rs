//! Configuration schema and loading.
//!
//! Settings come from an optional TOML file plus `ASTORIA__` environment
//! overrides, layered over the struct defaults.

mod load;
mod schema;

pub use load::resolve_config_path;
pub use schema::*;
