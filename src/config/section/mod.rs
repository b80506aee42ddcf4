//! Configuration section definitions.
//!
//! Each module corresponds to a section in `waymark.toml`:
//!
//! | Module     | TOML Section   | Purpose                                   |
//! |------------|----------------|-------------------------------------------|
//! | `resolver` | `[resolver]`   | Search path, namespace mangling, aliases  |
//! | `mapping`  | `[mapping]`    | Rewrite rule sources                      |
//! | `store`    | `[store]`      | Workspace snapshots                       |

mod mapping;
mod resolver;
mod store;

pub use mapping::{MappingConfig, PropertyNames};
pub use resolver::ResolverConfig;
pub use store::StoreConfig;
