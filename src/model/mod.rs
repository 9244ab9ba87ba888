//! Data model shared by the worksheet reader, the resolver and the renderers.
//!
//! Rows and assets are parsed fresh on every run; the mapping types are the
//! only product a resolution pass hands back to callers.

mod anchor;
mod asset;
mod mapping;
mod survey;

pub use anchor::*;
pub use asset::*;
pub use mapping::*;
pub use survey::*;
