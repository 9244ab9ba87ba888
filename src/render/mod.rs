//! Output rendering for resolutions.
//!
//! A [`Resolution`](crate::model::Resolution) renders to the JSON mapping
//! document or to a plain-text summary table.
//!
//! # Example
//!
//! ```no_run
//! use surveypix::render::{to_json, to_summary, JsonFormat};
//! use surveypix::resolve::ResolverConfig;
//!
//! let resolution = surveypix::resolve_file(&ResolverConfig::new("survey.xlsx"))?;
//!
//! println!("{}", to_summary(&resolution));
//! std::fs::write("mapping.json", to_json(&resolution, JsonFormat::Pretty)?)?;
//! # Ok::<(), surveypix::Error>(())
//! ```

mod json;
mod text;

pub use json::{to_json, write_json, JsonFormat};
pub use text::to_summary;
