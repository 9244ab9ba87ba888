//! XLSX worksheet and drawing readers.
//!
//! The worksheet reader turns the first sheet into [`SurveyRow`]s keyed by
//! their physical row; the drawing reader recovers the cell anchors of the
//! pictures placed on that sheet.
//!
//! # Example
//!
//! ```no_run
//! use surveypix::container::SpreadsheetArchive;
//! use surveypix::xlsx::{RowLayout, SurveySheetReader};
//!
//! let archive = SpreadsheetArchive::open("survey.xlsx")?;
//! let rows = SurveySheetReader::open(&archive)?.read_rows(&RowLayout::default())?;
//!
//! for row in &rows {
//!     println!("{} on row {}", row.id, row.physical_row);
//! }
//! # Ok::<(), surveypix::Error>(())
//! ```
//!
//! [`SurveyRow`]: crate::model::SurveyRow

mod cell_ref;
mod drawing;
mod parser;
mod shared_strings;

pub use cell_ref::{column_index, column_letter, split_cell_ref};
pub use drawing::{parse_drawing, DrawingAnchor};
pub use parser::{RowLayout, SurveySheetReader};
