//! Sweep ingestion
//!
//! Typed model of an uploaded sweep plus the text export parser and writer.

pub mod model;
pub mod parser;
pub mod writer;

pub use model::{Band, Channel, Location, Measurement};
pub use parser::{ParseWarning, ParsedSweep, SweepParser};
pub use writer::SweepWriter;
