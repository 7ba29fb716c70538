//! Persistence of calculated power positions.
//!
//! Positions are written as small CSV files, one per tick, named after the
//! local time of the tick.

pub mod csv;
pub mod error;
pub mod sink;

pub use csv::{file_name, hour_label, CsvPositionWriter};
pub use error::{PersistenceError, PersistenceResult};
pub use sink::{BoxFuture, PositionSink};
