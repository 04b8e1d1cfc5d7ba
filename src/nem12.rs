// NEM12 module
//
// Parses NEM12 interval-meter exports into a canonical per-interval store.
// A NEM12 file is a delimited flat file whose first field is the record type:
// - 100: header
// - 200: NMI data details (NMI, channel, interval length)
// - 300: interval data for one day
// - 400/500: events and B2B details (not interpreted)
// - 900: end of data

pub mod error;
pub mod reader;
pub mod store;

pub use error::Nem12Error;
pub use reader::{detect_delimiter_in, find_quality_flag_index, Nem12Reader, ParsedFile};
pub use store::{resolve, CellLocation, IntervalKey, IntervalStore, IntervalValue};
