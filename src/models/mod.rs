pub mod alert;
pub mod process;
pub mod tracking;

pub use alert::{AlertEvent, AlertResolved, Severity};
pub use process::ProcessSample;
pub use tracking::{TrackingEntry, TrackingTable};
