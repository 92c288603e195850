pub mod report;
pub mod timestamp;
pub mod visit;

pub use report::{IpVisitSummary, UrlAccumulator};
pub use timestamp::parse_log_timestamp;
pub use visit::{ModelError, VisitRecord};
