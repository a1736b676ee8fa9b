//! Library-wide maintenance engines that run after ingest: face identity
//! re-clustering and timezone gap backfill.

pub mod recluster;
pub mod timezone;

pub use recluster::{recluster_faces, ClusterReport};
pub use timezone::{fill_timezone_gaps, BackfillReport};
