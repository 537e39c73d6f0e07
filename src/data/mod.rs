//! Upstream data: ADEME client, record normalization, bulk export.

pub mod ademe;
pub mod bulk;
pub mod normalize;

pub use ademe::{AdemeClient, DpeQuery, DpeSource, fetch_or_empty, parse_lines_body};
pub use bulk::{BulkExporter, BulkReport};
pub use normalize::normalize_record;
