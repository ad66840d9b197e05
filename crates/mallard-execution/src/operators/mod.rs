//! Concrete operators
//!
//! A small taxonomy, enough to assemble real pipelines: a collection
//! scan source, filter / projection / limit operators, and a collector
//! sink.

pub mod collect;
pub mod filter;
pub mod limit;
pub mod projection;
pub mod scan;

pub use collect::{CollectorSink, CollectorSinkState};
pub use filter::FilterOperator;
pub use limit::LimitOperator;
pub use projection::ProjectionOperator;
pub use scan::CollectionScan;
