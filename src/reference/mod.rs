pub mod context;
pub mod sources;

pub use context::{LookupContext, ServiceDirectory};
pub use sources::{JsonFileSource, LocationSource, ServiceRoute, ServiceSource, StaticSource};
