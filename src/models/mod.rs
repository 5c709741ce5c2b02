pub mod location;
pub mod rates;

pub use location::CanonicalLocation;
pub use rates::{
    ContainerRates, ContainerSize, FeederLeg, LegFlags, MaintenanceCharge, RateLeg, RouteKey,
};
