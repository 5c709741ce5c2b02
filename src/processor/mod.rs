pub mod dedup;
pub mod feeder_merge;
pub mod feeder_table;
pub mod header_locator;
pub mod location_matcher;
pub mod main_table;
pub mod port_groups;
pub mod surcharges;

pub use dedup::{dedupe_dominated, keep_last_occurrence};
pub use feeder_merge::{cheapest_per_origin, merge_feeder_rates};
pub use feeder_table::extract_feeder_legs;
pub use header_locator::{find_header_row, find_marker_rows, normalize, resolve_columns};
pub use location_matcher::{LocationIndex, MatchOutcome};
pub use main_table::{extract_rate_legs, find_contract_number};
pub use port_groups::expand_route;
pub use surcharges::{apply_charges, extract_charges};
