pub mod variant;

pub use variant::{ColumnRole, RoleSpec, VariantConfig};
