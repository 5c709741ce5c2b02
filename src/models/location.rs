use serde::{Deserialize, Serialize};

/// One entry of the canonical location reference set, loaded once per run
/// and immutable for the run's duration. `code` carries the UN/LOCODE-style
/// port code where the reference set knows one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalLocation {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl CanonicalLocation {
    pub fn new(id: i64, name: &str) -> Self {
        CanonicalLocation {
            id,
            name: name.to_string(),
            code: None,
        }
    }
}
