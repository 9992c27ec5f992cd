//! Region names and their two spellings
//!
//! Cloud providers name regions with dashes (`us-east-1`), but a dash is not
//! valid inside a SQLite schema identifier. Everywhere inside cloudq a region
//! therefore uses underscores (`us_east_1`); the dashed form only appears at
//! the provider-API boundary.

use std::fmt;

/// A provider region in its normalized (underscore) spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region(String);

impl Region {
    /// Create a region from either spelling; stores the normalized form.
    pub fn new(name: &str) -> Self {
        Region(name.replace('-', "_"))
    }

    /// The normalized name, usable as a SQLite schema identifier.
    pub fn schema_name(&self) -> &str {
        &self.0
    }

    /// The dashed name the provider SDK expects.
    pub fn provider_name(&self) -> String {
        self.0.replace('_', "-")
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
