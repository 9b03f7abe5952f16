//! Backend configuration
//!
//! A small settings record, loadable from TOML. Every knob defaults to
//! the production configuration; TOML files and builder calls override
//! individual fields.

use serde::Deserialize;

/// Settings recognized by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Run push commutation, dead-branch elimination and the
    /// `has_case_tag` recompute.
    pub commute_pushes: bool,
    /// Print measurements and the program around each pass.
    pub dump: bool,
    /// Trace interpreter runs in the differential tester.
    pub trace: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            commute_pushes: true,
            dump: false,
            trace: false,
        }
    }
}

impl Settings {
    pub fn new() -> Settings {
        Settings::default()
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Settings, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse settings: {}", e))
    }

    pub fn with_commute_pushes(mut self, on: bool) -> Settings {
        self.commute_pushes = on;
        self
    }

    pub fn with_dump(mut self, on: bool) -> Settings {
        self.dump = on;
        self
    }

    pub fn with_trace(mut self, on: bool) -> Settings {
        self.trace = on;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::new();
        assert!(s.commute_pushes);
        assert!(!s.dump);
        assert!(!s.trace);
    }

    #[test]
    fn test_from_toml_overrides() {
        let s = Settings::from_toml("commute_pushes = false\ndump = true\n").unwrap();
        assert!(!s.commute_pushes);
        assert!(s.dump);
        assert!(!s.trace);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        assert!(Settings::from_toml("verbosity = 3\n").is_err());
    }

    #[test]
    fn test_builder() {
        let s = Settings::new().with_commute_pushes(false).with_trace(true);
        assert!(!s.commute_pushes);
        assert!(s.trace);
    }
}
