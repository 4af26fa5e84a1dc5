// src/config.rs

//! Backend configuration
//!
//! Everything else lives in the database; this only says where the database
//! is and which architecture the system runs.

/// Default database location
pub const DEFAULT_DB_PATH: &str = "/var/lib/conary/conary.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub db_path: String,
    /// Architecture used to pick compatible flavors
    pub system_arch: String,
}

impl BackendConfig {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            system_arch: std::env::consts::ARCH.to_string(),
        }
    }

    pub fn with_arch(mut self, system_arch: impl Into<String>) -> Self {
        self.system_arch = system_arch.into();
        self
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DB_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.db_path, DEFAULT_DB_PATH);
        assert_eq!(config.system_arch, std::env::consts::ARCH);

        let config = BackendConfig::new("/tmp/test.db").with_arch("x86");
        assert_eq!(config.system_arch, "x86");
    }
}
