//! Execution configuration

use serde::{Deserialize, Serialize};

/// Where the driver should connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectTarget {
    /// A named local database
    Database(String),
    /// The configured cloud instance
    Cloud,
}

/// Per-execution options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOptions {
    /// Rewrite UPDATE statement text for cross-dialect engines.
    /// Argument lists are never touched.
    #[serde(default)]
    pub cross_update: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_deserializes() {
        let t: ConnectTarget = serde_json::from_str(r#"{"database":"ventas"}"#).unwrap();
        assert_eq!(t, ConnectTarget::Database("ventas".into()));
        let t: ConnectTarget = serde_json::from_str(r#""cloud""#).unwrap();
        assert_eq!(t, ConnectTarget::Cloud);
    }

    #[test]
    fn test_options_default_off() {
        let opts: ExecOptions = serde_json::from_str("{}").unwrap();
        assert!(!opts.cross_update);
    }
}
