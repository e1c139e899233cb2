//! Core domain types for the lawsite pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Jurisdiction
// ---------------------------------------------------------------------------

/// A tribal-law content partner resolved from the dependency declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jurisdiction {
    /// Partner organization slug (directory name under the library root).
    pub org: String,
    /// URL path segment disambiguating this partner's top-level content
    /// (e.g. `us/nsn/san-ildefonso/council`).
    pub namespace: String,
}

// ---------------------------------------------------------------------------
// Tribe configuration
// ---------------------------------------------------------------------------

/// Per-domain template variables, loaded once per run from `tribes.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TribeConfig {
    /// The tribe's own website.
    #[serde(rename = "official-site")]
    pub official_site: String,
    /// The tribe's page on the NILL site.
    #[serde(rename = "tribes-nill-page")]
    pub tribes_nill_page: String,
    /// Full display name.
    #[serde(rename = "tribe-full-name")]
    pub tribe_full_name: String,
    /// Short name.
    pub tribe: String,
}

/// The `tribes.json` lookup table, keyed by canonical domain name.
pub type TribesTable = BTreeMap<String, TribeConfig>;

// ---------------------------------------------------------------------------
// State envelope
// ---------------------------------------------------------------------------

/// The JSON object each stage reads from stdin.
///
/// `state` is an opaque pass-through owned by the update-framework runner;
/// `config` is optional runner-supplied configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEnvelope {
    /// Opaque runner state, echoed back on success.
    #[serde(default)]
    pub state: serde_json::Value,
    /// Optional runner configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl Default for StateEnvelope {
    fn default() -> Self {
        Self {
            state: serde_json::Value::Null,
            config: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger entry
// ---------------------------------------------------------------------------

/// One persisted record in the processing ledger, keyed by
/// `<namespace>/<content-type>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Revision identifier of the last successfully processed source.
    pub last_validated_commit: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tribe_config_uses_kebab_keys() {
        let json = r#"{
            "official-site": "https://sanipueblo.example",
            "tribes-nill-page": "https://narf.example/nill/tribes/sanipueblo.html",
            "tribe-full-name": "Pueblo de San Ildefonso",
            "tribe": "San Ildefonso"
        }"#;
        let config: TribeConfig = serde_json::from_str(json).expect("deserialize");
        assert_eq!(config.tribe_full_name, "Pueblo de San Ildefonso");

        let back = serde_json::to_string(&config).expect("serialize");
        assert!(back.contains("\"official-site\""));
        assert!(back.contains("\"tribes-nill-page\""));
    }

    #[test]
    fn envelope_state_is_optional() {
        let envelope: StateEnvelope = serde_json::from_str("{}").expect("deserialize");
        assert!(envelope.state.is_null());
        assert!(envelope.config.is_none());

        let envelope: StateEnvelope =
            serde_json::from_str(r#"{"state": {"run": 3}, "config": {}}"#).expect("deserialize");
        assert_eq!(envelope.state["run"], 3);
        assert!(envelope.config.is_some());
    }

    #[test]
    fn ledger_entry_roundtrip() {
        let entry = LedgerEntry {
            last_validated_commit: "abc123".into(),
        };
        let json = serde_json::to_string(&entry).expect("serialize");
        assert!(json.contains("last_validated_commit"));
        let parsed: LedgerEntry = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, entry);
    }
}
