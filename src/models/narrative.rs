use serde::{Deserialize, Serialize};

/// Display-ready handoff summary, one field per UI section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NarrativeRecord {
    /// 1-2 line patient snapshot.
    #[serde(default)]
    pub patient_overview: String,
    #[serde(default)]
    pub medications: Vec<String>,
    /// "[SEVERITY] type: reason, action", one per alert.
    #[serde(default)]
    pub risk_alerts: Vec<String>,
    #[serde(default)]
    pub missing_info: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
}

impl NarrativeRecord {
    pub const APOLOGY: &'static str = "Summary generate nahi ho paya.";

    pub fn apology() -> Self {
        Self {
            patient_overview: Self::APOLOGY.into(),
            ..Self::default()
        }
    }
}
