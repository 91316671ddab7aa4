//! Branch decision boundaries (§4.9, §6.3 `thresholds.*`).

#[derive(Debug, Clone, Copy)]
pub struct ThresholdsConfig {
    /// `T_proceed` — top_confidence at or above this yields `proceed`.
    pub proceed: f32,
    /// `T_low` — top_confidence at or above this (but below `proceed`)
    /// yields `low_confidence`.
    pub low_confidence: f32,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            proceed: 0.60,
            low_confidence: 0.45,
        }
    }
}

impl ThresholdsConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = std::env::var("THRESHOLD_PROCEED")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.proceed = v;
        }
        if let Some(v) = std::env::var("THRESHOLD_LOW_CONFIDENCE")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.low_confidence = v;
        }
        config
    }
}
