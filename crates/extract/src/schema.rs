use serde::{Deserialize, Serialize};

/// One character as extracted from a batched analysis response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub name: String,
    pub dialogs: Vec<String>,
    pub traits: Vec<String>,
    pub voice_encoding: String,
}

impl EntityRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Decode the positional voice string, if one was given
    pub fn voice_profile(&self) -> Option<VoiceProfile> {
        VoiceProfile::decode(&self.voice_encoding)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogAttribution {
    pub speaker: String,
    pub text: String,
}

impl DialogAttribution {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

/// TTS casting parameters decoded from `"Gender,Age,Accent,Pitch,Speed"`.
///
/// Positions missing from the source string stay `None` so callers can tell
/// "not provided" apart from "provided".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub gender: Option<String>,
    pub age_band: Option<String>,
    pub accent: Option<String>,
    pub pitch: Option<f64>,
    pub speed: Option<f64>,
}

impl VoiceProfile {
    /// Multiplier used when a pitch/speed position holds something that is not a number
    pub const NEUTRAL_RATE: f64 = 1.0;

    pub fn decode(encoding: &str) -> Option<Self> {
        if encoding.trim().is_empty() {
            return None;
        }

        let parts: Vec<&str> = encoding.split(',').map(str::trim).collect();
        let text = |idx: usize| {
            parts
                .get(idx)
                .filter(|p| !p.is_empty())
                .map(|p| p.to_lowercase())
        };
        let rate = |idx: usize| {
            parts
                .get(idx)
                .map(|p| p.parse::<f64>().unwrap_or(Self::NEUTRAL_RATE))
        };

        Some(Self {
            gender: text(0),
            age_band: text(1),
            accent: text(2),
            pitch: rate(3),
            speed: rate(4),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_voice_encoding() {
        let profile = VoiceProfile::decode("Male, Young ,neutral,1.0,1.2").unwrap();

        assert_eq!(profile.gender.as_deref(), Some("male"));
        assert_eq!(profile.age_band.as_deref(), Some("young"));
        assert_eq!(profile.accent.as_deref(), Some("neutral"));
        assert_eq!(profile.pitch, Some(1.0));
        assert_eq!(profile.speed, Some(1.2));
    }

    #[test]
    fn test_partial_encoding_leaves_fields_unset() {
        let profile = VoiceProfile::decode("female,elderly").unwrap();

        assert_eq!(profile.gender.as_deref(), Some("female"));
        assert_eq!(profile.age_band.as_deref(), Some("elderly"));
        assert_eq!(profile.accent, None);
        assert_eq!(profile.pitch, None);
        assert_eq!(profile.speed, None);
    }

    #[test]
    fn test_non_numeric_rate_is_neutral() {
        let profile = VoiceProfile::decode("male,young,british,high,fast").unwrap();

        assert_eq!(profile.pitch, Some(1.0));
        assert_eq!(profile.speed, Some(1.0));
    }

    #[test]
    fn test_blank_encoding() {
        assert!(VoiceProfile::decode("").is_none());
        assert!(VoiceProfile::decode("   ").is_none());
        assert!(EntityRecord::new("Mira").voice_profile().is_none());
    }
}
