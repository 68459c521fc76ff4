use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages the marketplace publishes content in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
}

impl Language {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
        }
    }

    pub const fn other(self) -> Self {
        match self {
            Self::Es => Self::En,
            Self::En => Self::Es,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    /// Accepts region tags such as `es-MX` or `en_US`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.split(['-', '_']).next().unwrap_or("") {
            "es" => Ok(Self::Es),
            "en" => Ok(Self::En),
            _ => Err(format!("Unsupported language: {}", value)),
        }
    }
}

/// Bilingual text stored as `{ "es": ..., "en": ... }` in the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localized {
    #[serde(default)]
    pub es: String,
    #[serde(default)]
    pub en: String,
}

impl Localized {
    pub fn new(es: impl Into<String>, en: impl Into<String>) -> Self {
        Self { es: es.into(), en: en.into() }
    }

    /// Text in `language`, falling back to the other language when the
    /// requested translation is blank.
    pub fn get(&self, language: Language) -> &str {
        let primary = self.raw(language);
        if primary.trim().is_empty() {
            self.raw(language.other())
        } else {
            primary
        }
    }

    pub fn is_empty(&self) -> bool {
        self.es.trim().is_empty() && self.en.trim().is_empty()
    }

    /// Case-insensitive substring match against either translation.
    pub fn contains_ignore_case(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.es.to_lowercase().contains(&needle) || self.en.to_lowercase().contains(&needle)
    }

    fn raw(&self, language: Language) -> &str {
        match language {
            Language::Es => &self.es,
            Language::En => &self.en,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse() {
        assert_eq!("es-MX".parse::<Language>().unwrap(), Language::Es);
        assert_eq!("EN_us".parse::<Language>().unwrap(), Language::En);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_localized_fallback() {
        let title = Localized::new("Cancún todo incluido", "");
        assert_eq!(title.get(Language::En), "Cancún todo incluido");
        assert_eq!(title.get(Language::Es), "Cancún todo incluido");

        let title = Localized::new("Oaxaca", "Oaxaca tour");
        assert_eq!(title.get(Language::En), "Oaxaca tour");
    }

    #[test]
    fn test_localized_missing_field_deserializes() {
        let title: Localized = serde_json::from_str(r#"{"es": "Playa"}"#).unwrap();
        assert_eq!(title.en, "");
        assert_eq!(title.get(Language::En), "Playa");
        assert!(title.contains_ignore_case("PLAY"));
    }
}
