//! The seventeen locales a string table can be built for.
//!
//! Numeric codes are stored in the binary header and must stay stable.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    EnglishUs,
    ChineseSimplified,
    ChineseTraditional,
    Czech,
    Danish,
    Dutch,
    Finnish,
    French,
    German,
    Italian,
    Japanese,
    Korean,
    Norwegian,
    Polish,
    PortugueseBrazil,
    Russian,
    SpanishSpain,
}

impl Language {
    /// Every locale, ordered by numeric code.
    pub const ALL: [Language; 17] = [
        Language::EnglishUs,
        Language::ChineseSimplified,
        Language::ChineseTraditional,
        Language::Czech,
        Language::Danish,
        Language::Dutch,
        Language::Finnish,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Japanese,
        Language::Korean,
        Language::Norwegian,
        Language::Polish,
        Language::PortugueseBrazil,
        Language::Russian,
        Language::SpanishSpain,
    ];

    /// The code written into the binary header.
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// BCP-47 tag for this locale.
    pub fn tag(self) -> &'static str {
        match self {
            Language::EnglishUs => "en-US",
            Language::ChineseSimplified => "zh-CN",
            Language::ChineseTraditional => "zh-TW",
            Language::Czech => "cs-CZ",
            Language::Danish => "da-DK",
            Language::Dutch => "nl-NL",
            Language::Finnish => "fi-FI",
            Language::French => "fr-FR",
            Language::German => "de-DE",
            Language::Italian => "it-IT",
            Language::Japanese => "ja-JP",
            Language::Korean => "ko-KR",
            Language::Norwegian => "nb-NO",
            Language::Polish => "pl-PL",
            Language::PortugueseBrazil => "pt-BR",
            Language::Russian => "ru-RU",
            Language::SpanishSpain => "es-ES",
        }
    }

    fn from_identifier(id: &LanguageIdentifier) -> Option<Self> {
        let region = id.region.as_ref().map(|r| r.as_str());
        let script = id.script.as_ref().map(|s| s.as_str());
        let language = match id.language.as_str() {
            "en" => Language::EnglishUs,
            "zh" => match (script, region) {
                (Some("Hant"), _) | (_, Some("TW" | "HK" | "MO")) => Language::ChineseTraditional,
                _ => Language::ChineseSimplified,
            },
            "cs" => Language::Czech,
            "da" => Language::Danish,
            "nl" => Language::Dutch,
            "fi" => Language::Finnish,
            "fr" => Language::French,
            "de" => Language::German,
            "it" => Language::Italian,
            "ja" => Language::Japanese,
            "ko" => Language::Korean,
            "nb" | "no" | "nn" => Language::Norwegian,
            "pl" => Language::Polish,
            "pt" => Language::PortugueseBrazil,
            "ru" => Language::Russian,
            "es" => Language::SpanishSpain,
            _ => return None,
        };
        Some(language)
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Accepts BCP-47 tags (`fr`, `zh-Hant`, `pt_BR`) or a bare numeric code.
impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<u16>() {
            return Language::from_code(code).ok_or_else(|| Error::UnknownLanguage(s.to_string()));
        }
        let id: LanguageIdentifier = trimmed
            .replace('_', "-")
            .parse()
            .map_err(|_| Error::UnknownLanguage(s.to_string()))?;
        Language::from_identifier(&id).ok_or_else(|| Error::UnknownLanguage(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_dense_and_stable() {
        for (i, language) in Language::ALL.iter().enumerate() {
            assert_eq!(usize::from(language.code()), i);
            assert_eq!(Language::from_code(language.code()), Some(*language));
        }
        assert_eq!(Language::from_code(17), None);
        assert_eq!(Language::Russian.code(), 15);
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!("en".parse::<Language>().unwrap(), Language::EnglishUs);
        assert_eq!("fr-FR".parse::<Language>().unwrap(), Language::French);
        assert_eq!("pt_BR".parse::<Language>().unwrap(), Language::PortugueseBrazil);
        assert_eq!("zh-Hant".parse::<Language>().unwrap(), Language::ChineseTraditional);
        assert_eq!("zh-TW".parse::<Language>().unwrap(), Language::ChineseTraditional);
        assert_eq!("zh".parse::<Language>().unwrap(), Language::ChineseSimplified);
        assert_eq!("no".parse::<Language>().unwrap(), Language::Norwegian);
        assert_eq!("10".parse::<Language>().unwrap(), Language::Japanese);
    }

    #[test]
    fn test_parse_unknown() {
        assert!("tlh".parse::<Language>().is_err());
        assert!("99".parse::<Language>().is_err());
        assert!("".parse::<Language>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for language in Language::ALL {
            assert_eq!(language.to_string().parse::<Language>().unwrap(), language);
        }
    }
}
