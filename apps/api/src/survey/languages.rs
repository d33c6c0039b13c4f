//! Language catalog — the fixed set of survey languages.
//!
//! `code` is sent verbatim to the LLM as the response language and doubles as
//! the stable identifier. `name` is the native display name.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

const fn lang(code: &'static str, name: &'static str) -> Language {
    Language { code, name }
}

pub const LANGUAGES: &[Language] = &[
    lang("English", "English"),
    lang("Spanish", "Español"),
    lang("French", "Français"),
    lang("German", "Deutsch"),
    lang("Mandarin Chinese", "中文 (普通话)"),
    lang("Hindi", "हिन्दी"),
    lang("Arabic", "العربية"),
    lang("Portuguese", "Português"),
    lang("Bengali", "বাংলা"),
    lang("Russian", "Русский"),
    lang("Japanese", "日本語"),
    lang("Punjabi", "ਪੰਜਾਬੀ"),
    lang("Korean", "한국어"),
    lang("Vietnamese", "Tiếng Việt"),
    lang("Telugu", "తెలుగు"),
    lang("Marathi", "मराठी"),
    lang("Turkish", "Türkçe"),
    lang("Tamil", "தமிழ்"),
    lang("Italian", "Italiano"),
    lang("Urdu", "اردو"),
    lang("Persian", "فارسی"),
    lang("Gujarati", "ગુજરાતી"),
    lang("Polish", "Polski"),
    lang("Ukrainian", "Українська"),
    lang("Malayalam", "മലയാളം"),
    lang("Kannada", "ಕನ್ನಡ"),
    lang("Thai", "ไทย"),
    lang("Dutch", "Nederlands"),
    lang("Greek", "Ελληνικά"),
    lang("Czech", "Čeština"),
    lang("Swedish", "Svenska"),
    lang("Romanian", "Română"),
    lang("Hungarian", "Magyar"),
    lang("Hebrew", "עברית"),
    lang("Indonesian", "Bahasa Indonesia"),
];

/// Returns the entries whose display name or code contains `term`,
/// case-insensitively, in table order. Only an empty term returns everything;
/// whitespace is matched like any other character.
pub fn filter(term: &str) -> Vec<Language> {
    if term.is_empty() {
        return LANGUAGES.to_vec();
    }
    let needle = term.to_lowercase();

    LANGUAGES
        .iter()
        .filter(|l| l.name.to_lowercase().contains(&needle) || l.code.to_lowercase().contains(&needle))
        .copied()
        .collect()
}

/// Exact lookup by code.
pub fn find(code: &str) -> Option<Language> {
    LANGUAGES.iter().find(|l| l.code == code).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_fra_matches_french_only() {
        let result = filter("fra");
        assert_eq!(result, vec![lang("French", "Français")]);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        assert_eq!(filter("GERMAN"), vec![lang("German", "Deutsch")]);
        assert_eq!(filter("deutsch"), vec![lang("German", "Deutsch")]);
    }

    #[test]
    fn test_filter_matches_native_name() {
        let result = filter("русск");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].code, "Russian");
    }

    #[test]
    fn test_filter_empty_term_returns_all_in_order() {
        let all = filter("");
        assert_eq!(all.len(), LANGUAGES.len());
        assert_eq!(all.first().map(|l| l.code), Some("English"));
        assert_eq!(all.last().map(|l| l.code), Some("Indonesian"));
    }

    #[test]
    fn test_filter_whitespace_is_a_literal_substring() {
        let codes: Vec<_> = filter(" ").iter().map(|l| l.code).collect();
        assert_eq!(codes, vec!["Mandarin Chinese", "Vietnamese", "Indonesian"]);
        assert!(filter("fra ").is_empty());
    }

    #[test]
    fn test_filter_preserves_table_order() {
        // "an" hits German, Persian, Italian (code) and others; order must follow the table
        let codes: Vec<_> = filter("an").iter().map(|l| l.code).collect();
        let positions: Vec<_> = codes
            .iter()
            .map(|c| LANGUAGES.iter().position(|l| l.code == *c).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
        assert!(codes.contains(&"German"));
    }

    #[test]
    fn test_filter_no_match() {
        assert!(filter("klingon").is_empty());
    }

    #[test]
    fn test_find_by_code() {
        assert_eq!(find("Japanese").map(|l| l.name), Some("日本語"));
        assert!(find("japanese").is_none());
    }

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<_> = LANGUAGES.iter().map(|l| l.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), LANGUAGES.len());
    }
}
