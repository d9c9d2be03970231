// Supported languages and country-aware ordering

/// Auto-detect pseudo language
pub const AUTO_DETECT: &str = "auto";

pub const ENGLISH: &str = "English";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub value: &'static str,
    pub label: &'static str,
}

const fn lang(value: &'static str, label: &'static str) -> Language {
    Language { value, label }
}

pub const SUPPORTED_LANGUAGES: [Language; 24] = [
    lang(AUTO_DETECT, "Auto-Detect"),
    lang("Afrikaans", "Afrikaans"),
    lang("Chinese", "Chinese"),
    lang("Danish", "Danish"),
    lang("Dutch", "Dutch"),
    lang(ENGLISH, "English"),
    lang("French", "French"),
    lang("German", "German"),
    lang("Hindi", "Hindi"),
    lang("Indonesian", "Indonesian"),
    lang("Italian", "Italian"),
    lang("Japanese", "Japanese"),
    lang("Malay", "Malay"),
    lang("Norwegian", "Norwegian"),
    lang("Polish", "Polish"),
    lang("Portuguese", "Portuguese"),
    lang("Romanian", "Romanian"),
    lang("Russian", "Russian"),
    lang("Spanish", "Spanish"),
    lang("Swedish", "Swedish"),
    lang("Tagalog", "Tagalog"),
    lang("Turkish", "Turkish"),
    lang("Ukrainian", "Ukrainian"),
    lang("Vietnamese", "Vietnamese"),
];

/// Paraphrasing styles as `(value, label)`
pub const PARAPHRASE_STYLES: [(&str, &str); 5] = [
    ("standard", "Standard"),
    ("formal", "Formal"),
    ("academic", "Academic"),
    ("casual", "Casual"),
    ("creative", "Creative"),
];

/// ISO country code to the language shown first for that country
const COUNTRY_LANGUAGE_MAP: [(&str, &str); 22] = [
    ("ZA", "Afrikaans"),
    ("CN", "Chinese"),
    ("DK", "Danish"),
    ("NL", "Dutch"),
    ("FR", "French"),
    ("DE", "German"),
    ("IN", "Hindi"),
    ("ID", "Indonesian"),
    ("IT", "Italian"),
    ("JP", "Japanese"),
    ("MY", "Malay"),
    ("NO", "Norwegian"),
    ("PL", "Polish"),
    ("PT", "Portuguese"),
    ("RO", "Romanian"),
    ("RU", "Russian"),
    ("ES", "Spanish"),
    ("SE", "Swedish"),
    ("PH", "Tagalog"),
    ("TR", "Turkish"),
    ("UA", "Ukrainian"),
    ("VN", "Vietnamese"),
];

/// Number of columns the language picker is laid out in
pub const LANGUAGE_COLUMNS: usize = 3;

pub fn find_language(value: &str) -> Option<Language> {
    SUPPORTED_LANGUAGES
        .iter()
        .copied()
        .find(|l| l.value.eq_ignore_ascii_case(value))
}

pub fn preferred_language(country_code: &str) -> Option<&'static str> {
    COUNTRY_LANGUAGE_MAP
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(country_code))
        .map(|(_, language)| *language)
}

/// Languages in display priority: auto-detect, the country's language (if
/// mapped), English, then the rest in declaration order
pub fn prioritized_languages(country_code: &str) -> Vec<Language> {
    let preferred = preferred_language(country_code).and_then(find_language);

    let mut ordered = Vec::with_capacity(SUPPORTED_LANGUAGES.len());
    ordered.push(SUPPORTED_LANGUAGES[0]);
    ordered.extend(preferred);
    ordered.extend(find_language(ENGLISH));
    ordered.extend(SUPPORTED_LANGUAGES.iter().copied().filter(|l| {
        l.value != AUTO_DETECT && l.value != ENGLISH && Some(*l) != preferred
    }));
    ordered
}

/// Reorder a list so that, rendered row by row into `columns` columns, it
/// reads top to bottom within each column
pub fn layout_in_columns<T: Copy>(items: &[T], columns: usize) -> Vec<T> {
    if columns == 0 || items.is_empty() {
        return items.to_vec();
    }

    let column_length = items.len().div_ceil(columns);
    let mut laid_out = Vec::with_capacity(items.len());
    for row in 0..column_length {
        for column in 0..columns {
            if let Some(item) = items.get(row + column * column_length) {
                laid_out.push(*item);
            }
        }
    }
    laid_out
}

/// Languages ready for the three-column picker
pub fn ordered_languages(country_code: &str) -> Vec<Language> {
    layout_in_columns(&prioritized_languages(country_code), LANGUAGE_COLUMNS)
}

pub fn is_supported_style(style: &str) -> bool {
    PARAPHRASE_STYLES.iter().any(|(value, _)| *value == style)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(languages: &[Language]) -> Vec<&'static str> {
        languages.iter().map(|l| l.value).collect()
    }

    #[test]
    fn test_priority_with_mapped_country() {
        let ordered = prioritized_languages("FR");
        assert_eq!(&values(&ordered)[..4], ["auto", "French", "English", "Afrikaans"]);
        assert_eq!(ordered.len(), SUPPORTED_LANGUAGES.len());
        assert_eq!(values(&ordered).iter().filter(|v| **v == "French").count(), 1);
    }

    #[test]
    fn test_priority_with_unmapped_country() {
        let ordered = prioritized_languages("US");
        assert_eq!(&values(&ordered)[..3], ["auto", "English", "Afrikaans"]);
        assert_eq!(ordered.len(), SUPPORTED_LANGUAGES.len());
    }

    #[test]
    fn test_country_code_is_case_insensitive() {
        assert_eq!(preferred_language("jp"), Some("Japanese"));
        assert_eq!(preferred_language(""), None);
    }

    #[test]
    fn test_layout_in_columns() {
        let items: Vec<u32> = (1..=7).collect();
        // Columns: [1,2,3] [4,5,6] [7]
        assert_eq!(layout_in_columns(&items, 3), vec![1, 4, 7, 2, 5, 3, 6]);
        assert_eq!(layout_in_columns(&items, 1), items);
        assert!(layout_in_columns::<u32>(&[], 3).is_empty());
    }

    #[test]
    fn test_ordered_languages_keeps_every_language() {
        let ordered = ordered_languages("DE");
        assert_eq!(ordered.len(), SUPPORTED_LANGUAGES.len());
        // 24 languages, 8 per column: row one holds the heads of each column
        assert_eq!(values(&ordered)[..3], ["auto", "Hindi", "Romanian"]);
        assert_eq!(values(&ordered)[3..6], ["German", "Indonesian", "Russian"]);
    }

    #[test]
    fn test_styles() {
        assert!(is_supported_style("academic"));
        assert!(!is_supported_style("pirate"));
    }
}
