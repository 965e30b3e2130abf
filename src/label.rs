use crate::model::LanguageSpecificText;

/// The store carries at most this many language slots per text column group.
pub const LANGUAGE_SLOTS: usize = 3;

/// Pairs stored text columns with the survey languages by position.
///
/// The first column belongs to the first language, the second column to the
/// second language and so on. Null or empty columns yield no entry, pairing
/// stops as soon as either side runs out, and at most [`LANGUAGE_SLOTS`]
/// entries are ever produced.
pub fn resolve_labels<S: AsRef<str>>(
    columns: &[Option<String>],
    languages: &[S],
) -> Vec<LanguageSpecificText> {
    columns
        .iter()
        .zip(languages.iter())
        .take(LANGUAGE_SLOTS)
        .filter_map(|(column, language)| {
            column
                .as_deref()
                .and_then(|text| LanguageSpecificText::new(language.as_ref(), text))
        })
        .collect()
}
