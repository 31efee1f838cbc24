//! Language table: human-readable names to NLLB-200 tags.
//! Anything not in the table is passed through as an opaque tag.

use crate::translate::LanguageTag;

/// (name, NLLB tag). Order is the display order of `docxlate languages`.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("English", "eng_Latn"),
    ("Hindi", "hin_Deva"),
    ("French", "fra_Latn"),
    ("German", "deu_Latn"),
    ("Spanish", "spa_Latn"),
    ("Portuguese", "por_Latn"),
    ("Italian", "ita_Latn"),
    ("Dutch", "nld_Latn"),
    ("Polish", "pol_Latn"),
    ("Russian", "rus_Cyrl"),
    ("Ukrainian", "ukr_Cyrl"),
    ("Turkish", "tur_Latn"),
    ("Arabic", "arb_Arab"),
    ("Urdu", "urd_Arab"),
    ("Bengali", "ben_Beng"),
    ("Marathi", "mar_Deva"),
    ("Gujarati", "guj_Gujr"),
    ("Punjabi", "pan_Guru"),
    ("Tamil", "tam_Taml"),
    ("Telugu", "tel_Telu"),
    ("Kannada", "kan_Knda"),
    ("Malayalam", "mal_Mlym"),
    ("Chinese (Simplified)", "zho_Hans"),
    ("Japanese", "jpn_Jpan"),
    ("Korean", "kor_Hang"),
    ("Vietnamese", "vie_Latn"),
    ("Thai", "tha_Thai"),
];

/// Map a language name (case-insensitive) to its tag; unknown input is
/// taken verbatim as a tag.
pub fn resolve_language(input: &str) -> LanguageTag {
    let trimmed = input.trim();
    LANGUAGES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
        .map(|(_, tag)| LanguageTag::new(*tag))
        .unwrap_or_else(|| LanguageTag::new(trimmed))
}

/// Reverse lookup for display.
pub fn language_name(tag: &LanguageTag) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(_, t)| *t == tag.as_str())
        .map(|(name, _)| *name)
}

/// Detect the dominant language of `text` with whatlang.
/// Returns None if detection is unreliable or the language has no table entry.
pub fn detect_source_language(text: &str) -> Option<LanguageTag> {
    let info = whatlang::detect(text)?;
    if !info.is_reliable() {
        return None;
    }
    whatlang_to_tag(info.lang()).map(LanguageTag::new)
}

fn whatlang_to_tag(lang: whatlang::Lang) -> Option<&'static str> {
    use whatlang::Lang::*;
    let tag = match lang {
        Eng => "eng_Latn",
        Hin => "hin_Deva",
        Fra => "fra_Latn",
        Deu => "deu_Latn",
        Spa => "spa_Latn",
        Por => "por_Latn",
        Ita => "ita_Latn",
        Nld => "nld_Latn",
        Pol => "pol_Latn",
        Rus => "rus_Cyrl",
        Ukr => "ukr_Cyrl",
        Tur => "tur_Latn",
        Ara => "arb_Arab",
        Urd => "urd_Arab",
        Ben => "ben_Beng",
        Mar => "mar_Deva",
        Guj => "guj_Gujr",
        Pan => "pan_Guru",
        Tam => "tam_Taml",
        Tel => "tel_Telu",
        Kan => "kan_Knda",
        Mal => "mal_Mlym",
        Cmn => "zho_Hans",
        Jpn => "jpn_Jpan",
        Kor => "kor_Hang",
        Vie => "vie_Latn",
        Tha => "tha_Thai",
        _ => return None,
    };
    Some(tag)
}
