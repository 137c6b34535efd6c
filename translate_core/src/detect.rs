use tracing::debug;

use crate::error::{Result, TranslateError};

/// Source languages with a known opus-mt model family.
pub const DEFAULT_SUPPORTED_LANGS: &[&str] = &["en", "fr", "de", "es", "hi"];

/// Detect the language of `text` and return its ISO 639-1 code.
///
/// Languages without a two-letter code are returned as their ISO 639-3 code.
pub fn detect_language(text: &str) -> Result<String> {
    let info = whatlang::detect(text).ok_or(TranslateError::Detection)?;
    let code = iso639_1(info.lang().code());
    debug!(
        lang = code,
        confidence = info.confidence(),
        reliable = info.is_reliable(),
        "language detected"
    );
    Ok(code.to_string())
}

/// Fail with `UnsupportedLanguage` unless `lang` is one of `supported`.
pub fn ensure_supported<S: AsRef<str>>(lang: &str, supported: &[S]) -> Result<()> {
    if supported.iter().any(|s| s.as_ref() == lang) {
        Ok(())
    } else {
        Err(TranslateError::UnsupportedLanguage(lang.to_string()))
    }
}

fn iso639_1(code3: &'static str) -> &'static str {
    match code3 {
        "eng" => "en",
        "fra" => "fr",
        "deu" => "de",
        "spa" => "es",
        "hin" => "hi",
        "ita" => "it",
        "por" => "pt",
        "nld" => "nl",
        "rus" => "ru",
        "ukr" => "uk",
        "pol" => "pl",
        "ces" => "cs",
        "slk" => "sk",
        "slv" => "sl",
        "hrv" => "hr",
        "srp" => "sr",
        "bul" => "bg",
        "mkd" => "mk",
        "bel" => "be",
        "ron" => "ro",
        "hun" => "hu",
        "fin" => "fi",
        "est" => "et",
        "lav" => "lv",
        "lit" => "lt",
        "swe" => "sv",
        "dan" => "da",
        "nob" => "no",
        "ell" => "el",
        "tur" => "tr",
        "aze" => "az",
        "uzb" => "uz",
        "tuk" => "tk",
        "kat" => "ka",
        "hye" => "hy",
        "heb" => "he",
        "yid" => "yi",
        "arb" => "ar",
        "pes" => "fa",
        "urd" => "ur",
        "ben" => "bn",
        "pan" => "pa",
        "guj" => "gu",
        "mar" => "mr",
        "nep" => "ne",
        "ori" => "or",
        "tam" => "ta",
        "tel" => "te",
        "kan" => "kn",
        "mal" => "ml",
        "sin" => "si",
        "tha" => "th",
        "khm" => "km",
        "mya" => "my",
        "vie" => "vi",
        "ind" => "id",
        "jav" => "jv",
        "tgl" => "tl",
        "cmn" => "zh",
        "jpn" => "ja",
        "kor" => "ko",
        "amh" => "am",
        "aka" => "ak",
        "zul" => "zu",
        "sna" => "sn",
        "afr" => "af",
        "lat" => "la",
        "cat" => "ca",
        "epo" => "eo",
        other => other,
    }
}
