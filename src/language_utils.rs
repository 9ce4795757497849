use isolang::Language;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Language utilities for ISO language code handling
///
/// Every language tag that enters the crate, from a user request or from an
/// upstream subtitle source, goes through [`normalize`] before it is compared
/// or stored. Normalization never fails: unknown codes degrade to a
/// best-effort form instead of blocking a request on language metadata.

/// Code used when nothing usable is left after cleaning the input
pub const UNDETERMINED: &str = "und";

/// ISO 639-1 to three-letter mapping.
///
/// Deprecated two-letter codes (`iw`, `in`, `ji`) follow their current
/// counterpart so that the inverse table keeps the current code.
static PART1_TO_PART3: &[(&str, &str)] = &[
    ("af", "afr"), ("am", "amh"), ("ar", "ara"), ("az", "aze"), ("be", "bel"),
    ("bg", "bul"), ("bn", "ben"), ("bs", "bos"), ("ca", "cat"), ("cs", "ces"),
    ("cy", "cym"), ("da", "dan"), ("de", "deu"), ("el", "ell"), ("en", "eng"),
    ("eo", "epo"), ("es", "spa"), ("et", "est"), ("eu", "eus"), ("fa", "fas"),
    ("fi", "fin"), ("fr", "fra"), ("ga", "gle"), ("gl", "glg"), ("gu", "guj"),
    ("he", "heb"), ("iw", "heb"), ("hi", "hin"), ("hr", "hrv"), ("hu", "hun"),
    ("hy", "hye"), ("id", "ind"), ("in", "ind"), ("is", "isl"), ("it", "ita"),
    ("ja", "jpn"), ("ka", "kat"), ("kk", "kaz"), ("km", "khm"), ("kn", "kan"),
    ("ko", "kor"), ("ku", "kur"), ("ky", "kir"), ("la", "lat"), ("lb", "ltz"),
    ("lo", "lao"), ("lt", "lit"), ("lv", "lav"), ("mk", "mkd"), ("ml", "mal"),
    ("mn", "mon"), ("mr", "mar"), ("ms", "msa"), ("mt", "mlt"), ("my", "mya"),
    ("nb", "nob"), ("ne", "nep"), ("nl", "nld"), ("nn", "nno"), ("no", "nor"),
    ("pa", "pan"), ("pl", "pol"), ("ps", "pus"), ("pt", "por"), ("ro", "ron"),
    ("ru", "rus"), ("si", "sin"), ("sk", "slk"), ("sl", "slv"), ("so", "som"),
    ("sq", "sqi"), ("sr", "srp"), ("sv", "swe"), ("sw", "swa"), ("ta", "tam"),
    ("te", "tel"), ("tg", "tgk"), ("th", "tha"), ("tl", "tgl"), ("tr", "tur"),
    ("uk", "ukr"), ("ur", "urd"), ("uz", "uzb"), ("vi", "vie"), ("xh", "xho"),
    ("yi", "yid"), ("ji", "yid"), ("yo", "yor"), ("zh", "zho"), ("zu", "zul"),
    // OpenSubtitles tags Brazilian Portuguese with its own pair
    ("pb", "pob"),
];

/// ISO 639-2/B codes folded to their 639-2/T form
static BIBLIOGRAPHIC_TO_TERMINOLOGIC: &[(&str, &str)] = &[
    ("alb", "sqi"), ("arm", "hye"), ("baq", "eus"), ("bur", "mya"), ("chi", "zho"),
    ("cze", "ces"), ("dut", "nld"), ("fre", "fra"), ("geo", "kat"), ("ger", "deu"),
    ("gre", "ell"), ("ice", "isl"), ("mac", "mkd"), ("may", "msa"), ("per", "fas"),
    ("rum", "ron"), ("slo", "slk"), ("wel", "cym"),
];

static FORWARD: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(PART1_TO_PART3.len());
    for (two, three) in PART1_TO_PART3 {
        map.entry(*two).or_insert(*three);
    }
    map
});

// First entry wins on collision, so `heb` maps back to `he`, not `iw`
static INVERSE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(PART1_TO_PART3.len());
    for (two, three) in PART1_TO_PART3 {
        map.entry(*three).or_insert(*two);
    }
    map
});

static BIBLIOGRAPHIC: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| BIBLIOGRAPHIC_TO_TERMINOLOGIC.iter().copied().collect());

/// A normalized three-letter language code
///
/// This is the identity used for matching and for storage keys. The only way
/// to build one is through [`normalize`], so two values compare equal exactly
/// when they name the same language after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Normalize any language tag into a code
    pub fn new(code: &str) -> Self {
        normalize(code)
    }

    /// The normalized code
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The two-letter form, if the static table knows one
    pub fn to_two_letter(&self) -> Option<&'static str> {
        INVERSE.get(self.0.as_str()).copied()
    }

    /// English display name, if the code is a registered ISO 639-3 code
    pub fn display_name(&self) -> Option<String> {
        Language::from_639_3(&self.0).map(|lang| lang.to_name().to_string())
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LanguageCode {
    fn from(code: &str) -> Self {
        normalize(code)
    }
}

impl From<String> for LanguageCode {
    fn from(code: String) -> Self {
        normalize(&code)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

/// Normalize a language tag to its canonical three-letter code
///
/// - two letters: table lookup, unknown codes are kept lower-cased
/// - three letters: lower-cased, bibliographic aliases folded
/// - region-tagged codes (`pt-BR`, `en_US`): the primary subtag is normalized
/// - anything else: truncated to three lower-cased characters
///
/// A result holding anything but ASCII letters becomes `und`; codes end up
/// as path segments.
pub fn normalize(code: &str) -> LanguageCode {
    let cleaned = code.trim().to_lowercase();

    match cleaned.chars().count() {
        0 => LanguageCode(UNDETERMINED.to_string()),
        2 => match FORWARD.get(cleaned.as_str()) {
            Some(three) => LanguageCode((*three).to_string()),
            None => letters_only(cleaned),
        },
        3 => match BIBLIOGRAPHIC.get(cleaned.as_str()) {
            Some(terminologic) => LanguageCode((*terminologic).to_string()),
            None => letters_only(cleaned),
        },
        _ => {
            if let Some((primary, _region)) = cleaned.split_once(['-', '_']) {
                let primary_len = primary.chars().count();
                if primary_len == 2 || primary_len == 3 {
                    return normalize(primary);
                }
            }
            let truncated: String = cleaned.chars().filter(|c| !c.is_whitespace()).take(3).collect();
            match truncated.chars().count() {
                0 => LanguageCode(UNDETERMINED.to_string()),
                3 => normalize(&truncated),
                _ => letters_only(truncated),
            }
        }
    }
}

fn letters_only(code: String) -> LanguageCode {
    if code.chars().all(|c| c.is_ascii_lowercase()) {
        LanguageCode(code)
    } else {
        LanguageCode(UNDETERMINED.to_string())
    }
}

/// Two-letter form of any language tag, if the static table knows one
pub fn to_two_letter(code: &str) -> Option<&'static str> {
    normalize(code).to_two_letter()
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    normalize(code1) == normalize(code2)
}

/// Get the language name from a code, falling back to the code itself
pub fn get_language_name(code: &str) -> String {
    let normalized = normalize(code);
    normalized
        .display_name()
        .unwrap_or_else(|| normalized.as_str().to_string())
}

/// The static two-letter to three-letter table
pub fn code_table() -> &'static [(&'static str, &'static str)] {
    PART1_TO_PART3
}

/// Whether a three-letter code is the target of more than one table entry
pub fn has_collision(three: &str) -> bool {
    PART1_TO_PART3.iter().filter(|(_, t)| *t == three).count() > 1
}
