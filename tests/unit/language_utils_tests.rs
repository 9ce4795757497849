/*!
 * Tests for language code normalization
 */

use subrelay::language_utils::{
    code_table, get_language_name, has_collision, language_codes_match, normalize, LanguageCode,
};

/// Every three-letter code outside a collision survives 3 -> 2 -> 3
#[test]
fn test_roundTrip_withCodeOutsideCollision_shouldReturnSameCode() {
    let mut checked = 0;
    for (two, three) in code_table() {
        if has_collision(three) {
            continue;
        }
        let code = LanguageCode::new(three);
        let back = code.to_two_letter().expect("table code has a two-letter form");
        assert_eq!(back, *two, "two-letter form of {}", three);
        assert_eq!(normalize(back).as_str(), *three);
        checked += 1;
    }
    assert!(checked > 50);
}

#[test]
fn test_languageCodesMatch_withDifferentForms_shouldMatch() {
    assert!(language_codes_match("fr", "fre"));
    assert!(language_codes_match("FRA", "fr-CA"));
    assert!(language_codes_match("de", "ger"));
    assert!(!language_codes_match("en", "es"));
}

#[test]
fn test_normalize_withNormalizedCode_shouldReturnItUnchanged() {
    for input in ["en", "fre", "pt-BR", "pob", "zz", "english", "French", ""] {
        let once = normalize(input);
        assert_eq!(normalize(once.as_str()), once, "input {:?}", input);
    }
}

#[test]
fn test_getLanguageName_shouldUseEnglishNames() {
    assert_eq!(get_language_name("fr"), "French");
    assert_eq!(get_language_name("ger"), "German");
    assert_eq!(get_language_name("qq"), "qq");
}
