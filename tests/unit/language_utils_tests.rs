/*!
 * Tests for language code utilities
 */

use submine::language_utils::{get_language_name, language_codes_match, normalize_ui_language, validate_language_code};

/// Test validation of two- and three-letter codes
#[test]
fn test_validate_language_code_withValidCodes_shouldSucceed() {
    assert!(validate_language_code("en").is_ok());
    assert!(validate_language_code("ja").is_ok());
    assert!(validate_language_code("jpn").is_ok());
    assert!(validate_language_code("ger").is_ok());
    assert!(validate_language_code(" FR ").is_ok());
}

#[test]
fn test_validate_language_code_withInvalidCodes_shouldFail() {
    assert!(validate_language_code("").is_err());
    assert!(validate_language_code("xx").is_err());
    assert!(validate_language_code("english").is_err());
}

/// Surfaces always receive the shortest code available
#[test]
fn test_normalize_ui_language_withThreeLetterCode_shouldPreferPart1() {
    assert_eq!(normalize_ui_language("jpn").unwrap(), "ja");
    assert_eq!(normalize_ui_language("fre").unwrap(), "fr");
    assert_eq!(normalize_ui_language("EN").unwrap(), "en");
}

#[test]
fn test_normalize_ui_language_withInvalidCode_shouldFail() {
    assert!(normalize_ui_language("zz").is_err());
}

#[test]
fn test_language_codes_match_withDifferentForms_shouldMatch() {
    assert!(language_codes_match("de", "ger"));
    assert!(language_codes_match("deu", "de"));
    assert!(!language_codes_match("de", "fr"));
    assert!(!language_codes_match("de", "xx"));
}

#[test]
fn test_get_language_name_withKnownCode_shouldReturnEnglishName() {
    assert_eq!(get_language_name("ja").unwrap(), "Japanese");
    assert!(get_language_name("qq").is_err());
}
