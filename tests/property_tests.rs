/// Property-based tests using proptest
/// Tests invariants and properties that should hold for all inputs
use licence_verify_api::parser::{parse_expiry_date, FieldExtraction, RegexFieldExtractor};
use proptest::prelude::*;

// Property: Field extraction should never panic
proptest! {
    #[test]
    fn extraction_never_panics(text in "\\PC*") {
        let extractor = RegexFieldExtractor::new();
        let _ = extractor.extract(&text);
    }
}

// Property: A parsed licence number is always exactly 16 digits
proptest! {
    #[test]
    fn parsed_licence_number_is_always_16_digits(text in "\\PC*") {
        let extractor = RegexFieldExtractor::new();
        if let Some(number) = extractor.extract(&text).license_number {
            prop_assert_eq!(number.len(), 16);
            prop_assert!(number.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn grouped_licence_numbers_are_stripped_of_whitespace(
        g1 in "[0-9]{4}",
        g2 in "[0-9]{4}",
        g3 in "[0-9]{4}",
        g4 in "[0-9]{4}"
    ) {
        let text = format!("LICENCE CARD\n{} {} {} {}\nHOLDER", g1, g2, g3, g4);
        let extractor = RegexFieldExtractor::new();
        let fields = extractor.extract(&text);
        prop_assert_eq!(fields.license_number, Some(format!("{}{}{}{}", g1, g2, g3, g4)));
    }

    #[test]
    fn ungrouped_licence_numbers_are_accepted(digits in "[0-9]{16}") {
        let text = format!("number: {} end", digits);
        let extractor = RegexFieldExtractor::new();
        let fields = extractor.extract(&text);
        prop_assert_eq!(fields.license_number, Some(digits));
    }
}

// Property: Expiry extraction keeps the raw token without the marker
proptest! {
    #[test]
    fn expiry_token_extracted_without_marker(
        day in 1u8..=28u8,
        month in prop::sample::select(vec![
            "JAN", "FEB", "MAR", "APR", "MAY", "JUN",
            "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
        ]),
        year in 2000u16..=2099u16
    ) {
        let token = format!("{:02} {} {}", day, month, year);
        let text = format!("SECURITY LICENCE\nEXPIRES {}\nJOHN SMITH", token);
        let extractor = RegexFieldExtractor::new();
        let fields = extractor.extract(&text);
        prop_assert_eq!(fields.expiry_date_raw, Some(token.clone()));
        // Tokens built from real day/month/year always parse as dates
        prop_assert!(parse_expiry_date(&token).is_some());
    }

    #[test]
    fn name_is_first_line_after_expiry(name in "[A-Z][A-Z ]{0,30}[A-Z]") {
        let text = format!("EXPIRES 05 JUN 2025\n{}\nSECOND LINE", name);
        let extractor = RegexFieldExtractor::new();
        let fields = extractor.extract(&text);
        prop_assert_eq!(fields.name_raw, Some(name.trim().to_string()));
    }
}

// Property: Text with no digit runs yields no licence number
proptest! {
    #[test]
    fn text_without_digits_has_no_licence(text in "[a-zA-Z \n]*") {
        let extractor = RegexFieldExtractor::new();
        prop_assert_eq!(extractor.extract(&text).license_number, None);
    }
}
