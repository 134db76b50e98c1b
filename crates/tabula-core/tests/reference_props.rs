use proptest::prelude::*;
use tabula_core::cell::{column_to_letters, letters_to_column};
use tabula_core::{CellReference, RangeReference, MAX_COLUMN, MAX_ROW};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_letters_roundtrip(letters in "[A-Z]{1,3}") {
        let column = letters_to_column(&letters).expect("letters should parse");
        prop_assert!(column >= 1 && column <= MAX_COLUMN);
        prop_assert_eq!(column_to_letters(column).expect("index in range"), letters);
    }

    #[test]
    fn prop_column_index_roundtrip(column in 1u32..=MAX_COLUMN) {
        let letters = column_to_letters(column).expect("index in range");
        prop_assert!(letters.len() <= 3);
        prop_assert_eq!(letters_to_column(&letters).expect("letters should parse"), column);
    }

    #[test]
    fn prop_lowercase_letters_match_uppercase(letters in "[a-z]{1,3}") {
        prop_assert_eq!(
            letters_to_column(&letters).expect("letters should parse"),
            letters_to_column(&letters.to_ascii_uppercase()).expect("letters should parse")
        );
    }

    #[test]
    fn prop_cell_reference_display_parses_back(
        column in 1u32..=MAX_COLUMN,
        row in 1u32..=MAX_ROW,
        column_absolute in any::<bool>(),
        row_absolute in any::<bool>(),
    ) {
        let reference = CellReference::new(column, row)
            .expect("in bounds")
            .with_absolute(column_absolute, row_absolute);
        let parsed = CellReference::parse(&reference.to_string()).expect("display output parses");
        prop_assert_eq!(parsed, reference);
    }

    #[test]
    fn prop_range_sizes_are_consistent(
        c1 in 1u32..=200, r1 in 1u32..=200,
        dc in 0u32..50, dr in 0u32..50,
    ) {
        let range = RangeReference::from_bounds(c1, r1, c1 + dc, r1 + dr).expect("valid bounds");
        prop_assert_eq!(range.width(), dc);
        prop_assert_eq!(range.height(), dr);
        prop_assert_eq!(range.cell_count(), u64::from(dc + 1) * u64::from(dr + 1));
        prop_assert_eq!(range.cells().count() as u64, range.cell_count());
        prop_assert!(range.contains(&range.top_left()));
        prop_assert!(range.contains(&range.bottom_right()));
    }
}
