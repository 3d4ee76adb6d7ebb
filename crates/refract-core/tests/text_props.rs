use proptest::prelude::*;
use refract_core::{
    detect_end_of_line, to_byte_offset, to_editor_range, EndOfLine, LineIndex, TextSize,
};

const PROPTEST_CASES: u32 = 256;

fn arb_byte() -> impl Strategy<Value = u8> {
    // Mostly source-like ASCII, with enough `\r` / `\n` to produce every mix of terminators
    // (including `\r\n` pairs, lone `\r` and blank lines) and the odd non-ASCII byte.
    prop_oneof![
        12 => prop::sample::select(b"abxyz01 ;(){}=*\t".to_vec()),
        3 => Just(b'\n'),
        3 => Just(b'\r'),
        1 => Just(0xC3u8),
    ]
}

fn arb_text() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(arb_byte(), 0..=64)
}

fn arb_eol() -> impl Strategy<Value = EndOfLine> {
    prop_oneof![
        Just(EndOfLine::Lf),
        Just(EndOfLine::CrLf),
        Just(EndOfLine::Cr)
    ]
}

fn arb_text_and_range() -> impl Strategy<Value = (Vec<u8>, usize, usize)> {
    arb_text().prop_flat_map(|text| {
        let len = text.len();
        (Just(text), 0..=len).prop_flat_map(|(text, start)| {
            let remaining = text.len() - start;
            (Just(text), Just(start), 0..=remaining)
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: PROPTEST_CASES,
        .. ProptestConfig::default()
    })]

    #[test]
    fn editor_range_round_trips_to_byte_offsets(
        (text, start, len) in arb_text_and_range(),
    ) {
        let eol = detect_end_of_line(&text);
        let range = to_editor_range(
            &text,
            eol,
            TextSize::from(start as u32),
            TextSize::from(len as u32),
        );

        prop_assert_eq!(
            to_byte_offset(&text, eol, range.start.line, range.start.column),
            Some(TextSize::from(start as u32))
        );
        prop_assert_eq!(
            to_byte_offset(&text, eol, range.end.line, range.end.column),
            Some(TextSize::from((start + len) as u32))
        );
    }

    #[test]
    fn round_trip_holds_under_any_convention(
        (text, start, len) in arb_text_and_range(),
        eol in arb_eol(),
    ) {
        let range = to_editor_range(
            &text,
            eol,
            TextSize::from(start as u32),
            TextSize::from(len as u32),
        );
        prop_assert_eq!(
            to_byte_offset(&text, eol, range.end.line, range.end.column),
            Some(TextSize::from((start + len) as u32))
        );
        prop_assert!(range.start <= range.end);
    }

    #[test]
    fn line_index_agrees_with_scanning(
        (text, start, len) in arb_text_and_range(),
        eol in arb_eol(),
    ) {
        let index = LineIndex::new(&text, eol);
        let scanned = to_editor_range(
            &text,
            eol,
            TextSize::from(start as u32),
            TextSize::from(len as u32),
        );
        prop_assert_eq!(index.line_col(TextSize::from(start as u32)), scanned.start);
        prop_assert_eq!(index.line_col(TextSize::from((start + len) as u32)), scanned.end);
    }

    #[test]
    fn detected_convention_matches_first_terminator(text in arb_text()) {
        let first = text.iter().position(|b| *b == b'\n' || *b == b'\r');
        let expected = match first {
            None => EndOfLine::Lf,
            Some(idx) if text[idx] == b'\n' => EndOfLine::Lf,
            Some(idx) if text.get(idx + 1) == Some(&b'\n') => EndOfLine::CrLf,
            Some(_) => EndOfLine::Cr,
        };
        prop_assert_eq!(detect_end_of_line(&text), expected);
    }
}
