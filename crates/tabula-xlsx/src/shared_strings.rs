//! Shared strings table (`xl/sharedStrings.xml`)

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel uses this format to encode special characters in XML:
/// - `_x000d_` = CR (carriage return)
/// - `_x000a_` = LF (line feed)
/// - `_x0009_` = Tab
/// - `_x005f_` = Underscore (escaped underscore)
pub fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '_' {
            result.push(c);
            continue;
        }

        if chars.peek() != Some(&'x') {
            result.push('_');
            continue;
        }
        chars.next();

        let mut hex_chars = String::new();
        while hex_chars.len() < 4 {
            match chars.peek() {
                Some(&ch) if ch.is_ascii_hexdigit() => {
                    hex_chars.push(ch);
                    chars.next();
                }
                _ => break,
            }
        }

        if hex_chars.len() == 4 && chars.peek() == Some(&'_') {
            chars.next();
            match u32::from_str_radix(&hex_chars, 16)
                .ok()
                .and_then(char::from_u32)
            {
                Some(decoded) => result.push(decoded),
                None => {
                    result.push_str("_x");
                    result.push_str(&hex_chars);
                    result.push('_');
                }
            }
        } else {
            // Not an escape; emit what was consumed
            result.push_str("_x");
            result.push_str(&hex_chars);
        }
    }

    result
}

/// Encode text so [`decode_excel_escapes`] restores it exactly.
///
/// Control characters XML cannot carry (and CR, which parsers normalize) are
/// written as `_xHHHH_`; an underscore that would otherwise start an escape is
/// written as `_x005f_`.
pub fn encode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for (i, c) in s.char_indices() {
        match c {
            '\t' | '\n' => result.push(c),
            c if (c as u32) < 0x20 => result.push_str(&format!("_x{:04x}_", c as u32)),
            '_' if looks_like_escape(&s[i..]) => result.push_str("_x005f_"),
            c => result.push(c),
        }
    }

    result
}

fn looks_like_escape(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 7
        && bytes[0] == b'_'
        && bytes[1] == b'x'
        && bytes[2..6].iter().all(u8::is_ascii_hexdigit)
        && bytes[6] == b'_'
}

/// Read the shared strings table.
///
/// Rich-text runs of one `<si>` are concatenated; phonetic runs (`<rPh>`) are
/// ignored.
pub fn read_shared_strings(bytes: &[u8]) -> XlsxResult<Vec<String>> {
    let mut xml_reader = Reader::from_reader(bytes);
    xml_reader.trim_text(false);

    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current_string = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut in_phonetic = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current_string.clear();
                }
                b"rPh" if in_si => in_phonetic = true,
                b"t" if in_si && !in_phonetic => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(decode_excel_escapes(&current_string));
                    current_string.clear();
                    in_si = false;
                }
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_t => {
                current_string.push_str(&e.unescape()?);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_excel_escapes_control_characters() {
        assert_eq!(decode_excel_escapes("hello_x000d_world"), "hello\rworld");
        assert_eq!(decode_excel_escapes("hello_x000a_world"), "hello\nworld");
        assert_eq!(decode_excel_escapes("col1_x0009_col2"), "col1\tcol2");
        assert_eq!(
            decode_excel_escapes("line1_x000D__x000A_line2"),
            "line1\r\nline2"
        );
    }

    #[test]
    fn test_decode_excel_escapes_underscore() {
        assert_eq!(decode_excel_escapes("under_x005f_score"), "under_score");
        assert_eq!(decode_excel_escapes("snake_case"), "snake_case");
    }

    #[test]
    fn test_decode_excel_escapes_partial_sequence() {
        assert_eq!(decode_excel_escapes("_x00"), "_x00");
        assert_eq!(decode_excel_escapes("_x000"), "_x000");
        assert_eq!(decode_excel_escapes("_x000d"), "_x000d");
        assert_eq!(decode_excel_escapes("plain text"), "plain text");
    }

    #[test]
    fn test_encode_excel_escapes() {
        assert_eq!(encode_excel_escapes("a\r\nb\tc"), "a_x000d_\nb\tc");
        assert_eq!(encode_excel_escapes("bell\u{7}"), "bell_x0007_");
        assert_eq!(encode_excel_escapes("_x000d_"), "_x005f_x000d_");
        assert_eq!(encode_excel_escapes("snake_case_x"), "snake_case_x");

        for text in ["a\r\nb", "_x000d_ literal", "x_y_z", "\u{1}\u{1f}"] {
            assert_eq!(decode_excel_escapes(&encode_excel_escapes(text)), text);
        }
    }

    #[test]
    fn test_read_shared_strings() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
    <si><t>Hello</t></si>
    <si><t xml:space="preserve"> padded </t></si>
    <si><r><t>Rich</t></r><r><rPr><b/></rPr><t> text</t></r></si>
    <si><t>&#x6F22;&#x5B57;</t><rPh sb="0" eb="2"><t>kanji</t></rPh></si>
    <si/>
</sst>"#;

        let strings = read_shared_strings(xml).unwrap();
        assert_eq!(strings, vec!["Hello", " padded ", "Rich text", "漢字", ""]);
    }
}
