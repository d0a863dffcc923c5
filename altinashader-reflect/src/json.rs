//! Minimal recursive-descent JSON reader for compiler reflection side-files.
//!
//! Covers objects, arrays, strings, numbers, booleans, and null. `\uXXXX`
//! escapes are not decoded; each one becomes a `?` placeholder, which is
//! enough for the ASCII identifier names reflection documents carry.

use crate::error::JsonError;

/// A parsed JSON value.
///
/// Object members keep document order; duplicate keys are kept and [`get`]
/// returns the first.
///
/// [`get`]: JsonValue::get
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(Vec<(String, JsonValue)>),
    Array(Vec<JsonValue>),
}

impl JsonValue {
    /// First member with the given key, when this is an object.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            JsonValue::Object(members) => members
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsonValue::Object(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            JsonValue::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// Non-negative numbers truncated to `u32`; anything else is `None`.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            JsonValue::Number(number) if *number >= 0.0 => Some(*number as u32),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            JsonValue::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// Parses a complete JSON document.
///
/// The whole input must be consumed; trailing non-whitespace content is an
/// error.
pub fn parse(text: &str) -> Result<JsonValue, JsonError> {
    let mut reader = Reader { text, pos: 0 };
    reader.skip_whitespace();
    let value = reader.parse_value()?;
    reader.skip_whitespace();
    if reader.pos != reader.text.len() {
        return Err(JsonError::TrailingCharacters);
    }
    Ok(value)
}

struct Reader<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn bytes(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.peek() {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    fn parse_value(&mut self) -> Result<JsonValue, JsonError> {
        self.skip_whitespace();
        let Some(byte) = self.peek() else {
            return Err(JsonError::UnexpectedEnd);
        };
        match byte {
            b'"' => Ok(JsonValue::String(self.parse_string()?)),
            b'{' => self.parse_object(),
            b'[' => self.parse_array(),
            b't' | b'f' => self.parse_bool(),
            b'n' => self.parse_null(),
            b'-' | b'0'..=b'9' => self.parse_number(),
            _ => Err(JsonError::InvalidToken),
        }
    }

    fn parse_string(&mut self) -> Result<String, JsonError> {
        if self.peek() != Some(b'"') {
            return Err(JsonError::ExpectedString);
        }
        self.pos += 1;

        let mut out = String::new();
        loop {
            let rest = &self.bytes()[self.pos..];
            let Some(stop) = rest.iter().position(|&b| b == b'"' || b == b'\\') else {
                return Err(JsonError::UnterminatedString);
            };
            out.push_str(&self.text[self.pos..self.pos + stop]);
            self.pos += stop + 1;
            if rest[stop] == b'"' {
                return Ok(out);
            }

            let Some(escape) = self.text[self.pos..].chars().next() else {
                return Err(JsonError::InvalidEscape);
            };
            self.pos += escape.len_utf8();
            match escape {
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                '/' => out.push('/'),
                'b' => out.push('\u{0008}'),
                'f' => out.push('\u{000C}'),
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                'u' => {
                    // Not decoded; skip the digits and leave a placeholder.
                    let mut end = usize::min(self.pos + 4, self.text.len());
                    while !self.text.is_char_boundary(end) {
                        end += 1;
                    }
                    self.pos = end;
                    out.push('?');
                }
                other => out.push(other),
            }
        }
    }

    fn parse_object(&mut self) -> Result<JsonValue, JsonError> {
        self.pos += 1;
        self.skip_whitespace();

        let mut members = Vec::new();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(JsonValue::Object(members));
        }

        while self.pos < self.text.len() {
            let key = self.parse_string()?;
            self.skip_whitespace();
            if self.peek() != Some(b':') {
                return Err(JsonError::ExpectedColon);
            }
            self.pos += 1;
            let value = self.parse_value()?;
            members.push((key, value));
            self.skip_whitespace();

            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                }
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(JsonValue::Object(members));
                }
                Some(_) => return Err(JsonError::ExpectedObjectSeparator),
                None => break,
            }
        }
        Err(JsonError::UnterminatedObject)
    }

    fn parse_array(&mut self) -> Result<JsonValue, JsonError> {
        self.pos += 1;
        self.skip_whitespace();

        let mut items = Vec::new();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(JsonValue::Array(items));
        }

        while self.pos < self.text.len() {
            items.push(self.parse_value()?);
            self.skip_whitespace();

            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                }
                Some(b']') => {
                    self.pos += 1;
                    return Ok(JsonValue::Array(items));
                }
                Some(_) => return Err(JsonError::ExpectedArraySeparator),
                None => break,
            }
        }
        Err(JsonError::UnterminatedArray)
    }

    fn parse_bool(&mut self) -> Result<JsonValue, JsonError> {
        if self.text[self.pos..].starts_with("true") {
            self.pos += 4;
            return Ok(JsonValue::Bool(true));
        }
        if self.text[self.pos..].starts_with("false") {
            self.pos += 5;
            return Ok(JsonValue::Bool(false));
        }
        Err(JsonError::InvalidBool)
    }

    fn parse_null(&mut self) -> Result<JsonValue, JsonError> {
        if self.text[self.pos..].starts_with("null") {
            self.pos += 4;
            return Ok(JsonValue::Null);
        }
        Err(JsonError::InvalidNull)
    }

    fn parse_number(&mut self) -> Result<JsonValue, JsonError> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if matches!(byte, b'0'..=b'9' | b'+' | b'-' | b'.' | b'e' | b'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.text[start..self.pos]
            .parse::<f64>()
            .map(JsonValue::Number)
            .map_err(|_| JsonError::InvalidNumber)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scalars_parse() {
        assert_eq!(parse("null"), Ok(JsonValue::Null));
        assert_eq!(parse("true"), Ok(JsonValue::Bool(true)));
        assert_eq!(parse("false"), Ok(JsonValue::Bool(false)));
        assert_eq!(parse("42"), Ok(JsonValue::Number(42.0)));
        assert_eq!(parse("-2.5e2"), Ok(JsonValue::Number(-250.0)));
        assert_eq!(
            parse("\"hello\""),
            Ok(JsonValue::String("hello".to_string()))
        );
    }

    #[test]
    fn nested_document_parses() {
        let doc = parse(
            r#"{
                "parameters": [
                    { "name": "Albedo", "binding": { "index": 3, "space": 1 } },
                    { "name": "Lights", "binding": { "index": 0, "space": 0 } }
                ],
                "empty": {},
                "none": null
            }"#,
        )
        .unwrap();

        let params = doc.get("parameters").and_then(JsonValue::as_array).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(
            params[0].get("name").and_then(JsonValue::as_str),
            Some("Albedo")
        );
        assert_eq!(
            params[0]
                .get("binding")
                .and_then(|binding| binding.get("index"))
                .and_then(JsonValue::as_u32),
            Some(3)
        );
        assert_eq!(doc.get("empty"), Some(&JsonValue::Object(Vec::new())));
        assert_eq!(doc.get("none"), Some(&JsonValue::Null));
        assert_eq!(doc.get("missing"), None);
    }

    #[test]
    fn escapes_decode() {
        assert_eq!(
            parse(r#""a\"b\\c\/d\n\t""#),
            Ok(JsonValue::String("a\"b\\c/d\n\t".to_string()))
        );
    }

    #[test]
    fn unicode_escape_becomes_placeholder() {
        assert_eq!(
            parse("\"pre\\u00e9post\""),
            Ok(JsonValue::String("pre?post".to_string()))
        );
        // Truncated escape at end of input still terminates.
        assert_eq!(parse(r#""x\u12"#), Err(JsonError::UnterminatedString));
    }

    #[test]
    fn unknown_escape_is_kept_literally() {
        assert_eq!(parse(r#""a\qb""#), Ok(JsonValue::String("aqb".to_string())));
    }

    #[test]
    fn duplicate_keys_resolve_to_the_first() {
        let doc = parse(r#"{ "k": 1, "k": 2 }"#).unwrap();
        assert_eq!(doc.get("k").and_then(JsonValue::as_u32), Some(1));
    }

    #[test]
    fn negative_numbers_are_not_u32() {
        let doc = parse("-3").unwrap();
        assert_eq!(doc.as_u32(), None);
        assert_eq!(doc.as_f64(), Some(-3.0));
    }

    #[test]
    fn truncation_to_u32_drops_the_fraction() {
        assert_eq!(parse("2.7").unwrap().as_u32(), Some(2));
    }

    #[test]
    fn malformed_documents_error() {
        assert_eq!(parse(""), Err(JsonError::UnexpectedEnd));
        assert_eq!(parse("  "), Err(JsonError::UnexpectedEnd));
        assert_eq!(parse("@"), Err(JsonError::InvalidToken));
        assert_eq!(parse("\"open"), Err(JsonError::UnterminatedString));
        assert_eq!(parse("{\"k\" 1}"), Err(JsonError::ExpectedColon));
        assert_eq!(parse("{\"k\": 1"), Err(JsonError::UnterminatedObject));
        assert_eq!(parse("{\"k\": 1 x"), Err(JsonError::ExpectedObjectSeparator));
        assert_eq!(parse("[1, 2"), Err(JsonError::UnterminatedArray));
        assert_eq!(parse("[1 2]"), Err(JsonError::ExpectedArraySeparator));
        assert_eq!(parse("tru"), Err(JsonError::InvalidBool));
        assert_eq!(parse("nul"), Err(JsonError::InvalidNull));
        assert_eq!(parse("{1: 2}"), Err(JsonError::ExpectedString));
        assert_eq!(parse("1 garbage"), Err(JsonError::TrailingCharacters));
    }

    #[test]
    fn number_runs_greedily_before_validation() {
        assert_eq!(parse("1.2.3"), Err(JsonError::InvalidNumber));
    }
}
