//! Lua table literal reader
//!
//! KOReader stores per-book settings as a Lua chunk of the form
//! `return { ["key"] = value, ... }`. This module reads that data subset
//! (tables, strings, numbers, booleans, `nil`) into a [`serde_json::Value`].
//!
//! # Conversion
//!
//! - A table whose keys are exactly `1..=n` becomes a JSON array in key order.
//! - Any other table becomes an object; integer keys are written in decimal.
//! - An empty table becomes an empty array.
//! - Fields assigned `nil` are dropped, as they would be in Lua.
//!
//! # Limitations
//!
//! Only literals are understood. Expressions, function calls and variables
//! are rejected with an error.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Lua table parsing error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Lua error at line {line}: {message}")]
pub struct LuaTableError {
    pub message: String,
    pub line: usize,
}

/// Parse a `return <value>` chunk (the `return` is optional)
pub fn parse_lua_table(content: &str) -> Result<Value, LuaTableError> {
    let mut parser = LuaParser::new(content);
    parser.parse_chunk()
}

/// Table key as written in the source
#[derive(Debug, Clone, PartialEq)]
enum Key {
    Index(i64),
    Name(String),
}

struct LuaParser<'a> {
    content: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> LuaParser<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            content,
            pos: 0,
            line: 1,
        }
    }

    fn parse_chunk(&mut self) -> Result<Value, LuaTableError> {
        self.skip_whitespace();
        if self.consume_keyword("return") {
            self.skip_whitespace();
        }

        let value = self.parse_value()?.unwrap_or(Value::Null);

        self.consume_char(';');
        self.skip_whitespace();
        if !self.is_eof() {
            return Err(self.error("Unexpected trailing input"));
        }
        Ok(value)
    }

    /// `None` stands for `nil`
    fn parse_value(&mut self) -> Result<Option<Value>, LuaTableError> {
        self.skip_whitespace();

        match self.peek_char() {
            Some('{') => self.parse_table().map(Some),
            Some('"') | Some('\'') => Ok(Some(Value::String(self.parse_quoted_string()?))),
            Some('[') if self.long_bracket_level().is_some() => {
                Ok(Some(Value::String(self.parse_long_string()?)))
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '.' => {
                self.parse_number().map(Some)
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                let word = self.parse_identifier()?;
                match word.as_str() {
                    "nil" => Ok(None),
                    "true" => Ok(Some(Value::Bool(true))),
                    "false" => Ok(Some(Value::Bool(false))),
                    _ => Err(self.error(&format!("Unsupported expression '{}'", word))),
                }
            }
            Some(c) => Err(self.error(&format!("Unexpected character '{}'", c))),
            None => Err(self.error("Unexpected end of input")),
        }
    }

    fn parse_table(&mut self) -> Result<Value, LuaTableError> {
        if !self.consume_char('{') {
            return Err(self.error("Expected '{'"));
        }

        let mut entries: Vec<(Key, Value)> = Vec::new();
        let mut next_index = 1i64;

        loop {
            self.skip_whitespace();
            if self.consume_char('}') {
                break;
            }

            let (key, value) = self.parse_field(&mut next_index)?;
            if let Some(value) = value {
                entries.retain(|(existing, _)| *existing != key);
                entries.push((key, value));
            }

            self.skip_whitespace();
            if self.consume_char(',') || self.consume_char(';') {
                continue;
            }
            if self.consume_char('}') {
                break;
            }
            return Err(self.error("Expected ',' or '}' in table"));
        }

        Ok(table_to_json(entries))
    }

    fn parse_field(&mut self, next_index: &mut i64) -> Result<(Key, Option<Value>), LuaTableError> {
        self.skip_whitespace();

        // [expr] = value
        if self.peek_char() == Some('[') && self.long_bracket_level().is_none() {
            self.advance();
            let key = match self.parse_value()? {
                Some(Value::String(name)) => Key::Name(name),
                Some(Value::Number(n)) => match n.as_i64() {
                    Some(index) => Key::Index(index),
                    None => Key::Name(n.to_string()),
                },
                Some(Value::Bool(b)) => Key::Name(b.to_string()),
                _ => return Err(self.error("Unsupported table key")),
            };
            if !self.consume_char(']') {
                return Err(self.error("Expected ']'"));
            }
            if !self.consume_assign() {
                return Err(self.error("Expected '='"));
            }
            return Ok((key, self.parse_value()?));
        }

        // name = value
        let start = (self.pos, self.line);
        if matches!(self.peek_char(), Some(c) if c.is_alphabetic() || c == '_') {
            let name = self.parse_identifier()?;
            if self.consume_assign() {
                return Ok((Key::Name(name), self.parse_value()?));
            }
            (self.pos, self.line) = start;
        }

        // positional value
        let key = Key::Index(*next_index);
        *next_index += 1;
        Ok((key, self.parse_value()?))
    }

    fn parse_quoted_string(&mut self) -> Result<String, LuaTableError> {
        let Some(quote) = self.peek_char() else {
            return Err(self.error("Expected string"));
        };
        self.advance();

        let mut bytes: Vec<u8> = Vec::new();
        loop {
            match self.peek_char() {
                None | Some('\n') => return Err(self.error("Unterminated string")),
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    self.parse_escape(&mut bytes)?;
                }
                Some(c) => {
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    self.advance();
                }
            }
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn parse_escape(&mut self, bytes: &mut Vec<u8>) -> Result<(), LuaTableError> {
        let Some(c) = self.peek_char() else {
            return Err(self.error("Unterminated escape"));
        };
        self.advance();

        match c {
            'n' => bytes.push(b'\n'),
            't' => bytes.push(b'\t'),
            'r' => bytes.push(b'\r'),
            'a' => bytes.push(0x07),
            'b' => bytes.push(0x08),
            'f' => bytes.push(0x0C),
            'v' => bytes.push(0x0B),
            '\\' | '"' | '\'' => bytes.push(c as u8),
            '\n' => {
                self.line += 1;
                bytes.push(b'\n');
            }
            'z' => {
                while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
                    if self.peek_char() == Some('\n') {
                        self.line += 1;
                    }
                    self.advance();
                }
            }
            'x' => {
                let hex = self.take_while_max(2, |c| c.is_ascii_hexdigit());
                let value = u8::from_str_radix(&hex, 16)
                    .map_err(|_| self.error("Invalid \\x escape"))?;
                bytes.push(value);
            }
            'u' => {
                if !self.consume_char('{') {
                    return Err(self.error("Expected '{' in \\u escape"));
                }
                let hex = self.take_while_max(8, |c| c.is_ascii_hexdigit());
                if !self.consume_char('}') {
                    return Err(self.error("Expected '}' in \\u escape"));
                }
                let ch = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error("Invalid \\u escape"))?;
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            d if d.is_ascii_digit() => {
                let mut digits = d.to_string();
                digits.push_str(&self.take_while_max(2, |c| c.is_ascii_digit()));
                let value: u8 = digits
                    .parse()
                    .map_err(|_| self.error("Decimal escape too large"))?;
                bytes.push(value);
            }
            other => return Err(self.error(&format!("Invalid escape '\\{}'", other))),
        }
        Ok(())
    }

    /// `[[...]]` or `[==[...]==]`; a newline right after the opener is skipped
    fn parse_long_string(&mut self) -> Result<String, LuaTableError> {
        let Some(level) = self.long_bracket_level() else {
            return Err(self.error("Expected long string"));
        };
        self.pos += level + 2;

        if self.content[self.pos..].starts_with("\r\n") {
            self.pos += 2;
            self.line += 1;
        } else if self.peek_char() == Some('\n') {
            self.advance();
            self.line += 1;
        }

        let closing = format!("]{}]", "=".repeat(level));
        let Some(end) = self.content[self.pos..].find(&closing) else {
            return Err(self.error("Unterminated long string"));
        };

        let text = &self.content[self.pos..self.pos + end];
        self.line += text.matches('\n').count();
        self.pos += end + closing.len();
        Ok(text.to_string())
    }

    /// Level of a long bracket opener at the cursor (`[[` is 0, `[=[` is 1)
    fn long_bracket_level(&self) -> Option<usize> {
        let rest = self.content[self.pos..].strip_prefix('[')?;
        let level = rest.chars().take_while(|&c| c == '=').count();
        rest[level..].starts_with('[').then_some(level)
    }

    fn parse_number(&mut self) -> Result<Value, LuaTableError> {
        let negative = self.consume_char('-');
        self.skip_whitespace();

        let rest = &self.content[self.pos..];
        if rest.starts_with("0x") || rest.starts_with("0X") {
            self.pos += 2;
            let hex = self.take_while_max(16, |c| c.is_ascii_hexdigit());
            let value =
                i64::from_str_radix(&hex, 16).map_err(|_| self.error("Invalid hex number"))?;
            return Ok(Value::from(if negative { -value } else { value }));
        }

        let mut literal = String::new();
        while let Some(c) = self.peek_char() {
            let exponent_sign = (c == '-' || c == '+') && literal.ends_with(['e', 'E']);
            if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                literal.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if literal.is_empty() {
            return Err(self.error("Expected number"));
        }

        if let Ok(value) = literal.parse::<i64>() {
            return Ok(Value::from(if negative { -value } else { value }));
        }
        let value: f64 = literal
            .parse()
            .map_err(|_| self.error(&format!("Invalid number '{}'", literal)))?;
        let value = if negative { -value } else { value };
        Ok(Number::from_f64(value).map_or(Value::Null, Value::Number))
    }

    fn parse_identifier(&mut self) -> Result<String, LuaTableError> {
        let result = self.take_while_max(usize::MAX, |c| c.is_alphanumeric() || c == '_');
        if result.is_empty() {
            Err(self.error("Expected identifier"))
        } else {
            Ok(result)
        }
    }

    fn take_while_max(&mut self, max: usize, accept: impl Fn(char) -> bool) -> String {
        let mut result = String::new();
        while let Some(c) = self.peek_char() {
            if result.len() >= max || !accept(c) {
                break;
            }
            result.push(c);
            self.advance();
        }
        result
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    self.advance();
                }
                Some('-') if self.content[self.pos..].starts_with("--") => {
                    self.pos += 2;
                    if self.long_bracket_level().is_some() {
                        // Block comment; an unterminated one runs to the end
                        if self.parse_long_string().is_err() {
                            self.pos = self.content.len();
                        }
                    } else {
                        while let Some(c) = self.peek_char() {
                            if c == '\n' {
                                break;
                            }
                            self.advance();
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        let Some(after) = self.content[self.pos..].strip_prefix(keyword) else {
            return false;
        };
        let boundary = after
            .chars()
            .next()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
        if boundary {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    /// `=` but not `==`
    fn consume_assign(&mut self) -> bool {
        self.skip_whitespace();
        let rest = &self.content[self.pos..];
        if rest.starts_with('=') && !rest.starts_with("==") {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_char(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.content[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.content.len()
    }

    fn error(&self, message: &str) -> LuaTableError {
        LuaTableError {
            message: message.to_string(),
            line: self.line,
        }
    }
}

fn table_to_json(mut entries: Vec<(Key, Value)>) -> Value {
    let len = entries.len() as i64;
    let is_sequence = entries
        .iter()
        .all(|(key, _)| matches!(key, Key::Index(i) if (1..=len).contains(i)));

    if is_sequence {
        entries.sort_by_key(|(key, _)| match key {
            Key::Index(i) => *i,
            Key::Name(_) => 0,
        });
        return Value::Array(entries.into_iter().map(|(_, value)| value).collect());
    }

    let mut object = Map::new();
    for (key, value) in entries {
        let name = match key {
            Key::Index(i) => i.to_string(),
            Key::Name(name) => name,
        };
        object.insert(name, value);
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_koreader_sidecar() {
        let lua = r#"-- we can read Lua syntax here!
return {
    ["bookmarks"] = {
        [1] = {
            ["datetime"] = "2024-01-05 10:12:44",
            ["notes"] = "the quick brown fox",
            ["page"] = 3,
            ["text"] = "Page 3 the quick brown fox @ 2024-01-05",
        },
        [2] = {
            ["notes"] = "jumps over",
            ["page"] = 1,
        },
    },
    ["doc_props"] = {
        ["title"] = "A Book",
    },
    ["percent_finished"] = 0.25,
}
"#;

        let value = parse_lua_table(lua).unwrap();
        assert_eq!(value["bookmarks"][0]["page"], 3);
        assert_eq!(value["bookmarks"][0]["notes"], "the quick brown fox");
        assert_eq!(value["bookmarks"][1]["notes"], "jumps over");
        assert_eq!(value["doc_props"]["title"], "A Book");
        assert_eq!(value["percent_finished"], 0.25);
    }

    #[test]
    fn test_sequences_become_arrays() {
        assert_eq!(parse_lua_table("return { 'a', 'b', 'c' }").unwrap(), json!(["a", "b", "c"]));
        assert_eq!(
            parse_lua_table("return { [2] = 'b', [1] = 'a' }").unwrap(),
            json!(["a", "b"])
        );
        assert_eq!(parse_lua_table("return {}").unwrap(), json!([]));
    }

    #[test]
    fn test_sparse_tables_become_objects() {
        assert_eq!(
            parse_lua_table("return { [1] = 'a', [3] = 'c' }").unwrap(),
            json!({"1": "a", "3": "c"})
        );
        assert_eq!(
            parse_lua_table("return { name = 'x', [1] = true }").unwrap(),
            json!({"name": "x", "1": true})
        );
    }

    #[test]
    fn test_nil_fields_are_dropped() {
        assert_eq!(
            parse_lua_table("return { a = nil, b = false }").unwrap(),
            json!({"b": false})
        );
    }

    #[test]
    fn test_string_escapes() {
        let value = parse_lua_table(r#"return "tab\there \"q\" \65\066 \x43 \u{e9} it\'s""#).unwrap();
        assert_eq!(value, json!("tab\there \"q\" AB C é it's"));

        // %q style line continuation
        let value = parse_lua_table("return \"line one\\\nline two\"").unwrap();
        assert_eq!(value, json!("line one\nline two"));
    }

    #[test]
    fn test_long_strings_and_comments() {
        let lua = "--[[ block\ncomment ]] return { [[\nfirst]], [==[has ]] inside]==] } -- tail";
        assert_eq!(parse_lua_table(lua).unwrap(), json!(["first", "has ]] inside"]));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            parse_lua_table("return { 7, -3, 0x1F, 1.5, -2.5e2, 1e3 }").unwrap(),
            json!([7, -3, 31, 1.5, -250.0, 1000.0])
        );
    }

    #[test]
    fn test_errors_report_line() {
        let err = parse_lua_table("return {\n  a = 1,\n  b = os.time(),\n}").unwrap_err();
        assert_eq!(err.line, 3);

        let err = parse_lua_table("return { \"open").unwrap_err();
        assert!(err.message.contains("Unterminated"));

        assert!(parse_lua_table("return { 1 } extra").is_err());
        assert!(parse_lua_table("return { 1 2 }").is_err());
    }
}
