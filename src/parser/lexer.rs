//! Tokenizer for the PDF lexical grammar.
//!
//! Shared by the object parser and the content-stream interpreter. The lexer
//! is lenient: it never panics on malformed input and reports the offset of
//! anything it cannot make sense of.

use crate::error::ParseError;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    Integer(i64),
    Real(f64),
    /// Literal `( )` or hexadecimal `< >` string, unescaped.
    String(Vec<u8>),
    /// Name without the leading slash, `#xx` escapes decoded.
    Name(String),
    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,
    /// Any other run of regular characters: `obj`, `R`, `true`, operators, ...
    Keyword(&'a [u8]),
}

/// Whitespace per ISO 32000 table 1.
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

/// Delimiters per ISO 32000 table 2.
pub fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Byte-level cursor producing [`Token`]s.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Start lexing at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos: pos.min(data.len()),
        }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Skip whitespace and `%` comments.
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek_byte() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(c) = self.peek_byte() {
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Skip a single end-of-line marker (`\r\n`, `\n` or `\r`) if present.
    pub fn skip_eol(&mut self) {
        match self.peek_byte() {
            Some(b'\r') => {
                self.pos += 1;
                if self.peek_byte() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            Some(b'\n') => self.pos += 1,
            _ => {}
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek_token(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        let saved = self.pos;
        let token = self.next_token();
        self.pos = saved;
        token
    }

    /// Read the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        self.skip_whitespace();
        let Some(b) = self.peek_byte() else {
            return Ok(None);
        };
        let start = self.pos;

        let token = match b {
            b'(' => {
                self.pos += 1;
                Token::String(self.read_literal_string())
            }
            b'<' => {
                if self.data.get(start + 1) == Some(&b'<') {
                    self.pos += 2;
                    Token::DictStart
                } else {
                    self.pos += 1;
                    Token::String(self.read_hex_string())
                }
            }
            b'>' => {
                if self.data.get(start + 1) == Some(&b'>') {
                    self.pos += 2;
                    Token::DictEnd
                } else {
                    return Err(ParseError::UnexpectedToken {
                        offset: start,
                        expected: "'>>'",
                    });
                }
            }
            b'[' => {
                self.pos += 1;
                Token::ArrayStart
            }
            b']' => {
                self.pos += 1;
                Token::ArrayEnd
            }
            b'{' | b'}' | b')' => {
                self.pos += 1;
                Token::Keyword(&self.data[start..start + 1])
            }
            b'/' => {
                self.pos += 1;
                Token::Name(self.read_name())
            }
            _ => {
                while self.peek_byte().is_some_and(is_regular) {
                    self.pos += 1;
                }
                let word = &self.data[start..self.pos];
                parse_number(word).unwrap_or(Token::Keyword(word))
            }
        };

        Ok(Some(token))
    }

    fn read_literal_string(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut depth = 1usize;

        while let Some(b) = self.peek_byte() {
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return out;
                    }
                    out.push(b);
                }
                b'\\' => self.read_escape(&mut out),
                b'\r' => {
                    // Bare CR and CRLF both read as LF.
                    if self.peek_byte() == Some(b'\n') {
                        self.pos += 1;
                    }
                    out.push(b'\n');
                }
                _ => out.push(b),
            }
        }

        log::debug!("unterminated literal string");
        out
    }

    fn read_escape(&mut self, out: &mut Vec<u8>) {
        let Some(b) = self.peek_byte() else {
            return;
        };
        self.pos += 1;

        match b {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'(' | b')' | b'\\' => out.push(b),
            b'\r' => {
                if self.peek_byte() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            b'\n' => {}
            b'0'..=b'7' => {
                let mut value = u32::from(b - b'0');
                for _ in 0..2 {
                    match self.peek_byte() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            }
            // Unknown escapes drop the backslash.
            _ => out.push(b),
        }
    }

    fn read_hex_string(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut high: Option<u8> = None;

        while let Some(b) = self.peek_byte() {
            self.pos += 1;
            if b == b'>' {
                break;
            }
            let Some(nibble) = hex_value(b) else {
                continue;
            };
            match high.take() {
                Some(h) => out.push((h << 4) | nibble),
                None => high = Some(nibble),
            }
        }

        if let Some(h) = high {
            out.push(h << 4);
        }
        out
    }

    fn read_name(&mut self) -> String {
        let mut bytes = Vec::new();

        while let Some(b) = self.peek_byte() {
            if !is_regular(b) {
                break;
            }
            self.pos += 1;
            if b == b'#' {
                let hi = self.data.get(self.pos).copied().and_then(hex_value);
                let lo = self.data.get(self.pos + 1).copied().and_then(hex_value);
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    bytes.push((hi << 4) | lo);
                    self.pos += 2;
                    continue;
                }
            }
            bytes.push(b);
        }

        match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
        }
    }
}

/// Value of an ASCII hex digit.
pub fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn parse_number(word: &[u8]) -> Option<Token<'static>> {
    let first = *word.first()?;
    if !(first.is_ascii_digit() || matches!(first, b'+' | b'-' | b'.')) {
        return None;
    }
    let body = word
        .iter()
        .skip(usize::from(matches!(first, b'+' | b'-')))
        .copied()
        .collect::<Vec<_>>();
    if body.is_empty() || !body.iter().any(u8::is_ascii_digit) {
        return None;
    }
    if !body.iter().all(|b| b.is_ascii_digit() || *b == b'.') {
        return None;
    }

    let text = std::str::from_utf8(word).ok()?;
    if !body.contains(&b'.') {
        if let Ok(i) = text.parse::<i64>() {
            return Some(Token::Integer(i));
        }
    }

    // Tolerate producers that write "1.2.3" or a trailing sign by keeping
    // the longest valid prefix.
    let mut end = text.len();
    while end > 0 {
        if let Ok(r) = text[..end].parse::<f64>() {
            return Some(Token::Real(r));
        }
        end -= 1;
    }
    Some(Token::Real(0.0))
}

/// Find `needle` in `haystack` starting at `from`.
pub fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Find the last occurrence of `needle` in `haystack`.
pub fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8]) -> Vec<Token<'_>> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        while let Some(t) = lexer.next_token().unwrap() {
            out.push(t);
        }
        out
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens(b"12 -3 +4 0.5 -.25 4."),
            vec![
                Token::Integer(12),
                Token::Integer(-3),
                Token::Integer(4),
                Token::Real(0.5),
                Token::Real(-0.25),
                Token::Real(4.0),
            ]
        );
    }

    #[test]
    fn test_literal_string_escapes() {
        let t = tokens(b"(a\\(b\\) \\101 (nested) line\\\ncont)");
        assert_eq!(t, vec![Token::String(b"a(b) A (nested) linecont".to_vec())]);
    }

    #[test]
    fn test_hex_string_odd_length() {
        assert_eq!(tokens(b"<48 65 6C6C 6F7>"), vec![Token::String(b"Hellop".to_vec())]);
    }

    #[test]
    fn test_name_escapes() {
        assert_eq!(tokens(b"/A#20B"), vec![Token::Name("A B".into())]);
    }

    #[test]
    fn test_dict_and_keywords() {
        assert_eq!(
            tokens(b"<< /Type /Page >> 1 0 R % comment\nendobj"),
            vec![
                Token::DictStart,
                Token::Name("Type".into()),
                Token::Name("Page".into()),
                Token::DictEnd,
                Token::Integer(1),
                Token::Integer(0),
                Token::Keyword(b"R"),
                Token::Keyword(b"endobj"),
            ]
        );
    }

    #[test]
    fn test_operators_are_keywords() {
        assert_eq!(
            tokens(b"T* ' \" Tj"),
            vec![
                Token::Keyword(b"T*"),
                Token::Keyword(b"'"),
                Token::Keyword(b"\""),
                Token::Keyword(b"Tj"),
            ]
        );
    }

    #[test]
    fn test_find_bytes() {
        assert_eq!(find_bytes(b"abcabc", b"bc", 2), Some(4));
        assert_eq!(rfind_bytes(b"abcabc", b"bc"), Some(4));
        assert_eq!(find_bytes(b"abc", b"x", 0), None);
    }
}
