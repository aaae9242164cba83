//! Object syntax: values, indirect objects and stream bodies.

use super::lexer::{find_bytes, is_whitespace, Lexer, Token};
use super::object::{Dict, ObjRef, PdfValue, Stream};
use crate::error::ParseError;

/// Arrays and dictionaries nested deeper than this are rejected.
const MAX_NESTING: usize = 256;

/// Parser for PDF values on top of [`Lexer`].
pub struct ObjectParser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> ObjectParser<'a> {
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self {
            lexer: Lexer::at(data, pos),
        }
    }

    pub fn pos(&self) -> usize {
        self.lexer.pos()
    }

    /// Parse a single direct value.
    pub fn parse_value(&mut self) -> Result<PdfValue, ParseError> {
        let token = self.next_required()?;
        self.value_from(token, 0)
    }

    /// Parse `n g obj <value> [stream ... endstream] endobj`.
    ///
    /// `resolve_length` is asked for the value of an indirect `/Length`.
    pub fn parse_indirect(
        &mut self,
        resolve_length: &dyn Fn(ObjRef) -> Option<i64>,
    ) -> Result<(ObjRef, PdfValue), ParseError> {
        let start = self.lexer.pos();
        let num = self.expect_integer("object number")?;
        let gen = self.expect_integer("generation number")?;
        self.expect_keyword(b"obj")?;

        let id = match (u32::try_from(num), u16::try_from(gen)) {
            (Ok(num), Ok(gen)) => ObjRef::new(num, gen),
            _ => {
                return Err(ParseError::UnexpectedToken {
                    offset: start,
                    expected: "object header",
                })
            }
        };

        let value = match self.lexer.peek_token()? {
            // `n g obj endobj` is an empty object
            Some(Token::Keyword(b"endobj")) => PdfValue::Null,
            _ => self.parse_value()?,
        };

        let value = match (value, self.lexer.peek_token()?) {
            (PdfValue::Dictionary(dict), Some(Token::Keyword(b"stream"))) => {
                self.lexer.next_token()?;
                let data = self.read_stream_body(&dict, resolve_length)?;
                PdfValue::Stream(Stream::new(dict, data))
            }
            (value, _) => value,
        };

        if let Some(Token::Keyword(b"endobj")) = self.lexer.peek_token()? {
            self.lexer.next_token()?;
        }

        Ok((id, value))
    }

    fn read_stream_body(
        &mut self,
        dict: &Dict,
        resolve_length: &dyn Fn(ObjRef) -> Option<i64>,
    ) -> Result<Vec<u8>, ParseError> {
        // `stream` is followed by CRLF or LF; tolerate a lone CR or spaces.
        let data = self.lexer.data();
        let mut start = self.lexer.pos();
        while data.get(start) == Some(&b' ') {
            start += 1;
        }
        self.lexer.set_pos(start);
        self.lexer.skip_eol();
        let start = self.lexer.pos();

        let declared = match dict.get("Length") {
            Some(PdfValue::Reference(r)) => resolve_length(*r),
            Some(v) => v.as_i64(),
            None => None,
        };

        if let Some(len) = declared.and_then(|l| usize::try_from(l).ok()) {
            if let Some(end) = start.checked_add(len) {
                if end <= data.len() && followed_by_endstream(data, end) {
                    self.lexer.set_pos(end);
                    self.expect_keyword(b"endstream")?;
                    return Ok(data[start..end].to_vec());
                }
            }
            log::debug!("stream /Length {} does not match, scanning for endstream", len);
        }

        let Some(marker) = find_bytes(data, b"endstream", start) else {
            return Err(ParseError::UnexpectedEof);
        };
        let mut end = marker;
        if end > start && data[end - 1] == b'\n' {
            end -= 1;
        }
        if end > start && data[end - 1] == b'\r' {
            end -= 1;
        }
        self.lexer.set_pos(marker + b"endstream".len());
        Ok(data[start..end].to_vec())
    }

    fn next_required(&mut self) -> Result<Token<'a>, ParseError> {
        self.lexer.next_token()?.ok_or(ParseError::UnexpectedEof)
    }

    fn expect_integer(&mut self, expected: &'static str) -> Result<i64, ParseError> {
        let offset = self.lexer.pos();
        match self.next_required()? {
            Token::Integer(i) => Ok(i),
            _ => Err(ParseError::UnexpectedToken { offset, expected }),
        }
    }

    fn expect_keyword(&mut self, keyword: &'static [u8]) -> Result<(), ParseError> {
        let offset = self.lexer.pos();
        match self.next_required()? {
            Token::Keyword(k) if k == keyword => Ok(()),
            _ => Err(ParseError::UnexpectedToken {
                offset,
                expected: keyword_name(keyword),
            }),
        }
    }

    fn value_from(&mut self, token: Token<'a>, depth: usize) -> Result<PdfValue, ParseError> {
        if depth > MAX_NESTING {
            return Err(ParseError::UnexpectedToken {
                offset: self.lexer.pos(),
                expected: "shallower nesting",
            });
        }

        Ok(match token {
            Token::Integer(num) => self.maybe_reference(num),
            Token::Real(r) => PdfValue::Real(r),
            Token::String(s) => PdfValue::String(s),
            Token::Name(n) => PdfValue::Name(n),
            Token::ArrayStart => self.parse_array(depth)?,
            Token::DictStart => self.parse_dict(depth)?,
            Token::Keyword(b"true") => PdfValue::Boolean(true),
            Token::Keyword(b"false") => PdfValue::Boolean(false),
            Token::Keyword(b"null") => PdfValue::Null,
            Token::Keyword(_) | Token::ArrayEnd | Token::DictEnd => {
                return Err(ParseError::UnexpectedToken {
                    offset: self.lexer.pos(),
                    expected: "value",
                })
            }
        })
    }

    /// `n g R` lookahead after an integer.
    fn maybe_reference(&mut self, num: i64) -> PdfValue {
        let saved = self.lexer.pos();
        let gen = self.lexer.next_token().ok().flatten();
        let keyword = self.lexer.next_token().ok().flatten();

        if let (Some(Token::Integer(gen)), Some(Token::Keyword(b"R"))) = (gen, keyword) {
            if let (Ok(num), Ok(gen)) = (u32::try_from(num), u16::try_from(gen)) {
                return PdfValue::Reference(ObjRef::new(num, gen));
            }
        }

        self.lexer.set_pos(saved);
        PdfValue::Integer(num)
    }

    fn parse_array(&mut self, depth: usize) -> Result<PdfValue, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.next_required()? {
                Token::ArrayEnd => return Ok(PdfValue::Array(items)),
                token => items.push(self.value_from(token, depth + 1)?),
            }
        }
    }

    fn parse_dict(&mut self, depth: usize) -> Result<PdfValue, ParseError> {
        let mut dict = Dict::new();
        loop {
            match self.next_required()? {
                Token::DictEnd => return Ok(PdfValue::Dictionary(dict)),
                Token::Name(key) => {
                    // A key immediately followed by `>>` has no value.
                    if let Some(Token::DictEnd) = self.lexer.peek_token()? {
                        continue;
                    }
                    let token = self.next_required()?;
                    let value = self.value_from(token, depth + 1)?;
                    if !value.is_null() {
                        dict.insert(key, value);
                    }
                }
                other => {
                    log::debug!("skipping non-name dictionary key {:?}", other);
                }
            }
        }
    }
}

fn followed_by_endstream(data: &[u8], mut pos: usize) -> bool {
    while pos < data.len() && is_whitespace(data[pos]) {
        pos += 1;
    }
    data[pos..].starts_with(b"endstream")
}

fn keyword_name(keyword: &[u8]) -> &'static str {
    match keyword {
        b"obj" => "'obj'",
        b"endstream" => "'endstream'",
        b"endobj" => "'endobj'",
        _ => "keyword",
    }
}

/// Parse one direct value from `data`.
pub fn parse_value(data: &[u8]) -> Result<PdfValue, ParseError> {
    ObjectParser::new(data, 0).parse_value()
}
