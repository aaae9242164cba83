//! Content stream tokenisation into operations.

use crate::parser::lexer::{find_bytes, is_whitespace};
use crate::parser::{Lexer, ObjectParser, PdfValue, Token};

/// Operand stacks deeper than this are truncated from the bottom.
const MAX_OPERANDS: usize = 1024;

/// Operators the interpreter acts on. Everything else is [`Operator::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `q`
    Save,
    /// `Q`
    Restore,
    /// `cm`
    Concat,
    /// `BT`
    BeginText,
    /// `ET`
    EndText,
    /// `Tc`
    CharSpacing,
    /// `Tw`
    WordSpacing,
    /// `Tz`
    HorizontalScale,
    /// `TL`
    Leading,
    /// `Tf`
    SetFont,
    /// `Tr`
    RenderMode,
    /// `Ts`
    Rise,
    /// `Td`
    MoveText,
    /// `TD`
    MoveTextSetLeading,
    /// `Tm`
    SetTextMatrix,
    /// `T*`
    NextLine,
    /// `Tj`
    ShowText,
    /// `TJ`
    ShowTextArray,
    /// `'`
    NextLineShowText,
    /// `"`
    NextLineShowTextSpaced,
    /// `Do`
    PaintXObject,
    /// `BI ... ID ... EI`, already skipped
    InlineImage,
    /// Any operator without a text-extraction meaning
    Other,
}

impl Operator {
    pub fn from_keyword(keyword: &[u8]) -> Self {
        match keyword {
            b"q" => Self::Save,
            b"Q" => Self::Restore,
            b"cm" => Self::Concat,
            b"BT" => Self::BeginText,
            b"ET" => Self::EndText,
            b"Tc" => Self::CharSpacing,
            b"Tw" => Self::WordSpacing,
            b"Tz" => Self::HorizontalScale,
            b"TL" => Self::Leading,
            b"Tf" => Self::SetFont,
            b"Tr" => Self::RenderMode,
            b"Ts" => Self::Rise,
            b"Td" => Self::MoveText,
            b"TD" => Self::MoveTextSetLeading,
            b"Tm" => Self::SetTextMatrix,
            b"T*" => Self::NextLine,
            b"Tj" => Self::ShowText,
            b"TJ" => Self::ShowTextArray,
            b"'" => Self::NextLineShowText,
            b"\"" => Self::NextLineShowTextSpaced,
            b"Do" => Self::PaintXObject,
            _ => Self::Other,
        }
    }
}

/// An operator with the operands that preceded it.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: Operator,
    pub operands: Vec<PdfValue>,
}

/// Result of tokenising one content stream.
#[derive(Debug, Default)]
pub struct ContentOps {
    pub operations: Vec<Operation>,
    /// Bytes or tokens that could not be read and were skipped
    pub malformed: usize,
}

/// Split a content stream into operations.
///
/// Never fails: unreadable bytes are skipped and counted.
pub fn parse_content(data: &[u8]) -> ContentOps {
    let mut out = ContentOps::default();
    let mut operands: Vec<PdfValue> = Vec::new();
    let mut lexer = Lexer::new(data);

    loop {
        lexer.skip_whitespace();
        let pos = lexer.pos();
        let token = match lexer.peek_token() {
            Ok(Some(token)) => token,
            Ok(None) => break,
            Err(_) => {
                out.malformed += 1;
                lexer.set_pos(pos + 1);
                continue;
            }
        };

        match token {
            Token::Keyword(word) if !matches!(word, b"true" | b"false" | b"null") => {
                let _ = lexer.next_token();
                if matches!(word, b"BI") {
                    lexer.set_pos(skip_inline_image(data, lexer.pos()));
                    operands.clear();
                    out.operations.push(Operation {
                        operator: Operator::InlineImage,
                        operands: Vec::new(),
                    });
                    continue;
                }
                let operator = Operator::from_keyword(word);
                let operands = std::mem::take(&mut operands);
                if operator != Operator::Other {
                    out.operations.push(Operation { operator, operands });
                }
            }
            Token::ArrayEnd | Token::DictEnd => {
                out.malformed += 1;
                let _ = lexer.next_token();
            }
            _ => {
                let mut parser = ObjectParser::new(data, pos);
                match parser.parse_value() {
                    Ok(value) => {
                        if operands.len() >= MAX_OPERANDS {
                            operands.remove(0);
                        }
                        operands.push(value);
                        lexer.set_pos(parser.pos());
                    }
                    Err(_) => {
                        out.malformed += 1;
                        lexer.set_pos(pos + 1);
                    }
                }
            }
        }
    }

    out
}

/// Position just past the `EI` that ends an inline image starting at `pos`.
fn skip_inline_image(data: &[u8], pos: usize) -> usize {
    // The image dictionary runs up to the `ID` keyword.
    let mut lexer = Lexer::at(data, pos);
    let data_start = loop {
        match lexer.next_token() {
            Ok(Some(Token::Keyword(b"ID"))) => break lexer.pos() + 1,
            Ok(Some(_)) => {}
            Ok(None) => return data.len(),
            Err(_) => lexer.set_pos(lexer.pos() + 1),
        }
    };

    let mut search = data_start.min(data.len());
    while let Some(found) = find_bytes(data, b"EI", search) {
        let before_ok = found > 0 && is_whitespace(data[found - 1]);
        let after_ok = data.get(found + 2).map_or(true, |&b| is_whitespace(b));
        if before_ok && after_ok {
            return found + 2;
        }
        search = found + 2;
    }
    data.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operators(data: &[u8]) -> Vec<Operator> {
        parse_content(data).operations.into_iter().map(|op| op.operator).collect()
    }

    #[test]
    fn test_basic_text_object() {
        let ops = parse_content(b"BT /F1 12 Tf 72 700 Td (Hello) Tj ET");
        assert_eq!(ops.malformed, 0);
        let kinds: Vec<_> = ops.operations.iter().map(|op| op.operator).collect();
        assert_eq!(
            kinds,
            vec![
                Operator::BeginText,
                Operator::SetFont,
                Operator::MoveText,
                Operator::ShowText,
                Operator::EndText
            ]
        );
        assert_eq!(
            ops.operations[1].operands,
            vec![PdfValue::Name("F1".into()), PdfValue::Integer(12)]
        );
        assert_eq!(ops.operations[3].operands, vec![PdfValue::String(b"Hello".to_vec())]);
    }

    #[test]
    fn test_array_operand() {
        let ops = parse_content(b"[(A) -120 (B)] TJ");
        assert_eq!(ops.operations.len(), 1);
        let PdfValue::Array(items) = &ops.operations[0].operands[0] else {
            panic!("expected array operand");
        };
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_unknown_operators_drop_operands() {
        assert_eq!(
            operators(b"1 0 0 RG 0 0 100 100 re f BT ET"),
            vec![Operator::BeginText, Operator::EndText]
        );
        let ops = parse_content(b"1 2 foo (x) Tj");
        assert_eq!(ops.operations[0].operands.len(), 1);
    }

    #[test]
    fn test_quote_operators() {
        assert_eq!(
            operators(b"(a) ' 1 2 (b) \" T*"),
            vec![
                Operator::NextLineShowText,
                Operator::NextLineShowTextSpaced,
                Operator::NextLine
            ]
        );
    }

    #[test]
    fn test_inline_image_is_skipped() {
        let content = b"q BI /W 2 /H 1 /BPC 8 /CS /G ID \x00EI\xff EI Q (after) Tj";
        assert_eq!(
            operators(content),
            vec![
                Operator::Save,
                Operator::InlineImage,
                Operator::Restore,
                Operator::ShowText
            ]
        );
    }

    #[test]
    fn test_garbage_is_skipped() {
        let ops = parse_content(b") ] (ok) Tj >>");
        assert_eq!(ops.operations.len(), 1);
        assert!(ops.malformed >= 2);
    }

    #[test]
    fn test_booleans_are_operands() {
        let ops = parse_content(b"true false null Tj");
        assert_eq!(ops.operations[0].operands.len(), 3);
    }
}
