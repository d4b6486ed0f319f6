//! CSS selector parsing.
//! Reference: <https://www.w3.org/TR/selectors-3/>

use crate::{
    AttrOperator, AttributeSelector, Combinator, ComplexSelector, CompoundSelector, NthIndex,
    PseudoClass, SimpleSelector,
};
use thiserror::Error;

/// A selector that could not be parsed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid selector `{selector}`: {reason}")]
pub struct SelectorParseError {
    /// The offending selector text.
    pub selector: String,
    /// Short description of what went wrong.
    pub reason: &'static str,
}

/// Pseudo-elements that may be written with a single colon (CSS2 syntax).
const LEGACY_PSEUDO_ELEMENTS: [&str; 4] = ["before", "after", "first-line", "first-letter"];

/// Cursor over a selector string.
struct SelectorTokenizer<'input> {
    /// Underlying selector bytes.
    input_bytes: &'input [u8],
    /// Current cursor index into `input_bytes`.
    index: usize,
}

impl<'input> SelectorTokenizer<'input> {
    /// Construct a tokenizer from input.
    #[inline]
    const fn new(input: &'input str) -> Self {
        Self {
            input_bytes: input.as_bytes(),
            index: 0,
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.input_bytes.get(self.index).copied()
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input_bytes.get(self.index.saturating_add(offset)).copied()
    }

    #[inline]
    fn bump(&mut self) {
        self.index = self.index.saturating_add(1);
    }

    /// Consume `byte` if it is next.
    #[inline]
    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.bump();
            return true;
        }
        false
    }

    /// Skip ASCII whitespace, returning whether any was skipped.
    #[inline]
    fn skip_spaces(&mut self) -> bool {
        let start = self.index;
        while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            self.bump();
        }
        self.index != start
    }

    #[inline]
    const fn is_ident_byte(byte: u8) -> bool {
        byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte >= 0x80
    }

    #[inline]
    fn at_ident_start(&self) -> bool {
        match self.peek() {
            Some(b'\\') => true,
            Some(b'-') => self.peek_at(1).is_some_and(|byte| {
                byte == b'-' || byte == b'\\' || (Self::is_ident_byte(byte) && !byte.is_ascii_digit())
            }),
            Some(byte) => Self::is_ident_byte(byte) && !byte.is_ascii_digit(),
            None => false,
        }
    }

    /// Consume an identifier, resolving simple backslash escapes. Case is preserved.
    fn consume_ident(&mut self) -> String {
        let mut out = Vec::new();
        while let Some(byte) = self.peek() {
            if byte == b'\\' {
                self.bump();
                if let Some(escaped) = self.peek() {
                    out.push(escaped);
                    self.bump();
                }
            } else if Self::is_ident_byte(byte) {
                out.push(byte);
                self.bump();
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Consume a required identifier.
    fn expect_ident(&mut self, reason: &'static str) -> Result<String, &'static str> {
        if !self.at_ident_start() {
            return Err(reason);
        }
        Ok(self.consume_ident())
    }

    /// Consume a quoted string starting at the opening quote.
    fn consume_quoted(&mut self, quote: u8) -> Result<String, &'static str> {
        self.bump();
        let mut out = Vec::new();
        loop {
            match self.peek() {
                None => return Err("unterminated string"),
                Some(byte) if byte == quote => {
                    self.bump();
                    return Ok(String::from_utf8_lossy(&out).into_owned());
                }
                Some(b'\\') => {
                    self.bump();
                    if let Some(escaped) = self.peek() {
                        out.push(escaped);
                        self.bump();
                    }
                }
                Some(byte) => {
                    out.push(byte);
                    self.bump();
                }
            }
        }
    }

    /// Consume a balanced parenthesized argument, returning its inner text.
    fn consume_arguments(&mut self) -> Result<String, &'static str> {
        // skip '('
        self.bump();
        let start = self.index;
        let mut depth = 1_u32;
        while let Some(byte) = self.peek() {
            match byte {
                b'(' => depth = depth.saturating_add(1),
                b')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        let inner = self.input_bytes.get(start..self.index).unwrap_or(&[]);
                        let text = String::from_utf8_lossy(inner).into_owned();
                        self.bump();
                        return Ok(text);
                    }
                }
                _ => {}
            }
            self.bump();
        }
        Err("unbalanced parentheses")
    }

    /// Parse an attribute selector, starting at '['.
    fn consume_attr(&mut self) -> Result<SimpleSelector, &'static str> {
        // skip '['
        self.bump();
        self.skip_spaces();
        let name = self
            .expect_ident("expected attribute name")?
            .to_ascii_lowercase();
        self.skip_spaces();
        let operator = match self.peek() {
            Some(b']') => {
                self.bump();
                return Ok(SimpleSelector::Attribute(AttributeSelector {
                    name,
                    operator: AttrOperator::Exists,
                    value: String::new(),
                    case_insensitive: false,
                }));
            }
            Some(b'=') => AttrOperator::Equals,
            Some(b'~') => AttrOperator::Includes,
            Some(b'|') => AttrOperator::DashMatch,
            Some(b'^') => AttrOperator::Prefix,
            Some(b'$') => AttrOperator::Suffix,
            Some(b'*') => AttrOperator::Substring,
            _ => return Err("expected attribute operator"),
        };
        self.bump();
        if operator != AttrOperator::Equals && !self.eat(b'=') {
            return Err("expected '=' in attribute operator");
        }
        self.skip_spaces();
        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => self.consume_quoted(quote)?,
            _ => self.expect_ident("expected attribute value")?,
        };
        let had_space = self.skip_spaces();
        let mut case_insensitive = false;
        if had_space && matches!(self.peek(), Some(b'i' | b'I')) {
            self.bump();
            case_insensitive = true;
            self.skip_spaces();
        }
        if !self.eat(b']') {
            return Err("expected ']'");
        }
        Ok(SimpleSelector::Attribute(AttributeSelector {
            name,
            operator,
            value,
            case_insensitive,
        }))
    }

    /// Parse a pseudo-class or pseudo-element, starting at ':'.
    fn consume_pseudo(&mut self) -> Result<SimpleSelector, &'static str> {
        // skip ':'
        self.bump();
        if self.eat(b':') {
            let name = self.expect_ident("expected pseudo-element name")?;
            if self.peek() == Some(b'(') {
                self.consume_arguments()?;
            }
            return Ok(SimpleSelector::PseudoElement(name.to_ascii_lowercase()));
        }
        let name = self
            .expect_ident("expected pseudo-class name")?
            .to_ascii_lowercase();
        if LEGACY_PSEUDO_ELEMENTS.contains(&name.as_str()) {
            return Ok(SimpleSelector::PseudoElement(name));
        }
        if self.peek() == Some(b'(') {
            let arguments = self.consume_arguments()?;
            return functional_pseudo(name, &arguments);
        }
        let pseudo = match name.as_str() {
            "root" => PseudoClass::Root,
            "empty" => PseudoClass::Empty,
            "first-child" => PseudoClass::FirstChild,
            "last-child" => PseudoClass::LastChild,
            "only-child" => PseudoClass::OnlyChild,
            "first-of-type" => PseudoClass::FirstOfType,
            "last-of-type" => PseudoClass::LastOfType,
            "only-of-type" => PseudoClass::OnlyOfType,
            _ => PseudoClass::Unsupported(name),
        };
        Ok(SimpleSelector::PseudoClass(pseudo))
    }

    /// Parse a compound selector. Stops before whitespace, a combinator or the end.
    fn consume_compound(&mut self) -> Result<CompoundSelector, &'static str> {
        let mut compound = CompoundSelector::default();
        while let Some(byte) = self.peek() {
            let simple = match byte {
                b'*' => {
                    self.bump();
                    SimpleSelector::Universal
                }
                b'.' => {
                    self.bump();
                    SimpleSelector::Class(self.expect_ident("expected class name")?)
                }
                b'#' => {
                    self.bump();
                    SimpleSelector::IdSelector(self.expect_ident("expected id")?)
                }
                b'[' => self.consume_attr()?,
                b':' => self.consume_pseudo()?,
                b'>' | b'+' | b'~' | b',' => break,
                _ if byte.is_ascii_whitespace() => break,
                _ if self.at_ident_start() => {
                    if !compound.simples.is_empty() {
                        return Err("type selector must come first");
                    }
                    SimpleSelector::Type(self.consume_ident().to_ascii_lowercase())
                }
                _ => return Err("unexpected character"),
            };
            compound.simples.push(simple);
        }
        if compound.simples.is_empty() {
            return Err("empty compound selector");
        }
        Ok(compound)
    }
}

/// Build a functional pseudo-class from its name and raw argument text.
fn functional_pseudo(name: String, arguments: &str) -> Result<SimpleSelector, &'static str> {
    let pseudo = match name.as_str() {
        "not" => {
            let mut inner = SelectorTokenizer::new(arguments.trim());
            let compound = inner.consume_compound()?;
            if inner.peek().is_some() {
                return Err("`:not()` takes a single compound selector");
            }
            return Ok(SimpleSelector::Negation(compound));
        }
        "nth-child" => PseudoClass::NthChild(parse_nth(arguments)?),
        "nth-last-child" => PseudoClass::NthLastChild(parse_nth(arguments)?),
        "nth-of-type" => PseudoClass::NthOfType(parse_nth(arguments)?),
        "nth-last-of-type" => PseudoClass::NthLastOfType(parse_nth(arguments)?),
        _ => PseudoClass::Unsupported(name),
    };
    Ok(SimpleSelector::PseudoClass(pseudo))
}

/// Parse an `an+b` expression.
/// Section 6.6.5.2.
fn parse_nth(arguments: &str) -> Result<NthIndex, &'static str> {
    const INVALID: &str = "invalid an+b expression";
    let compact = arguments
        .chars()
        .filter(|character| !character.is_ascii_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match compact.as_str() {
        "odd" => {
            return Ok(NthIndex { step: 2, offset: 1 });
        }
        "even" => {
            return Ok(NthIndex { step: 2, offset: 0 });
        }
        _ => {}
    }
    let Some((step_text, offset_text)) = compact.split_once('n') else {
        let offset = compact.parse::<i32>().map_err(|_| INVALID)?;
        return Ok(NthIndex { step: 0, offset });
    };
    let step = match step_text {
        "" | "+" => 1,
        "-" => -1,
        other => other.parse::<i32>().map_err(|_| INVALID)?,
    };
    let offset = if offset_text.is_empty() {
        0
    } else if offset_text.starts_with(['+', '-']) {
        offset_text.parse::<i32>().map_err(|_| INVALID)?
    } else {
        return Err(INVALID);
    };
    Ok(NthIndex { step, offset })
}

/// Split a selector list on top-level commas, ignoring commas inside
/// parentheses, brackets and strings. Parts are trimmed.
pub fn split_selector_list(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_u32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut escaped = false;
    for (index, character) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, character) {
            (_, '\\') => escaped = true,
            (Some(open), _) if character == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(character),
            (None, '(' | '[') => depth = depth.saturating_add(1),
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(input.get(start..index).unwrap_or_default().trim());
                start = index.saturating_add(1);
            }
            _ => {}
        }
    }
    parts.push(input.get(start..).unwrap_or_default().trim());
    parts
}

/// Parse one complex selector.
/// Compounds of simple selectors (sections 5-8) joined by combinators (section 11).
///
/// # Errors
/// Returns a [`SelectorParseError`] describing the first syntax problem.
pub fn parse_complex_selector(input: &str) -> Result<ComplexSelector, SelectorParseError> {
    parse_complex_inner(input.trim()).map_err(|reason| SelectorParseError {
        selector: input.trim().to_owned(),
        reason,
    })
}

fn parse_complex_inner(input: &str) -> Result<ComplexSelector, &'static str> {
    let mut tokens = SelectorTokenizer::new(input);
    let first = tokens.consume_compound()?;
    let mut rest = Vec::new();
    loop {
        let saw_space = tokens.skip_spaces();
        let combinator = match tokens.peek() {
            None => break,
            Some(b'>') => Combinator::Child,
            Some(b'+') => Combinator::AdjacentSibling,
            Some(b'~') => Combinator::GeneralSibling,
            Some(b',') => return Err("unexpected ','"),
            Some(_) if saw_space => Combinator::Descendant,
            Some(_) => return Err("unexpected character"),
        };
        if combinator != Combinator::Descendant {
            tokens.bump();
            tokens.skip_spaces();
        }
        rest.push((combinator, tokens.consume_compound()?));
    }
    Ok(ComplexSelector { first, rest })
}
