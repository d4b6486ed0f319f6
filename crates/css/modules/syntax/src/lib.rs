//! CSS Syntax Module Level 3: Parsing and tokenization.
//! Reference: <https://www.w3.org/TR/css-syntax-3/>
//!
//! Stylesheets are parsed leniently: invalid rules and declarations are dropped
//! and parsing resumes at the next one. Declaration lists coming from `style`
//! attributes are parsed strictly with respect to at-rules, which are reported
//! as a [`SyntaxError`].
use cssparser::AtRuleParser as CssAtRuleParser;
use cssparser::BasicParseError;
use cssparser::BasicParseErrorKind;
use cssparser::CowRcStr;
use cssparser::DeclarationParser as CssDeclarationParser;
use cssparser::ParseError;
use cssparser::ParseErrorKind;
use cssparser::Parser;
use cssparser::ParserInput;
use cssparser::ParserState;
use cssparser::QualifiedRuleParser as CssQualifiedRuleParser;
use cssparser::RuleBodyItemParser as CssRuleBodyItemParser;
use cssparser::RuleBodyParser as CssRuleBodyParser;
use cssparser::StyleSheetParser;
use cssparser::Token;
use thiserror::Error;

/// Failure raised by strict declaration-list parsing.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SyntaxError {
    /// An at-rule appeared where only declarations are allowed.
    #[error("Invalid @ rule: {0}")]
    InvalidAtRule(String),
}

/// A single CSS declaration (property: value [!important]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Lowercased property name.
    pub name: String,
    /// Raw value text (without trailing !important).
    pub value: String,
    /// Whether the declaration was marked as `!important`.
    pub important: bool,
}

/// A single style rule with a raw prelude and parsed declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleRule {
    /// Raw prelude text (typically the selector list).
    pub prelude: String,
    /// Declarations within the rule block.
    pub declarations: Vec<Declaration>,
    /// Raw block contents between the braces, trimmed.
    pub block: String,
}

impl StyleRule {
    /// Serialize this rule back to CSS using `selectors` as its prelude.
    pub fn to_css_with_prelude(&self, selectors: &str) -> String {
        format!("{selectors} {{ {} }}", self.block)
    }
}

/// An at-rule kept as opaque text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtRule {
    /// At-keyword without the leading `@`, as written.
    pub name: String,
    /// Raw prelude text, trimmed.
    pub prelude: String,
    /// Raw block contents, or `None` for statement at-rules like `@import`.
    pub block: Option<String>,
}

impl AtRule {
    /// Serialize this at-rule back to CSS text.
    pub fn to_css(&self) -> String {
        let mut head = format!("@{}", self.name);
        if !self.prelude.is_empty() {
            head.push(' ');
            head.push_str(&self.prelude);
        }
        match &self.block {
            Some(block) => format!("{head} {{ {block} }}"),
            None => format!("{head};"),
        }
    }
}

/// A top-level rule of a stylesheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CssRule {
    /// A qualified rule with a selector prelude.
    Style(StyleRule),
    /// An at-rule such as `@media` or `@font-face`.
    At(AtRule),
}

/// A parsed stylesheet consisting of top-level rules.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stylesheet {
    /// Top-level rules in source order.
    pub rules: Vec<CssRule>,
}

impl Stylesheet {
    /// Style rules in source order, each paired with its index in `rules`.
    pub fn style_rules(&self) -> impl Iterator<Item = (usize, &StyleRule)> {
        self.rules
            .iter()
            .enumerate()
            .filter_map(|(index, rule)| match rule {
                CssRule::Style(style) => Some((index, style)),
                CssRule::At(_) => None,
            })
    }

    /// At-rules in source order.
    pub fn at_rules(&self) -> impl Iterator<Item = &AtRule> {
        self.rules.iter().filter_map(|rule| match rule {
            CssRule::At(at_rule) => Some(at_rule),
            CssRule::Style(_) => None,
        })
    }

    /// True if the stylesheet holds no rules at all.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Matches the `important` ident and the end of the declaration after a `!` delimiter.
fn important_tail<'input>(input: &mut Parser<'input, '_>) -> Result<(), BasicParseError<'input>> {
    input.expect_ident_matching("important")?;
    input.expect_exhausted()
}

/// Consume a declaration value, splitting off a trailing `!important`.
fn consume_value<'input>(
    input: &mut Parser<'input, '_>,
) -> Result<(String, bool), ParseError<'input, SyntaxError>> {
    let start = input.position();
    let mut end = start;
    let mut important = false;
    loop {
        let before = input.position();
        let token = match input.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        if token == Token::Delim('!') && input.try_parse(important_tail).is_ok() {
            end = before;
            important = true;
            break;
        }
        end = input.position();
    }
    let value = input.slice(start..end).trim();
    if value.is_empty() {
        return Err(input.new_error(BasicParseErrorKind::EndOfInput));
    }
    Ok((value.to_owned(), important))
}

/// A declaration parser that records property name and its raw value.
struct BodyDeclParser;

impl CssDeclarationParser<'_> for BodyDeclParser {
    type Declaration = Declaration;
    type Error = SyntaxError;

    fn parse_value<'input>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, '_>,
        _decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'input, Self::Error>> {
        let (value, important) = consume_value(input)?;
        Ok(Declaration {
            name: name.to_ascii_lowercase(),
            value,
            important,
        })
    }
}

impl CssAtRuleParser<'_> for BodyDeclParser {
    type Prelude = ();
    type AtRule = Declaration; // Not produced
    type Error = SyntaxError;

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Err(input.new_custom_error(SyntaxError::InvalidAtRule(name.to_string())))
    }
}

impl CssQualifiedRuleParser<'_> for BodyDeclParser {
    type Prelude = ();
    type QualifiedRule = Declaration; // Not produced
    type Error = SyntaxError;

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }
}

impl CssRuleBodyItemParser<'_, Declaration, SyntaxError> for BodyDeclParser {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Consume every remaining token and return the covered source text, trimmed.
fn consume_raw<'input>(input: &mut Parser<'input, '_>) -> String {
    let start = input.position();
    while input.next_including_whitespace_and_comments().is_ok() {}
    input.slice_from(start).trim().to_owned()
}

/// Top-level parser that builds `StyleRule` and `AtRule` items.
struct TopLevelParser;

impl CssAtRuleParser<'_> for TopLevelParser {
    type Prelude = (String, String);
    type AtRule = CssRule;
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Ok((name.to_string(), consume_raw(input)))
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::AtRule, ParseError<'input, Self::Error>> {
        let (name, prelude_text) = prelude;
        Ok(CssRule::At(AtRule {
            name,
            prelude: prelude_text,
            block: Some(consume_raw(input)),
        }))
    }

    #[inline]
    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        let (name, prelude_text) = prelude;
        Ok(CssRule::At(AtRule {
            name,
            prelude: prelude_text,
            block: None,
        }))
    }
}

impl CssQualifiedRuleParser<'_> for TopLevelParser {
    type Prelude = String; // raw selector/prelude
    type QualifiedRule = CssRule;
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Ok(consume_raw(input))
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        let start = input.position();
        let declarations = parse_declarations_from_block(input);
        let block = input.slice_from(start).trim().to_owned();
        Ok(CssRule::Style(StyleRule {
            prelude,
            declarations,
            block,
        }))
    }
}

/// Parse declarations from a rule block using `cssparser` body parser.
/// Invalid declarations and nested rules are skipped.
fn parse_declarations_from_block(block: &mut Parser) -> Vec<Declaration> {
    let mut body = BodyDeclParser;
    CssRuleBodyParser::new(block, &mut body).flatten().collect()
}

/// Parse a full stylesheet into a `Stylesheet` using cssparser.
pub fn parse_stylesheet(css: &str) -> Stylesheet {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut top = TopLevelParser;
    let mut sheet = Stylesheet::default();
    for rule in StyleSheetParser::new(&mut parser, &mut top).flatten() {
        sheet.rules.push(rule);
    }
    sheet
}

/// Parse a bare declaration list such as the contents of a `style` attribute.
///
/// Malformed declarations are skipped. An at-rule anywhere in the list is an error.
///
/// # Errors
/// Returns [`SyntaxError::InvalidAtRule`] when the list contains an at-rule.
pub fn parse_declaration_list(text: &str) -> Result<Vec<Declaration>, SyntaxError> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut body = BodyDeclParser;
    let mut out = Vec::new();
    for item in CssRuleBodyParser::new(&mut parser, &mut body) {
        match item {
            Ok(declaration) => out.push(declaration),
            Err((error, _)) => {
                if let ParseErrorKind::Custom(custom) = error.kind {
                    return Err(custom);
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::error::Error;

    #[test]
    fn parses_rules_and_important() {
        let sheet = parse_stylesheet("h1, p { color: red !IMPORTANT; Margin : 0 }");
        let rules: Vec<_> = sheet.style_rules().collect();
        assert_eq!(rules.len(), 1);
        let (_, rule) = rules[0];
        assert_eq!(rule.prelude, "h1, p");
        assert_eq!(
            rule.declarations,
            vec![
                Declaration {
                    name: "color".into(),
                    value: "red".into(),
                    important: true
                },
                Declaration {
                    name: "margin".into(),
                    value: "0".into(),
                    important: false
                },
            ]
        );
    }

    #[test]
    fn keeps_at_rules_as_text() {
        let sheet = parse_stylesheet(
            "@media (max-width: 600px) { h1 { color: red; } } @import url(x.css); a { color: blue }",
        );
        let at_rules: Vec<_> = sheet.at_rules().map(AtRule::to_css).collect();
        assert_eq!(
            at_rules,
            vec![
                "@media (max-width: 600px) { h1 { color: red; } }".to_owned(),
                "@import url(x.css);".to_owned(),
            ]
        );
        assert_eq!(sheet.style_rules().count(), 1);
    }

    #[test]
    fn recovers_from_bad_declarations() -> Result<(), Box<dyn Error>> {
        let sheet = parse_stylesheet("p { color: ; width 10px; height: 5px }");
        let (_, rule) = sheet.style_rules().next().ok_or("missing rule")?;
        assert_eq!(rule.declarations.len(), 1);
        assert_eq!(rule.declarations[0].name, "height");
        Ok(())
    }

    #[test]
    fn string_value_containing_important_is_not_important() -> Result<(), Box<dyn Error>> {
        let decls = parse_declaration_list("content: \"!important\"")?;
        assert_eq!(decls[0].value, "\"!important\"");
        assert!(!decls[0].important);
        Ok(())
    }

    #[test]
    fn declaration_list_rejects_at_rules() {
        assert_eq!(
            parse_declaration_list("color: red; @wrong { }"),
            Err(SyntaxError::InvalidAtRule("wrong".into()))
        );
        assert_eq!(
            SyntaxError::InvalidAtRule("wrong".into()).to_string(),
            "Invalid @ rule: wrong"
        );
    }
}
