use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_till, take_while1},
    character::complete::{char, digit1},
    combinator::{map, recognize},
    error::ErrorKind,
    multi::many0_count,
    sequence::{delimited, pair},
};
use tracing::debug;

use crate::ast::{Node, NumberType, apply, num, string, word};
use crate::{Error, MAX_PARSE_DEPTH, SyntaxError, SyntaxErrorKind};

/// Parser options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Treat `#` to end of line as whitespace. When off, `#` is still not a
    /// word character, so any `#` in the input is a syntax error.
    pub handle_comments: bool,
    /// Most argument lists an expression may nest, counting chained calls,
    /// before `TooDeeplyNested`
    pub max_depth: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            handle_comments: true,
            max_depth: MAX_PARSE_DEPTH,
        }
    }
}

/// Characters that end a word
const WORD_DELIMITERS: &str = "(),#\"";

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !WORD_DELIMITERS.contains(c)
}

/// Characters that may not directly follow a number literal
fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn blank(input: &str) -> IResult<&str, &str> {
    take_while1(char::is_whitespace).parse(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('#'), take_till(|c: char| c == '\n' || c == '\r'))).parse(input)
}

fn skip_space_with(input: &str, handle_comments: bool) -> &str {
    let skipped = if handle_comments {
        many0_count(alt((blank, comment))).parse(input)
    } else {
        many0_count(blank).parse(input)
    };

    match skipped {
        Ok((rest, _)) => rest,
        Err(_) => input,
    }
}

/// Strip leading whitespace and `#` comments.
///
/// Idempotent: `skip_space(skip_space(s)) == skip_space(s)`.
pub fn skip_space(input: &str) -> &str {
    skip_space_with(input, true)
}

/// Parse a string literal; there are no escape sequences
fn parse_string(input: &str) -> IResult<&str, Node> {
    map(
        delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
        string,
    )
    .parse(input)
}

/// Parse a run of digits ending at a word boundary
fn parse_number(input: &str) -> IResult<&str, Node> {
    let (rest, digits) = digit1.parse(input)?;

    // `5x` is a word, not a number followed by a word
    if rest.starts_with(is_identifier_char) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::Digit,
        )));
    }

    match digits.parse::<NumberType>() {
        Ok(n) => Ok((rest, num(n))),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::Float,
        ))),
    }
}

/// Parse a bare word
fn parse_word(input: &str) -> IResult<&str, Node> {
    map(take_while1(is_word_char), word).parse(input)
}

fn parse_atom(input: &str) -> IResult<&str, Node> {
    alt((parse_string, parse_number, parse_word)).parse(input)
}

/// Recursive-descent driver; keeps the whole source around for error context
struct ExprParser<'src> {
    source: &'src str,
    config: ParseConfig,
}

impl<'src> ExprParser<'src> {
    fn skip(&self, input: &'src str) -> &'src str {
        skip_space_with(input, self.config.handle_comments)
    }

    fn error(&self, kind: SyntaxErrorKind, message: impl Into<String>, rest: &str) -> Error {
        SyntaxError::at(kind, message, self.source, rest).into()
    }

    fn expression(&self, input: &'src str, depth: usize) -> Result<(Node, &'src str), Error> {
        let input = self.skip(input);
        match parse_atom(input) {
            Ok((rest, atom)) => self.apply(atom, rest, depth),
            Err(_) if input.is_empty() => Err(self.error(
                SyntaxErrorKind::Incomplete,
                "Unexpected end of input",
                input,
            )),
            Err(_) => {
                let near: String = input.chars().take(10).collect();
                Err(self.error(
                    SyntaxErrorKind::UnexpectedSyntax,
                    format!("Unexpected syntax: {near}"),
                    input,
                ))
            }
        }
    }

    /// Wrap `operator` in one `Apply` per argument list that follows it, so
    /// `f(1)(2)` nests as `Apply(Apply(f, [1]), [2])`.
    ///
    /// Every argument list is one level of nesting, whether it encloses the
    /// next one or follows it in a chain.
    fn apply(
        &self,
        mut operator: Node,
        input: &'src str,
        mut depth: usize,
    ) -> Result<(Node, &'src str), Error> {
        let mut rest = self.skip(input);

        while let Some(after_paren) = rest.strip_prefix('(') {
            depth += 1;
            if depth > self.config.max_depth {
                return Err(self.error(
                    SyntaxErrorKind::TooDeeplyNested,
                    format!(
                        "Expression too deeply nested (max depth: {})",
                        self.config.max_depth
                    ),
                    rest,
                ));
            }

            let mut args = Vec::new();
            let mut cursor = self.skip(after_paren);

            loop {
                if let Some(after_close) = cursor.strip_prefix(')') {
                    cursor = after_close;
                    break;
                }

                let (arg, after_arg) = self.expression(cursor, depth)?;
                args.push(arg);
                cursor = self.skip(after_arg);

                if let Some(after_comma) = cursor.strip_prefix(',') {
                    cursor = self.skip(after_comma);
                } else if cursor.is_empty() {
                    return Err(self.error(
                        SyntaxErrorKind::Incomplete,
                        "Unexpected end of input in argument list",
                        cursor,
                    ));
                } else if !cursor.starts_with(')') {
                    return Err(self.error(
                        SyntaxErrorKind::ExpectedSeparator,
                        "Expected ',' or ')'",
                        cursor,
                    ));
                }
            }

            operator = apply(operator, args);
            rest = self.skip(cursor);
        }

        Ok((operator, rest))
    }

    fn program(&self) -> Result<Node, Error> {
        let (node, rest) = self.expression(self.source, 0)?;
        let rest = self.skip(rest);
        if !rest.is_empty() {
            return Err(self.error(
                SyntaxErrorKind::TrailingContent,
                "Unexpected text after program",
                rest,
            ));
        }
        Ok(node)
    }
}

/// Parse one expression from the front of `input`, returning it together
/// with the unconsumed remainder.
pub fn parse_expression(input: &str) -> Result<(Node, &str), Error> {
    let parser = ExprParser {
        source: input,
        config: ParseConfig::default(),
    };
    parser.expression(input, 0)
}

/// Parse any argument lists following an already-parsed `operator`.
/// Returns `operator` unchanged if `input` does not start with `(`.
pub fn parse_apply(operator: Node, input: &str) -> Result<(Node, &str), Error> {
    let parser = ExprParser {
        source: input,
        config: ParseConfig::default(),
    };
    parser.apply(operator, input, 0)
}

/// Parse a complete program: exactly one expression, optionally surrounded by
/// whitespace and comments.
pub fn parse(input: &str) -> Result<Node, Error> {
    parse_with_config(input, ParseConfig::default())
}

pub fn parse_with_config(input: &str, config: ParseConfig) -> Result<Node, Error> {
    debug!(len = input.len(), ?config, "parse");
    let parser = ExprParser {
        source: input,
        config,
    };
    let node = parser.program()?;
    debug!(program = %node, "parsed");
    Ok(node)
}
