//! Source text to a generic parse tree.
//!
//! The tree is deliberately untyped: every node carries a `tag` naming the
//! rule that produced it, the matched `contents` for leaves and the
//! `children` for groups. Turning that into values is the reader's job.
//!
//! ```text
//! number  : /-?[0-9]+/
//! symbol  : /[a-zA-Z0-9_+\-*\/\\=<>!&|]+/
//! string  : /"(\\.|[^"])*"/
//! comment : /;[^\r\n]*/
//! sexpr   : '(' <expr>* ')'
//! qexpr   : '{' <expr>* '}'
//! expr    : <number> | <symbol> | <string> | <comment> | <sexpr> | <qexpr>
//! program : /^/ <expr>* /$/
//! ```
//!
//! Numbers are tried before symbols, so `12ab` reads as the number `12`
//! followed by the symbol `ab`.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{cut, map, opt, recognize},
    error::ErrorKind,
    multi::many0,
    sequence::{pair, preceded},
};

use crate::{MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

pub const TAG_PROGRAM: &str = ">";
pub const TAG_NUMBER: &str = "expr|number|regex";
pub const TAG_SYMBOL: &str = "expr|symbol|regex";
pub const TAG_STRING: &str = "expr|string|regex";
pub const TAG_COMMENT: &str = "expr|comment|regex";
pub const TAG_SEXPR: &str = "expr|sexpr|>";
pub const TAG_QEXPR: &str = "expr|qexpr|>";
pub const TAG_CHAR: &str = "char";
pub const TAG_ANCHOR: &str = "regex";

/// A node of the parse tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNode {
    pub tag: String,
    pub contents: String,
    pub children: Vec<ParseNode>,
}

impl ParseNode {
    pub fn leaf(tag: &str, contents: &str) -> Self {
        ParseNode {
            tag: tag.to_owned(),
            contents: contents.to_owned(),
            children: Vec::new(),
        }
    }

    pub fn branch(tag: &str, children: Vec<ParseNode>) -> Self {
        ParseNode {
            tag: tag.to_owned(),
            contents: String::new(),
            children,
        }
    }
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_+-*/\\=<>!&|".contains(c)
}

fn number(input: &str) -> IResult<&str, ParseNode> {
    map(recognize(pair(opt(char('-')), digit1)), |text: &str| {
        ParseNode::leaf(TAG_NUMBER, text)
    })
    .parse(input)
}

fn symbol(input: &str) -> IResult<&str, ParseNode> {
    map(take_while1(is_symbol_char), |text: &str| {
        ParseNode::leaf(TAG_SYMBOL, text)
    })
    .parse(input)
}

fn comment(input: &str) -> IResult<&str, ParseNode> {
    map(
        recognize(pair(char(';'), take_while(|c: char| c != '\r' && c != '\n'))),
        |text: &str| ParseNode::leaf(TAG_COMMENT, text),
    )
    .parse(input)
}

/// String literal, kept with its quotes and escapes exactly as written
fn string(input: &str) -> IResult<&str, ParseNode> {
    let (mut remaining, _) = char('"').parse(input)?;

    loop {
        let mut chars = remaining.chars();
        match chars.next() {
            Some('"') => {
                let rest = chars.as_str();
                let text = &input[..input.len() - rest.len()];
                return Ok((rest, ParseNode::leaf(TAG_STRING, text)));
            }
            Some('\\') => {
                // The escaped character is taken verbatim, even a quote
                if chars.next().is_none() {
                    return Err(nom::Err::Failure(nom::error::Error::new(
                        chars.as_str(),
                        ErrorKind::Char,
                    )));
                }
                remaining = chars.as_str();
            }
            Some(_) => remaining = chars.as_str(),
            None => {
                // Reached end of input without a closing quote
                return Err(nom::Err::Failure(nom::error::Error::new(
                    remaining,
                    ErrorKind::Char,
                )));
            }
        }
    }
}

/// Bracketed group; once the opening bracket matched there is no backtracking
fn group<'a>(
    input: &'a str,
    open: char,
    close: char,
    tag: &str,
    depth: usize,
) -> IResult<&'a str, ParseNode> {
    let (input, _) = char(open).parse(input)?;
    if depth >= MAX_PARSE_DEPTH {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::TooLarge,
        )));
    }

    let (input, elements) = many0(|input| expr(input, depth + 1)).parse(input)?;
    let (input, _) = multispace0.parse(input)?;
    let (input, _) = cut(char(close)).parse(input)?;

    let mut children = Vec::with_capacity(elements.len() + 2);
    children.push(ParseNode::leaf(TAG_CHAR, &open.to_string()));
    children.extend(elements);
    children.push(ParseNode::leaf(TAG_CHAR, &close.to_string()));
    Ok((input, ParseNode::branch(tag, children)))
}

fn expr(input: &str, depth: usize) -> IResult<&str, ParseNode> {
    preceded(
        multispace0,
        alt((
            number,
            symbol,
            string,
            comment,
            |input| group(input, '(', ')', TAG_SEXPR, depth),
            |input| group(input, '{', '}', TAG_QEXPR, depth),
        )),
    )
    .parse(input)
}

/// Convert nom parsing errors to located, user-friendly errors
fn to_parse_error(
    origin: &str,
    input: &str,
    error: nom::Err<nom::error::Error<&str>>,
) -> ParseError {
    let e = match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => e,
        nom::Err::Incomplete(_) => {
            return ParseError::at_offset(
                ParseErrorKind::Incomplete,
                "unexpected end of input",
                origin,
                input,
                input.len(),
            );
        }
    };

    let offset = input.len().saturating_sub(e.input.len());
    if e.code == ErrorKind::TooLarge {
        return ParseError::at_offset(
            ParseErrorKind::TooDeeplyNested,
            format!("expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
            origin,
            input,
            offset,
        );
    }
    unexpected(origin, input, offset)
}

fn unexpected(origin: &str, input: &str, offset: usize) -> ParseError {
    match input[offset..].chars().next() {
        Some(c) => ParseError::at_offset(
            ParseErrorKind::InvalidSyntax,
            format!("unexpected '{c}'"),
            origin,
            input,
            offset,
        ),
        None => ParseError::at_offset(
            ParseErrorKind::Incomplete,
            "unexpected end of input",
            origin,
            input,
            offset,
        ),
    }
}

/// Parse a whole program. `origin` names the input in error messages.
pub fn parse_program(origin: &str, input: &str) -> Result<ParseNode, ParseError> {
    let (remaining, elements) = many0(|i| expr(i, 0))
        .parse(input)
        .map_err(|e| to_parse_error(origin, input, e))?;
    let remaining = remaining.trim_start_matches([' ', '\t', '\r', '\n']);

    if !remaining.is_empty() {
        return Err(unexpected(origin, input, input.len() - remaining.len()));
    }

    let mut children = Vec::with_capacity(elements.len() + 2);
    children.push(ParseNode::leaf(TAG_ANCHOR, ""));
    children.extend(elements);
    children.push(ParseNode::leaf(TAG_ANCHOR, ""));
    Ok(ParseNode::branch(TAG_PROGRAM, children))
}
