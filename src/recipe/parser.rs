//! Recipe parser
//!
//! Turns recipe text into a [`Program`]. The grammar is a small,
//! line-oriented subset of the syntax existing deployment scripts use:
//!
//! ```text
//! set :application, "shop"
//! set_default :deploy_to, "/srv/#{application}"
//! use :git, branch: "main"
//!
//! task :deploy do
//!   invoke :build
//! end
//!
//! prepare only: [:web] do |host|
//!   log "preparing #{host}"
//! end
//!
//! on_deploy(only: [:web]) { |host| append :hosts, host }
//!
//! prepare(:web).call("web-1")
//! ```
//!
//! Statements are separated by newlines or `;`. Arguments are given either
//! in parentheses or inline up to the end of the line (a trailing comma
//! continues them on the next line). Blocks, brackets, braces and
//! parentheses nest at most [`MAX_NESTING`] levels deep.

use nom::{
    IResult, Offset,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace1, satisfy},
    combinator::{all_consuming, cut, eof, map, map_res, not, opt, peek, recognize, value},
    error::{ContextError, ErrorKind, ParseError, VerboseError, VerboseErrorKind, context},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
};
use std::sync::Arc;

use super::ast::{Block, Call, Expr, Program, Statement, StrPart};
use crate::core::MamiyaError;
use crate::dsl::Value;

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

const RESERVED: &[&str] = &["do", "end"];

/// Deepest nesting of blocks, brackets, braces and parentheses accepted.
pub const MAX_NESTING: usize = 64;

const NESTING_LIMIT: &str = "nesting no deeper than 64 levels";

// ============================================================================
// Public API
// ============================================================================

/// Parse recipe text.
///
/// `file` and `first_line` (the line of `file` the text starts on) are only
/// used to locate errors. A leading byte order mark is ignored.
pub fn parse_recipe(source: &str, file: &str, first_line: usize) -> Result<Program, MamiyaError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    match all_consuming(|i| program(i, source))(source) {
        Ok((_, program)) => Ok(program),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(MamiyaError::RecipeParseError {
            file: file.to_string(),
            reason: describe_error(source, &e, first_line),
        }),
        Err(nom::Err::Incomplete(_)) => Err(MamiyaError::RecipeParseError {
            file: file.to_string(),
            reason: "incomplete input".to_string(),
        }),
    }
}

/// `line L, column C: expected X, found Y` followed by the offending line
/// and a caret under the column.
fn describe_error(source: &str, error: &VerboseError<&str>, first_line: usize) -> String {
    let Some((at, _)) = error.errors.first() else {
        return "invalid recipe".to_string();
    };

    let offset = source.offset(*at).min(source.len());
    let before = &source[..offset];
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[offset..].find('\n').map_or(source.len(), |i| offset + i);
    let line = first_line.max(1).saturating_add(before.matches('\n').count());
    let column = source[line_start..offset].chars().count() + 1;

    let context = error.errors.iter().find_map(|(_, kind)| match kind {
        VerboseErrorKind::Context(what) => Some((*what).to_string()),
        _ => None,
    });
    let expected = context
        .or_else(|| {
            error.errors.iter().find_map(|(_, kind)| match kind {
                VerboseErrorKind::Char(c) => Some(format!("'{c}'")),
                _ => None,
            })
        })
        .unwrap_or_else(|| "a statement".to_string());

    let found = match at.chars().next() {
        None => "end of input".to_string(),
        Some('\n' | '\r') => "end of line".to_string(),
        Some(c) => format!("'{c}'"),
    };

    format!(
        "line {line}, column {column}: expected {expected}, found {found}\n  {}\n  {}^",
        source[line_start..line_end].trim_end_matches('\r'),
        " ".repeat(column - 1)
    )
}

// ============================================================================
// Statements
// ============================================================================

enum Argument {
    Positional(Expr),
    Keyword(String, Expr),
}

fn program<'a>(input: &'a str, original: &'a str) -> Res<'a, Program> {
    let (input, statements) = statements(input, original, 0)?;
    let (input, _) = separators(input)?;
    Ok((input, Program { statements }))
}

fn statements<'a>(input: &'a str, original: &'a str, depth: usize) -> Res<'a, Vec<Statement>> {
    many0(preceded(separators, |i| statement(i, original, depth)))(input)
}

fn statement<'a>(input: &'a str, original: &'a str, depth: usize) -> Res<'a, Statement> {
    let line = line_of(original, input);
    let (input, name) = name(input)?;

    let (input, arguments) = if input.starts_with('(') {
        paren_arguments(input, depth)?
    } else {
        inline_arguments(input, depth)?
    };

    let (input, call_args) = opt(preceded(
        terminated(tag(".call"), not(satisfy(is_ident_char))),
        opt(|i| paren_arguments(i, depth)),
    ))(input)?;

    let (input, block) = opt(preceded(spaces, |i| block(i, original, depth + 1)))(input)?;
    let (input, _) = cut(context("end of statement", peek(statement_end)))(input)?;

    let (args, keywords) = split_arguments(arguments);
    let call = Call {
        name: name.to_string(),
        args,
        keywords,
        call_args: call_args.map(|args| positional_with_trailing_map(args.unwrap_or_default())),
        block: block.map(Arc::new),
    };

    Ok((input, Statement { line, call }))
}

fn statement_end(input: &str) -> Res<'_, &str> {
    preceded(
        spaces,
        alt((eof, tag("\n"), tag("\r\n"), tag(";"), tag("#"), tag("}"), keyword("end"))),
    )(input)
}

/// `do |params| ... end` or `{ |params| ... }`
fn block<'a>(input: &'a str, original: &'a str, depth: usize) -> Res<'a, Block> {
    let (input, closing) = alt((
        map(keyword("do"), |_| Closing::End),
        map(char('{'), |_| Closing::Brace),
    ))(input)?;
    let (input, ()) = within_limit(input, depth)?;
    let (input, params) = opt(preceded(spaces, block_params))(input)?;
    let (input, body) = statements(input, original, depth)?;
    let (input, _) = separators(input)?;
    let (input, _) = match closing {
        Closing::End => cut(context("`end` closing the block", keyword("end")))(input)?,
        Closing::Brace => cut(context("`}` closing the block", tag("}")))(input)?,
    };

    Ok((
        input,
        Block {
            params: params.unwrap_or_default(),
            body,
        },
    ))
}

#[derive(Clone, Copy)]
enum Closing {
    End,
    Brace,
}

fn block_params(input: &str) -> Res<'_, Vec<String>> {
    delimited(
        pair(char('|'), spaces),
        separated_list0(tuple((spaces, char(','), spaces)), map(name, str::to_string)),
        cut(context("closing `|` of block parameters", pair(spaces, char('|')))),
    )(input)
}

// ============================================================================
// Arguments
// ============================================================================

fn paren_arguments(input: &str, depth: usize) -> Res<'_, Vec<Argument>> {
    let (input, ()) = open('(', depth + 1)(input)?;
    let (input, args) =
        separated_list0(tuple((ws, char(','), ws)), |i| argument(i, depth + 1))(input)?;
    let (input, _) = tuple((ws, opt(char(',')), ws))(input)?;
    let (input, _) = cut(context("closing parenthesis", char(')')))(input)?;
    Ok((input, args))
}

/// Arguments after at least one space, up to the end of the line. A `{`
/// there opens a block rather than a map argument.
fn inline_arguments(input: &str, depth: usize) -> Res<'_, Vec<Argument>> {
    let (after_spaces, leading) = spaces(input)?;
    if leading.is_empty() || after_spaces.starts_with('{') {
        return Ok((input, Vec::new()));
    }

    let (mut rest, first) = match argument(after_spaces, depth) {
        Ok(parsed) => parsed,
        Err(nom::Err::Error(_)) => return Ok((input, Vec::new())),
        Err(e) => return Err(e),
    };

    let mut args = vec![first];
    loop {
        match tuple((spaces, char(','), ws))(rest) {
            Ok((after_comma, _)) => {
                let (next, arg) =
                    cut(context("argument after comma", |i| argument(i, depth)))(after_comma)?;
                args.push(arg);
                rest = next;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }

    Ok((rest, args))
}

fn argument(input: &str, depth: usize) -> Res<'_, Argument> {
    alt((
        map(pair(keyword_label, |i| expression(i, depth)), |(key, value)| {
            Argument::Keyword(key.to_string(), value)
        }),
        map(|i| expression(i, depth), Argument::Positional),
    ))(input)
}

/// `key:` followed by optional whitespace (but not `key::`)
fn keyword_label(input: &str) -> Res<'_, &str> {
    terminated(identifier, tuple((char(':'), not(char(':')), ws)))(input)
}

fn split_arguments(arguments: Vec<Argument>) -> (Vec<Expr>, Vec<(String, Expr)>) {
    let mut args = Vec::new();
    let mut keywords = Vec::new();
    for argument in arguments {
        match argument {
            Argument::Positional(expr) => args.push(expr),
            Argument::Keyword(key, expr) => keywords.push((key, expr)),
        }
    }
    (args, keywords)
}

/// Keyword arguments of an expression-position call become one trailing map.
fn positional_with_trailing_map(arguments: Vec<Argument>) -> Vec<Expr> {
    let (mut args, keywords) = split_arguments(arguments);
    if !keywords.is_empty() {
        args.push(Expr::Map(keywords));
    }
    args
}

// ============================================================================
// Expressions
// ============================================================================

fn expression(input: &str, depth: usize) -> Res<'_, Expr> {
    let (mut input, mut expr) = primary(input, depth)?;

    loop {
        match delimited(
            open('[', depth + 1),
            |i| expression(i, depth + 1),
            cut(context("closing bracket of index", pair(ws, char(']')))),
        )(input)
        {
            Ok((rest, key)) => {
                expr = Expr::Index(Box::new(expr), Box::new(key));
                input = rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }

    Ok((input, expr))
}

fn primary(input: &str, depth: usize) -> Res<'_, Expr> {
    alt((
        |i| double_quoted(i, depth),
        single_quoted,
        symbol_literal,
        integer_literal,
        |i| list_literal(i, depth),
        |i| map_literal(i, depth),
        |i| word_expression(i, depth),
        delimited(
            open('(', depth + 1),
            |i| expression(i, depth + 1),
            cut(pair(ws, char(')'))),
        ),
    ))(input)
}

fn word_expression(input: &str, depth: usize) -> Res<'_, Expr> {
    let (rest, word) = name(input)?;
    let expr = match word {
        "nil" => Expr::Literal(Value::Nil),
        "true" => Expr::Literal(Value::Bool(true)),
        "false" => Expr::Literal(Value::Bool(false)),
        _ if rest.starts_with('(') => {
            let (rest, arguments) = paren_arguments(rest, depth)?;
            return Ok((
                rest,
                Expr::Call {
                    name: word.to_string(),
                    args: positional_with_trailing_map(arguments),
                },
            ));
        }
        _ => Expr::Ident(word.to_string()),
    };
    Ok((rest, expr))
}

fn symbol_literal(input: &str) -> Res<'_, Expr> {
    map(preceded(char(':'), identifier), |name| Expr::Literal(Value::symbol(name)))(input)
}

fn integer_literal(input: &str) -> Res<'_, Expr> {
    map_res(recognize(pair(opt(char('-')), digit1)), |digits: &str| {
        digits.parse::<i64>().map(|i| Expr::Literal(Value::Integer(i)))
    })(input)
}

fn list_literal(input: &str, depth: usize) -> Res<'_, Expr> {
    let (input, ()) = open('[', depth + 1)(input)?;
    let (input, items) =
        separated_list0(tuple((ws, char(','), ws)), |i| expression(i, depth + 1))(input)?;
    let (input, _) = tuple((ws, opt(char(',')), ws))(input)?;
    let (input, _) = cut(context("closing bracket of list", char(']')))(input)?;
    Ok((input, Expr::List(items)))
}

fn map_literal(input: &str, depth: usize) -> Res<'_, Expr> {
    let (input, ()) = open('{', depth + 1)(input)?;
    let (input, entries) = separated_list0(
        tuple((ws, char(','), ws)),
        map(pair(keyword_label, |i| expression(i, depth + 1)), |(key, value)| {
            (key.to_string(), value)
        }),
    )(input)?;
    let (input, _) = tuple((ws, opt(char(',')), ws))(input)?;
    let (input, _) = cut(context("closing brace of map", char('}')))(input)?;
    Ok((input, Expr::Map(entries)))
}

fn single_quoted(input: &str) -> Res<'_, Expr> {
    let (mut rest, _) = char('\'')(input)?;
    let mut text = String::new();

    loop {
        let mut chars = rest.chars();
        match chars.next() {
            None => return unterminated(rest),
            Some('\'') => {
                rest = &rest[1..];
                break;
            }
            Some('\\') if matches!(chars.next(), Some('\'' | '\\')) => {
                text.push_str(&rest[1..2]);
                rest = &rest[2..];
            }
            Some(c) => {
                text.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    Ok((rest, Expr::Literal(Value::String(text))))
}

/// Double-quoted string with escapes and `#{expr}` interpolation.
fn double_quoted(input: &str, depth: usize) -> Res<'_, Expr> {
    let (mut rest, _) = char('"')(input)?;
    let mut parts = Vec::new();
    let mut text = String::new();

    loop {
        let mut chars = rest.chars();
        match chars.next() {
            None => return unterminated(rest),
            Some('"') => {
                rest = &rest[1..];
                break;
            }
            Some('\\') => {
                let escaped = match chars.next() {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('r') => '\r',
                    Some('0') => '\0',
                    Some(c @ ('"' | '\\' | '#')) => c,
                    _ => {
                        return Err(nom::Err::Failure(VerboseError::add_context(
                            rest,
                            "a valid escape sequence",
                            VerboseError::from_error_kind(rest, ErrorKind::Escaped),
                        )));
                    }
                };
                text.push(escaped);
                rest = &rest[1 + escaped.len_utf8()..];
            }
            Some('#') if rest[1..].starts_with('{') => {
                let (_, ()) = within_limit(rest, depth + 1)?;
                let Some(close) = interpolation_end(&rest[2..]) else {
                    return unterminated(rest);
                };
                let inner = &rest[2..2 + close];
                let (_, expr) = all_consuming(delimited(ws, |i| expression(i, depth + 1), ws))(
                    inner,
                )
                .map_err(|e| match e {
                    nom::Err::Error(e) => nom::Err::Failure(e),
                    other => other,
                })?;
                if !text.is_empty() {
                    parts.push(StrPart::Text(std::mem::take(&mut text)));
                }
                parts.push(StrPart::Expr(expr));
                rest = &rest[2 + close + 1..];
            }
            Some(c) => {
                text.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    if parts.is_empty() {
        return Ok((rest, Expr::Literal(Value::String(text))));
    }
    if !text.is_empty() {
        parts.push(StrPart::Text(text));
    }
    Ok((rest, Expr::Interpolated(parts)))
}

/// Offset of the `}` closing an interpolation, skipping nested braces and strings.
fn interpolation_end(s: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            '\n' => return None,
            _ => {}
        }
    }
    None
}

fn unterminated<T>(at: &str) -> Res<'_, T> {
    Err(nom::Err::Failure(VerboseError::add_context(
        at,
        "closing quote of string",
        VerboseError::from_error_kind(at, ErrorKind::Char),
    )))
}

// ============================================================================
// Nesting
// ============================================================================

/// `delimiter` and the whitespace after it, opening nesting level `depth`.
fn open<'a>(delimiter: char, depth: usize) -> impl FnMut(&'a str) -> Res<'a, ()> {
    move |input: &'a str| {
        let (rest, _) = pair(char(delimiter), ws)(input)?;
        within_limit(input, depth)?;
        Ok((rest, ()))
    }
}

/// Fails without backtracking once `depth` exceeds [`MAX_NESTING`].
fn within_limit(input: &str, depth: usize) -> Res<'_, ()> {
    if depth > MAX_NESTING {
        return Err(nom::Err::Failure(VerboseError::add_context(
            input,
            NESTING_LIMIT,
            VerboseError::from_error_kind(input, ErrorKind::TooLarge),
        )));
    }
    Ok((input, ()))
}

// ============================================================================
// Lexical helpers
// ============================================================================

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn identifier(input: &str) -> Res<'_, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(input)
}

/// Identifier that is not a reserved word.
fn name(input: &str) -> Res<'_, &str> {
    let (rest, ident) = identifier(input)?;
    if RESERVED.contains(&ident) {
        return Err(nom::Err::Error(VerboseError::from_error_kind(input, ErrorKind::Verify)));
    }
    Ok((rest, ident))
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> Res<'a, &'a str> {
    terminated(tag(word), not(satisfy(is_ident_char)))
}

/// Horizontal whitespace only.
fn spaces(input: &str) -> Res<'_, &str> {
    take_while(|c| c == ' ' || c == '\t')(input)
}

fn comment(input: &str) -> Res<'_, &str> {
    recognize(pair(char('#'), take_while(|c| c != '\n')))(input)
}

/// Whitespace, newlines and comments, used inside brackets and parentheses.
fn ws(input: &str) -> Res<'_, ()> {
    value((), many0(alt((multispace1, comment))))(input)
}

/// Statement separators: whitespace, newlines, comments and `;`.
fn separators(input: &str) -> Res<'_, ()> {
    value((), many0(alt((multispace1, comment, tag(";")))))(input)
}

fn line_of(original: &str, input: &str) -> usize {
    let consumed = original.len() - input.len();
    original[..consumed].matches('\n').count() + 1
}

// ============================================================================
// Tests
// ============================================================================
