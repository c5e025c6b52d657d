use std::str::FromStr;

use im::Vector;
use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, take_while, take_while1};
use nom::character::complete::{anychar, char, digit1, not_line_ending, one_of};
use nom::combinator::{all_consuming, opt, recognize};
use nom::multi::many0_count;
use nom::sequence::{pair, tuple};
use nom::IResult;

use crate::{LispError, LispValue, Result};

fn some_or_err<T>(opt: Option<Result<T>>, err: LispError) -> Result<T> {
    match opt {
        None => Err(err),
        Some(Ok(x)) => Ok(x),
        Some(Err(x)) => Err(x),
    }
}

#[derive(Clone, Debug)]
struct LispToken {
    token: String,
    row: usize,
    col: usize,
}

fn is_atom_char(c: char) -> bool {
    !c.is_whitespace() && !"[]{}()'\"`,;".contains(c)
}

fn separator(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c.is_whitespace() || c == ',')(input)
}

/// A string literal, escapes left in place. The closing quote may be missing.
fn string_literal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char('"'),
        many0_count(alt((recognize(pair(char('\\'), anychar)), is_not("\\\"")))),
        opt(char('"')),
    )))(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(char(';'), not_line_ending))(input)
}

fn token(input: &str) -> IResult<&str, &str> {
    alt((
        tag("~@"),
        recognize(one_of("[]{}()'`~^@")),
        string_literal,
        comment,
        take_while1(is_atom_char),
    ))(input)
}

fn integer(input: &str) -> IResult<&str, &str> {
    all_consuming(recognize(pair(opt(char('-')), digit1)))(input)
}

fn advance(text: &str, row: &mut usize, col: &mut usize) {
    for ch in text.chars() {
        if ch == '\n' {
            *row += 1;
            *col = 1;
        } else {
            *col += 1;
        }
    }
}

fn unescape(body: &str) -> Result<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => return Err(LispError::InvalidEscape(other)),
            None => return Err(LispError::InvalidEscape(' ')),
        }
    }
    Ok(out)
}

/// Reads source text into forms. Input may arrive a line at a time through
/// [`LispParser::add_tokenize`]; completed forms are taken with the
/// [`Iterator`] implementation.
#[derive(Clone, Debug)]
pub struct LispParser {
    tokens: Vec<LispToken>,
    row: usize,
    col: usize,
}

impl LispParser {
    pub fn new() -> Self {
        LispParser {
            tokens: vec![],
            row: 1,
            col: 1,
        }
    }

    /// The first form in `input`, or `None` if it holds no forms.
    pub fn parse(input: &str) -> Option<Result<LispValue>> {
        let mut tokens = vec![];
        Self::tokenize(&mut tokens, input, 1, 1);
        // map to drop the leftover tokens from the result
        Self::read_form(&tokens).map(|x| x.map(|(val, _)| val))
    }

    /// Whether the buffered input holds a whole form (or a definite error),
    /// as opposed to one still waiting on a closing delimiter.
    pub fn is_parse_complete(&self) -> bool {
        !matches!(
            self.peek(),
            Some(Err(LispError::UnbalancedDelim(..) | LispError::MissingToken(_)))
        )
    }

    pub fn has_tokens(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn add_tokenize(&mut self, input: &str) {
        let (row, col) = Self::tokenize(&mut self.tokens, input, self.row, self.col);
        self.row = row;
        self.col = col;
    }

    pub fn peek(&self) -> Option<Result<LispValue>> {
        Self::read_form(&self.tokens).map(|x| x.map(|(val, _)| val))
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    fn tokenize(
        tokens: &mut Vec<LispToken>,
        input: &str,
        mut row: usize,
        mut col: usize,
    ) -> (usize, usize) {
        let mut rest = input;
        loop {
            let Ok((after_sep, sep)) = separator(rest) else {
                break;
            };
            advance(sep, &mut row, &mut col);
            if after_sep.is_empty() {
                break;
            }
            let Ok((after, found)) = token(after_sep) else {
                break;
            };
            if !found.starts_with(';') {
                tokens.push(LispToken {
                    token: found.to_owned(),
                    row,
                    col,
                });
            }
            advance(found, &mut row, &mut col);
            rest = after;
        }
        (row, col)
    }

    fn read_form(tokens: &[LispToken]) -> Option<Result<(LispValue, &[LispToken])>> {
        let (LispToken { token, row, col }, rest) = tokens.split_first()?;
        Some(match token.as_str() {
            "(" => Self::read_seq(rest, ")").map(|(items, rest)| (LispValue::from(items), rest)),
            "[" => Self::read_seq(rest, "]")
                .map(|(items, rest)| (LispValue::vector_from(items), rest)),
            "{" => Self::read_seq(rest, "}").and_then(|(items, rest)| {
                if items.len() % 2 != 0 {
                    return Err(LispError::SyntaxError(*row, *col));
                }
                let mut items = items.into_iter();
                let mut entries = vec![];
                while let (Some(k), Some(v)) = (items.next(), items.next()) {
                    entries.push((k, v));
                }
                Ok((LispValue::map_from(entries), rest))
            }),
            ")" | "]" | "}" => Err(LispError::SyntaxError(*row, *col)),
            "'" => Self::read_prefixed("quote", rest),
            "`" => Self::read_prefixed("quasiquote", rest),
            "~" => Self::read_prefixed("unquote", rest),
            "~@" => Self::read_prefixed("splice-unquote", rest),
            "@" => Self::read_prefixed("deref", rest),
            "^" => Self::read_with_meta(rest),
            _ => Self::read_atom(token, *row, *col).map(|x| (x, rest)),
        })
    }

    fn read_prefixed<'a>(
        name: &'static str,
        tokens: &'a [LispToken],
    ) -> Result<(LispValue, &'a [LispToken])> {
        let (inner, rest) = some_or_err(Self::read_form(tokens), LispError::MissingToken(name))?;
        Ok((LispValue::list_from([LispValue::symbol(name), inner]), rest))
    }

    /// `^meta form` reads as `(with-meta form meta)`.
    fn read_with_meta(tokens: &[LispToken]) -> Result<(LispValue, &[LispToken])> {
        let (meta, rest) = some_or_err(Self::read_form(tokens), LispError::MissingToken("^"))?;
        let (form, rest) = some_or_err(Self::read_form(rest), LispError::MissingToken("^"))?;
        Ok((
            LispValue::list_from([LispValue::symbol("with-meta"), form, meta]),
            rest,
        ))
    }

    fn read_seq<'a>(
        tokens: &'a [LispToken],
        close: &'static str,
    ) -> Result<(Vector<LispValue>, &'a [LispToken])> {
        let mut res = Vector::new();
        let mut xs = tokens;
        loop {
            let (LispToken { token, .. }, rest) = xs
                .split_first()
                .ok_or(LispError::UnbalancedDelim(1, close))?;
            if token == close {
                break Ok((res, rest));
            }
            let (exp, new_xs) = some_or_err(
                Self::read_form(xs),
                LispError::UnbalancedDelim(0, close),
            )
            .map_err(|err| match err {
                LispError::UnbalancedDelim(x, delim) if delim == close => {
                    LispError::UnbalancedDelim(x + 1, close)
                }
                _ => err,
            })?;
            res.push_back(exp);
            xs = new_xs;
        }
    }

    fn read_atom(token: &str, row: usize, col: usize) -> Result<LispValue> {
        if integer(token).is_ok() {
            token
                .parse()
                .map(LispValue::Integer)
                .map_err(|_| LispError::SyntaxError(row, col))
        } else if let Some(body) = token.strip_prefix('"') {
            match body.strip_suffix('"') {
                Some(inner) if !body.is_empty() && !ends_with_escape(body) => {
                    unescape(inner).map(LispValue::String)
                }
                _ => Err(LispError::UnterminatedString(row, col)),
            }
        } else if token == "true" {
            Ok(LispValue::Bool(true))
        } else if token == "false" {
            Ok(LispValue::Bool(false))
        } else if token == "nil" {
            Ok(LispValue::Nil)
        } else if let Some(stripped) = token.strip_prefix(':') {
            Ok(LispValue::keyword(stripped))
        } else {
            Ok(LispValue::symbol(token))
        }
    }
}

/// Whether the final quote of a string body is itself escaped.
fn ends_with_escape(body: &str) -> bool {
    let without_quote = &body[..body.len() - 1];
    let backslashes = without_quote.chars().rev().take_while(|&c| c == '\\').count();
    backslashes % 2 == 1
}

impl Default for LispParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for LispParser {
    type Item = Result<LispValue>;

    fn next(&mut self) -> Option<Self::Item> {
        match Self::read_form(&self.tokens)? {
            Ok((val, rest)) => {
                let idx = self.tokens.len() - rest.len();
                self.tokens.drain(0..idx);
                Some(Ok(val))
            }
            Err(err) => {
                // forget all processed tokens to clear the error
                self.tokens.clear();
                Some(Err(err))
            }
        }
    }
}

impl FromStr for LispValue {
    type Err = LispError;

    /// Reads the first form; input with no forms reads as `nil`.
    fn from_str(s: &str) -> Result<Self> {
        LispParser::parse(s).unwrap_or(Ok(LispValue::Nil))
    }
}
