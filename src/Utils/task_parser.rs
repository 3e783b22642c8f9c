/// Parser of task documents: sections with a title followed by `key: value1, value2` pairs,
/// e.g. " engine variable: x notation: leibniz tolerance: 1e-9 ".
/// Every value is typed on the fly (integer, float, boolean, otherwise string).
/// Comment lines starting with //, #, % or ; are dropped before parsing.
///
/// The calculator reads its [`EngineConfig`](crate::symbolic::engine_config::EngineConfig)
/// from the section `engine` of such a document.
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, map_res, recognize},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;

use crate::symbolic::errors::CalcError;

pub type SectionMap = HashMap<String, Option<Vec<Value>>>;
pub type DocumentMap = HashMap<String, SectionMap>;

/// typed value of a key
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    pub fn as_string(&self) -> Option<&String> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// integers are accepted where a float is expected
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Float(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

/// identifier: a letter or underscore followed by letters, digits, underscores
fn identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    map(parser, String::from).parse(input)
}

/// section title, trailing whitespace dropped
fn parse_title(input: &str) -> IResult<&str, String> {
    let (input, title) = identifier(input)?;
    Ok((input.trim(), title))
}

fn parse_key(input: &str) -> IResult<&str, String> {
    identifier(input)
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    // a value runs up to a comma, whitespace or semicolon
    let raw = take_while1(|c: char| !matches!(c, ',' | ' ' | '\t' | '\n' | '\r' | ';'));
    let mut typed = map_res(raw, |s: &str| -> Result<Value, String> {
        Ok(if let Ok(val) = s.parse::<i64>() {
            Value::Integer(val)
        } else if let Ok(val) = s.parse::<f64>() {
            Value::Float(val)
        } else if let Ok(val) = s.parse::<bool>() {
            Value::Boolean(val)
        } else {
            Value::String(s.to_string())
        })
    });
    typed.parse(input)
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let (input, _) = space0(input)?;
    let comma = delimited(space0, tag(","), space0);
    separated_list0(comma, parse_value).parse(input)
}

fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon = delimited(space0, tag(":"), space0);
    let (input, pair) = separated_pair(parse_key, colon, parse_value_list).parse(input)?;
    Ok((input.trim(), pair))
}

fn parse_section(input: &str) -> IResult<&str, (String, HashMap<String, Vec<Value>>)> {
    let (input, _) = space0(input)?;
    let (input, title) = parse_title(input)?;
    let (input, _) = multispace0(input)?;
    let (input, pairs) = many1(terminated(parse_key_value_pair, space0)).parse(input)?;
    Ok((input, (title, pairs.into_iter().collect())))
}

/// Drops comment lines (starting with //, #, % or ;) and blank lines
fn filter_comments(input: &str) -> String {
    input
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with("//")
                && !line.starts_with('#')
                && !line.starts_with('%')
                && !line.starts_with(';')
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Parses a comment-free document into title -> key -> values
pub fn parse_document(input: &str) -> IResult<&str, DocumentMap> {
    let mut sections = many1(delimited(space0, parse_section, multispace0));
    let (input, sections) = sections.parse(input)?;
    let document = sections
        .into_iter()
        .map(|(title, section)| {
            let section: SectionMap = section
                .into_iter()
                .map(|(key, values)| (key, Some(values)))
                .collect();
            (title, section)
        })
        .collect();
    Ok((input, document))
}

/// Parses a whole document, comments allowed. Every title and key of `template` that the
/// document does not mention is present in the result with the value `None`.
pub fn parse_document_as(
    input: &str,
    template: Option<&DocumentMap>,
) -> Result<DocumentMap, CalcError> {
    let filtered = filter_comments(input);
    let mut parsed = if filtered.trim().is_empty() {
        DocumentMap::new()
    } else {
        let (remaining, parsed) = parse_document(&filtered)
            .map_err(|e| CalcError::Config(format!("parsing error: {:?}", e)))?;
        if !remaining.trim().is_empty() {
            return Err(CalcError::Config(format!(
                "failed to parse entire document, remaining: '{}'",
                remaining
            )));
        }
        parsed
    };
    if let Some(template) = template {
        for (title, keys) in template {
            let section = parsed.entry(title.clone()).or_default();
            for key in keys.keys() {
                section.entry(key.clone()).or_insert(None);
            }
        }
    }
    Ok(parsed)
}

/// First value of `key` in `section`, `None` when the key is absent or has no values
pub fn first_value<'d>(document: &'d DocumentMap, section: &str, key: &str) -> Option<&'d Value> {
    document
        .get(section)?
        .get(key)?
        .as_ref()
        .and_then(|values| values.first())
}
