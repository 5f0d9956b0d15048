//! Mapping expressions
//!
//! A mapping value is one of
//! - `@field`: raw value reference
//! - `#name`: contextual variable
//! - `%NAME(arg, arg, ...)`: macro, arguments are expressions themselves
//! - anything else: literal
//!
//! Whitespace around a macro argument is ignored when it holds a reference
//! or a nested macro. Literal arguments are kept as written.
//!
//! Expressions are parsed once when the mapping table is built.

use std::fmt;

pub const RAW_PREFIX: char = '@';
pub const VAR_PREFIX: char = '#';
pub const MACRO_PREFIX: char = '%';

/// Parsed mapping expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingExpression {
    Literal(String),
    RawRef(String),
    VarRef(String),
    Macro {
        name: String,
        args: Vec<MappingExpression>,
    },
}

impl MappingExpression {
    /// Parses a mapping value
    ///
    /// Malformed macros are kept as literals.
    pub fn parse(text: &str) -> Self {
        if let Some(field) = text.strip_prefix(RAW_PREFIX) {
            return MappingExpression::RawRef(field.trim().to_string());
        }
        if let Some(name) = text.strip_prefix(VAR_PREFIX) {
            return MappingExpression::VarRef(name.trim().to_string());
        }
        if let Some(body) = text.strip_prefix(MACRO_PREFIX) {
            if let Some(expr) = parse_macro(body) {
                return expr;
            }
        }
        MappingExpression::Literal(text.to_string())
    }

    /// Shorthand for a literal expression
    pub fn literal(value: &str) -> Self {
        MappingExpression::Literal(value.to_string())
    }

    /// Maximum macro nesting below this expression
    pub fn macro_depth(&self) -> usize {
        match self {
            MappingExpression::Macro { args, .. } => {
                1 + args.iter().map(|a| a.macro_depth()).max().unwrap_or(0)
            }
            _ => 0,
        }
    }
}

impl From<&str> for MappingExpression {
    fn from(text: &str) -> Self {
        MappingExpression::parse(text)
    }
}

impl fmt::Display for MappingExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingExpression::Literal(value) => write!(f, "{}", value),
            MappingExpression::RawRef(field) => write!(f, "{}{}", RAW_PREFIX, field),
            MappingExpression::VarRef(name) => write!(f, "{}{}", VAR_PREFIX, name),
            MappingExpression::Macro { name, args } => {
                write!(f, "{}{}(", MACRO_PREFIX, name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Parses `NAME(args)` following the macro prefix
fn parse_macro(body: &str) -> Option<MappingExpression> {
    let body = body.trim();
    let open = body.find('(')?;
    let name = body[..open].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    let inner = body[open + 1..].strip_suffix(')')?;
    let args = split_arguments(inner)?
        .into_iter()
        .map(|arg| {
            let trimmed = arg.trim();
            if trimmed.starts_with([RAW_PREFIX, VAR_PREFIX, MACRO_PREFIX]) {
                MappingExpression::parse(trimmed)
            } else {
                MappingExpression::literal(arg)
            }
        })
        .collect();

    Some(MappingExpression::Macro {
        name: name.to_ascii_uppercase(),
        args,
    })
}

/// Splits macro arguments at top-level commas
///
/// Returns `None` for unbalanced parentheses.
fn split_arguments(inner: &str) -> Option<Vec<&str>> {
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (pos, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                args.push(&inner[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return None;
    }
    args.push(&inner[start..]);
    Some(args)
}
