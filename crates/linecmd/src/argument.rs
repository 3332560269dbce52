use crate::error::{DeclareError, ParseError};
use crate::token::unquote;

/// A declared positional argument: `<name>`, `[name]`, or a variadic
/// `<name...>` / `[name...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: String,
    pub required: bool,
    pub variadic: bool,
}

impl ArgSpec {
    /// Parse one declaration word. Words not wrapped in `<>` or `[]` are not
    /// arguments and yield `None`.
    pub fn parse(word: &str) -> Option<Self> {
        let (required, inner) = if let Some(inner) = word.strip_prefix('<') {
            (true, inner.strip_suffix('>').unwrap_or(inner))
        } else if let Some(inner) = word.strip_prefix('[') {
            (false, inner.strip_suffix(']').unwrap_or(inner))
        } else {
            return None;
        };

        let (name, variadic) = match inner.strip_suffix("...") {
            Some(name) if !name.is_empty() => (name, true),
            _ => (inner, false),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            required,
            variadic,
        })
    }

    /// The argument as shown in usage lines.
    pub fn human_readable(&self) -> String {
        let dots = if self.variadic { "..." } else { "" };
        if self.required {
            format!("<{}{dots}>", self.name)
        } else {
            format!("[{}{dots}]", self.name)
        }
    }
}

/// Append the argument specs found in `words` to `specs`, rejecting a
/// variadic argument anywhere but last.
pub fn extend_specs<'a, I>(specs: &mut Vec<ArgSpec>, words: I) -> Result<(), DeclareError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut next = specs.clone();
    next.extend(words.into_iter().filter_map(ArgSpec::parse));

    let last = next.len().saturating_sub(1);
    if let Some((_, spec)) = next
        .iter()
        .enumerate()
        .find(|(i, spec)| spec.variadic && *i != last)
    {
        return Err(DeclareError::VariadicNotLast(spec.name.clone()));
    }

    *specs = next;
    Ok(())
}

/// A positional value bound to an [`ArgSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Absent,
    Value(String),
    Variadic(Vec<String>),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// All values: one for a plain argument, any number for a variadic one.
    pub fn values(&self) -> &[String] {
        match self {
            Self::Absent => &[],
            Self::Value(v) => std::slice::from_ref(v),
            Self::Variadic(items) => items.as_slice(),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Result of binding positional tokens to specs.
#[derive(Debug, Default)]
pub(crate) struct Bound {
    pub values: Vec<ArgValue>,
    pub extra: Vec<String>,
    pub errors: Vec<ParseError>,
}

/// Bind positional tokens left to right, unwrapping quoted tokens.
pub(crate) fn bind(specs: &[ArgSpec], positional: &[String]) -> Bound {
    let mut tokens = positional.iter().map(|t| unquote(t).to_string());
    let mut bound = Bound::default();

    for spec in specs {
        if spec.variadic {
            let items: Vec<String> = tokens.by_ref().collect();
            if spec.required && items.is_empty() {
                bound
                    .errors
                    .push(ParseError::MissingArgument(spec.name.clone()));
            }
            bound.values.push(ArgValue::Variadic(items));
            continue;
        }

        match tokens.next() {
            Some(v) => bound.values.push(ArgValue::Value(v)),
            None => {
                if spec.required {
                    bound
                        .errors
                        .push(ParseError::MissingArgument(spec.name.clone()));
                }
                bound.values.push(ArgValue::Absent);
            }
        }
    }

    bound.extra = tokens.collect();
    bound
}
