//! Option parsing over a normalized token stream.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::ParseError;
use crate::option::{OptionDef, find_option};
use crate::token::{LITERAL, looks_like_flag};

/// One normalized token and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    /// Position in the stream being parsed; used to merge tokens back in
    /// line order.
    pub at: usize,
    /// Index of the raw (tokenized, not normalized) token it came from, when
    /// it came from this node's own line.
    pub raw: Option<usize>,
    pub text: String,
}

impl Token {
    /// A token that did not come from the input, placed after everything
    /// that did.
    pub fn synthetic(text: &str) -> Self {
        Self {
            at: usize::MAX,
            raw: None,
            text: text.to_string(),
        }
    }
}

/// Build a token stream from tokens with optional raw origins.
pub(crate) fn stream<I>(tokens: I) -> Vec<Token>
where
    I: IntoIterator<Item = (Option<usize>, String)>,
{
    tokens
        .into_iter()
        .enumerate()
        .map(|(at, (raw, text))| Token { at, raw, text })
        .collect()
}

/// Outcome of running the option parser over one token stream.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub(crate) positional: Vec<Token>,
    pub(crate) unknown: Vec<Token>,
    pub(crate) values: IndexMap<String, Value>,
    pub(crate) errors: Vec<ParseError>,
}

impl ParseResult {
    /// Tokens that were neither options nor option values.
    pub fn positional(&self) -> Vec<&str> {
        self.positional.iter().map(|t| t.text.as_str()).collect()
    }

    /// Option-like tokens no declared option matched, with any value the
    /// pairing heuristic captured for them.
    pub fn unknown(&self) -> Vec<&str> {
        self.unknown.iter().map(|t| t.text.as_str()).collect()
    }

    /// Option values by canonical key.
    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }
}

/// Seed `values` with the initial value of every option in `options` that
/// has no value yet.
pub(crate) fn seed(mut values: IndexMap<String, Value>, options: &[OptionDef]) -> IndexMap<String, Value> {
    for option in options {
        if values.contains_key(option.key()) {
            continue;
        }
        if let Some(initial) = option.initial() {
            values.insert(option.key().to_string(), initial);
        }
    }
    values
}

/// Fill in the final value of every option in `options` that never
/// appeared.
pub(crate) fn finalize(mut values: IndexMap<String, Value>, options: &[&OptionDef]) -> IndexMap<String, Value> {
    for option in options {
        if !values.contains_key(option.key()) {
            values.insert(option.key().to_string(), option.absent());
        }
    }
    values
}

/// Classify each token as an option, an option value, an unknown option or
/// a positional token, folding option occurrences into `values`.
pub(crate) fn parse_options(
    options: &[&OptionDef],
    tokens: &[Token],
    mut values: IndexMap<String, Value>,
) -> ParseResult {
    let mut result = ParseResult::default();
    let mut literal = false;
    let mut rest = tokens.iter().peekable();

    while let Some(token) = rest.next() {
        let arg = token.text.as_str();

        if arg == LITERAL {
            literal = true;
            continue;
        }
        if literal {
            result.positional.push(token.clone());
            continue;
        }

        if let Some(option) = find_option(options.iter().copied(), arg) {
            let raw = if option.takes_required_value() {
                match rest.next() {
                    Some(next) => Some(next.text.as_str()),
                    None => {
                        result
                            .errors
                            .push(ParseError::OptionMissingArgument(option.flags().to_string()));
                        continue;
                    }
                }
            } else if option.takes_optional_value() {
                rest.next_if(|next| !looks_like_flag(&next.text))
                    .map(|next| next.text.as_str())
            } else {
                None
            };

            let value = option.resolve(raw, values.get(option.key()));
            values.insert(option.key().to_string(), value);
            continue;
        }

        if looks_like_flag(arg) {
            result.unknown.push(token.clone());
            if let Some(next) = rest.next_if(|next| !next.text.starts_with('-')) {
                result.unknown.push(next.clone());
            }
            continue;
        }

        result.positional.push(token.clone());
    }

    result.values = values;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce;
    use serde_json::json;

    fn tokens(items: &[&str]) -> Vec<Token> {
        stream(items.iter().enumerate().map(|(i, s)| (Some(i), s.to_string())))
    }

    fn run(options: &[OptionDef], items: &[&str]) -> ParseResult {
        let refs: Vec<&OptionDef> = options.iter().collect();
        let values = seed(IndexMap::new(), options);
        let mut result = parse_options(&refs, &tokens(items), values);
        result.values = finalize(result.values, &refs);
        result
    }

    #[test]
    fn separates_options_from_positional() {
        let options = vec![
            OptionDef::new("-s, --size <size>", ""),
            OptionDef::new("-v, --verbose", ""),
        ];
        let result = run(&options, &["test", "-s", "large", "-v", "arg"]);
        assert_eq!(result.positional(), vec!["test", "arg"]);
        assert_eq!(result.values()["size"], json!("large"));
        assert_eq!(result.values()["verbose"], json!(true));
        assert!(result.errors().is_empty());
    }

    #[test]
    fn literal_mode_skips_every_terminator() {
        let result = run(&[], &["test", "--", "-test", "--", "--test-test"]);
        assert_eq!(result.positional(), vec!["test", "-test", "--test-test"]);
        assert!(result.unknown().is_empty());
    }

    #[test]
    fn required_value_missing_records_error_and_continues() {
        let options = vec![
            OptionDef::new("-s, --size <size>", ""),
            OptionDef::new("-v, --verbose", ""),
        ];
        let result = run(&options, &["-v", "-s"]);
        assert_eq!(
            result.errors(),
            &[ParseError::OptionMissingArgument("-s, --size <size>".to_string())]
        );
        assert_eq!(result.values()["verbose"], json!(true));
    }

    #[test]
    fn required_value_takes_flag_like_token() {
        let options = vec![OptionDef::new("-n, --number <n>", "")];
        let result = run(&options, &["-n", "-5"]);
        assert_eq!(result.values()["number"], json!("-5"));
    }

    #[test]
    fn optional_value_is_not_taken_from_a_flag() {
        let options = vec![
            OptionDef::new("-d, --drink [drink]", "").with_default("coke"),
            OptionDef::new("-x", ""),
        ];
        let result = run(&options, &["-d", "-x"]);
        assert_eq!(result.values()["drink"], json!("coke"));
        assert_eq!(result.values()["x"], json!(true));

        let result = run(&options, &["-d", "-"]);
        assert_eq!(result.values()["drink"], json!("-"));
    }

    #[test]
    fn unknown_option_captures_following_value() {
        let result = run(&[], &["-x", "val", "pos", "-y", "-z"]);
        assert_eq!(result.unknown(), vec!["-x", "val", "-y", "-z"]);
        assert_eq!(result.positional(), vec!["pos"]);
    }

    #[test]
    fn repeated_occurrences_accumulate() {
        let options = vec![
            OptionDef::new("-c, --collect [value]", "")
                .with_coerce(coerce::collect())
                .with_default(json!([])),
            OptionDef::new("-v, --verbose", "")
                .with_coerce(coerce::count())
                .with_default(0),
        ];
        let result = run(&options, &["-c", "a", "-v", "-c", "b", "-v", "-v"]);
        assert_eq!(result.values()["collect"], json!(["a", "b"]));
        assert_eq!(result.values()["verbose"], json!(3));
    }

    #[test]
    fn absent_options_are_finalized() {
        let options = vec![
            OptionDef::new("-p, --peppers", ""),
            OptionDef::new("-A, --no-apples", ""),
            OptionDef::new("-s, --size <size>", ""),
            OptionDef::new("-l [value]", "").with_default("default"),
        ];
        let result = run(&options, &[]);
        assert_eq!(result.values()["peppers"], json!(false));
        assert_eq!(result.values()["apples"], json!(true));
        assert_eq!(result.values()["size"], Value::Null);
        assert_eq!(result.values()["l"], json!("default"));
    }

    #[test]
    fn positions_follow_the_stream() {
        let result = run(&[], &["a", "-x", "b", "c"]);
        let at: Vec<usize> = result.positional.iter().map(|t| t.at).collect();
        assert_eq!(at, vec![0, 3]);
        assert_eq!(result.unknown[1].at, 2);
    }
}
