//! Line tokenizing and flag normalization.

use crate::option::{OptionDef, find_option};

/// Marks the end of option parsing; everything after it is positional.
pub const LITERAL: &str = "--";

/// Split `line` on whitespace, keeping quoted spans together.
///
/// A quote opens at the start of a token or right after `=`, `<` or `[`, and
/// runs to the next matching quote character (or the end of the line).
/// Quote characters stay in the token; they are only stripped when the
/// token is bound to an argument.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in line.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        if (c == '"' || c == '\'') && opens_quote(&current) {
            quote = Some(c);
        }
        current.push(c);
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tracing::trace!(?tokens, "tokenized line");
    tokens
}

fn opens_quote(current: &str) -> bool {
    matches!(current.chars().last(), None | Some('=' | '<' | '['))
}

/// Whether `token` looks like an option (`-x`, `--xyz`), as opposed to a
/// value. A lone `-` is a value.
pub fn looks_like_flag(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-')
}

/// Strip one pair of matching surrounding quotes, if present.
pub fn unquote(token: &str) -> &str {
    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return &token[1..token.len() - 1];
        }
    }
    token
}

/// Rewrite raw tokens so each flag is its own token.
///
/// - `--` and everything after it pass through untouched.
/// - The token after a required-value option passes through untouched, so
///   values such as `-5` are not read as flags.
/// - `-abc` becomes `-a -b -c`; `-ab=v` becomes `-a -b v`.
/// - `--key=value` becomes `--key value`.
pub fn normalize(tokens: &[String], options: &[&OptionDef]) -> Vec<String> {
    normalize_indexed(tokens, options)
        .into_iter()
        .map(|(_, token)| token)
        .collect()
}

/// Like [`normalize`], pairing each output token with the index of the raw
/// token it came from.
pub(crate) fn normalize_indexed(tokens: &[String], options: &[&OptionDef]) -> Vec<(usize, String)> {
    let mut out = Vec::with_capacity(tokens.len());

    for (i, arg) in tokens.iter().enumerate() {
        if arg == LITERAL {
            out.extend(tokens[i..].iter().cloned().enumerate().map(|(j, t)| (i + j, t)));
            break;
        }

        let after_required = i > 0
            && find_option(options.iter().copied(), &tokens[i - 1])
                .is_some_and(|o| o.takes_required_value());
        if after_required {
            out.push((i, arg.clone()));
            continue;
        }

        if is_short_cluster(arg) {
            let body = &arg[1..];
            let (flags, value) = match body.split_once('=') {
                Some((flags, value)) => (flags, Some(value)),
                None => (body, None),
            };
            out.extend(flags.chars().map(|c| (i, format!("-{c}"))));
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                out.push((i, value.to_string()));
            }
            continue;
        }

        if arg.starts_with(LITERAL) {
            if let Some((flag, value)) = arg.split_once('=') {
                out.push((i, flag.to_string()));
                out.push((i, value.to_string()));
                continue;
            }
        }

        out.push((i, arg.clone()));
    }

    tracing::trace!(tokens = ?out, "normalized tokens");
    out
}

fn is_short_cluster(arg: &str) -> bool {
    let mut chars = arg.chars();
    chars.next() == Some('-') && chars.next().is_some_and(|c| c != '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tokenize_keeps_quoted_spans() {
        assert_eq!(
            tokenize(r#"test "a b"  'c  d' e"#),
            strings(&["test", "\"a b\"", "'c  d'", "e"])
        );
    }

    #[test]
    fn tokenize_discards_empty_tokens() {
        assert!(tokenize("   ").is_empty());
        assert_eq!(tokenize("  a   b "), strings(&["a", "b"]));
    }

    #[test]
    fn tokenize_ignores_apostrophes_inside_words() {
        assert_eq!(tokenize("it's fine"), strings(&["it's", "fine"]));
    }

    #[test]
    fn tokenize_unterminated_quote_runs_to_end() {
        assert_eq!(tokenize(r#"say "hello there"#), strings(&["say", "\"hello there"]));
    }

    #[test]
    fn tokenize_keeps_quoted_argument_labels() {
        assert_eq!(
            tokenize(r#"copy <"file name"> [dest]"#),
            strings(&["copy", "<\"file name\">", "[dest]"])
        );
    }

    #[test]
    fn unquote_strips_matching_quotes_only() {
        assert_eq!(unquote("\"a b\""), "a b");
        assert_eq!(unquote("'a b'"), "a b");
        assert_eq!(unquote("\"a b'"), "\"a b'");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn normalize_expands_short_clusters() {
        let out = normalize(&strings(&["-oe", "-a"]), &[]);
        assert_eq!(out, strings(&["-o", "-e", "-a"]));
    }

    #[test]
    fn normalize_appends_cluster_value() {
        let out = normalize(&strings(&["-s=val"]), &[]);
        assert_eq!(out, strings(&["-s", "val"]));

        let out = normalize(&strings(&["-ab=x=y"]), &[]);
        assert_eq!(out, strings(&["-a", "-b", "x=y"]));
    }

    #[test]
    fn normalize_splits_long_equals() {
        let out = normalize(&strings(&["--large=val2", "--plain"]), &[]);
        assert_eq!(out, strings(&["--large", "val2", "--plain"]));
    }

    #[test]
    fn normalize_stops_at_literal() {
        let out = normalize(&strings(&["-ab", "--", "-cd", "--x=y"]), &[]);
        assert_eq!(out, strings(&["-a", "-b", "--", "-cd", "--x=y"]));
    }

    #[test]
    fn normalize_indexed_tracks_source_tokens() {
        let out = normalize_indexed(&strings(&["test", "-ab", "--x=y"]), &[]);
        let sources: Vec<usize> = out.iter().map(|(i, _)| *i).collect();
        assert_eq!(sources, vec![0, 1, 1, 2, 2]);
    }

    #[test]
    fn normalize_keeps_value_after_required_option() {
        let number = OptionDef::new("-n, --number <n>", "");
        let out = normalize(&strings(&["-n", "-5", "-xy"]), &[&number]);
        assert_eq!(out, strings(&["-n", "-5", "-x", "-y"]));
    }
}
