use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Coercion applied to an option value.
///
/// Called with the raw value (or `None` for a valueless boolean flag) and the
/// value accumulated so far (falling back to the declared default, then
/// `null`). Returning `null` means "no value".
pub type Coerce = Arc<dyn Fn(Option<&str>, &Value) -> Value + Send + Sync>;

/// A declared option such as `-s, --size <size>`.
#[derive(Clone)]
pub struct OptionDef {
    flags: String,
    description: String,
    short: Option<String>,
    long: String,
    key: String,
    negate: bool,
    required_value: bool,
    optional_value: bool,
    default: Option<Value>,
    coerce: Option<Coerce>,
}

impl fmt::Debug for OptionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDef")
            .field("flags", &self.flags)
            .field("key", &self.key)
            .field("short", &self.short)
            .field("long", &self.long)
            .field("default", &self.default)
            .field("coerce", &self.coerce.is_some())
            .finish()
    }
}

impl OptionDef {
    /// Parse a flags declaration.
    ///
    /// Flags are separated by commas, pipes or spaces: `"-p, --pepper"`,
    /// `"-p|--pepper"` and `"-p --pepper"` are equivalent. `<name>` marks a
    /// required value, `[name]` an optional one, and a `--no-` long flag
    /// declares a negated boolean that defaults to `true`.
    pub fn new(flags: impl Into<String>, description: impl Into<String>) -> Self {
        let flags = flags.into();
        let mut words = flags
            .split([' ', ',', '|'])
            .filter(|w| !w.is_empty())
            .peekable();

        let first = words.next().unwrap_or_default();
        let second_is_flag = words
            .peek()
            .is_some_and(|w| !w.starts_with('<') && !w.starts_with('['));
        let (short, long) = if second_is_flag {
            let long = words.next().unwrap_or_default();
            (Some(first.to_string()), long.to_string())
        } else {
            (None, first.to_string())
        };

        let key = canonical_key(&long);
        Self {
            negate: flags.contains("-no-"),
            required_value: flags.contains('<'),
            optional_value: flags.contains('['),
            description: description.into(),
            flags,
            short,
            long,
            key,
            default: None,
            coerce: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_coerce(mut self, coerce: Coerce) -> Self {
        self.coerce = Some(coerce);
        self
    }

    /// The declaration string, exactly as written.
    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn short(&self) -> Option<&str> {
        self.short.as_deref()
    }

    pub fn long(&self) -> &str {
        &self.long
    }

    /// Key under which the value is exposed, e.g. `dryRun` for `--dry-run`
    /// and `cheese` for `--no-cheese`.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_negated(&self) -> bool {
        self.negate
    }

    pub fn takes_required_value(&self) -> bool {
        self.required_value
    }

    pub fn takes_optional_value(&self) -> bool {
        self.optional_value
    }

    /// A flag that never consumes a value.
    pub fn is_switch(&self) -> bool {
        !self.required_value && !self.optional_value
    }

    pub fn matches(&self, token: &str) -> bool {
        self.long == token || self.short.as_deref() == Some(token)
    }

    /// Value present before any occurrence has been seen.
    pub(crate) fn initial(&self) -> Option<Value> {
        if self.negate {
            return Some(Value::Bool(true));
        }
        if self.is_switch() {
            return None;
        }
        self.default.clone()
    }

    /// Value exposed when the option never appeared and has no initial value.
    pub(crate) fn absent(&self) -> Value {
        if self.is_switch() {
            self.default.clone().unwrap_or(Value::Bool(false))
        } else {
            Value::Null
        }
    }

    /// Fold one occurrence into the accumulated value.
    pub fn resolve(&self, raw: Option<&str>, current: Option<&Value>) -> Value {
        let mut value = raw.map(|s| Value::String(s.to_string()));

        if let Some(coerce) = &self.coerce {
            if raw.is_some() || self.is_switch() {
                let previous = current
                    .or(self.default.as_ref())
                    .cloned()
                    .unwrap_or(Value::Null);
                value = Some(coerce(raw, &previous)).filter(|v| !v.is_null());
            }
        }

        match current {
            None | Some(Value::Null) | Some(Value::Bool(_)) => match value {
                Some(v) => v,
                None if self.negate => Value::Bool(false),
                None => self
                    .default
                    .clone()
                    .filter(truthy)
                    .unwrap_or(Value::Bool(true)),
            },
            Some(current) => value.unwrap_or_else(|| current.clone()),
        }
    }
}

/// Find the first declared option named by `token`.
pub fn find_option<'a, I>(options: I, token: &str) -> Option<&'a OptionDef>
where
    I: IntoIterator<Item = &'a OptionDef>,
{
    options.into_iter().find(|o| o.matches(token))
}

fn canonical_key(long: &str) -> String {
    let name = long.trim_start_matches('-');
    let name = name.strip_prefix("no-").unwrap_or(name);
    camel_case(name)
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, word) in name.split('-').filter(|w| !w.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(word);
            continue;
        }
        let mut chars = word.chars();
        if let Some(c) = chars.next() {
            out.extend(c.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_short_and_long_flags() {
        let opt = OptionDef::new("-s, --size <size>", "Pizza size");
        assert_eq!(opt.short(), Some("-s"));
        assert_eq!(opt.long(), "--size");
        assert_eq!(opt.key(), "size");
        assert!(opt.takes_required_value());
        assert!(!opt.takes_optional_value());
        assert!(!opt.is_negated());
    }

    #[test]
    fn accepts_pipe_and_space_separators() {
        for flags in ["-p|--pepper", "-p --pepper", "-p,--pepper"] {
            let opt = OptionDef::new(flags, "");
            assert_eq!(opt.short(), Some("-p"), "{flags}");
            assert_eq!(opt.long(), "--pepper", "{flags}");
        }
    }

    #[test]
    fn single_flag_with_value_has_no_short() {
        let opt = OptionDef::new("-s [value]", "");
        assert_eq!(opt.short(), None);
        assert_eq!(opt.long(), "-s");
        assert_eq!(opt.key(), "s");
        assert!(opt.takes_optional_value());
    }

    #[test]
    fn keys_are_camel_cased_without_negation() {
        assert_eq!(OptionDef::new("-o, -option-name", "").key(), "optionName");
        assert_eq!(OptionDef::new("--extra-large-name", "").key(), "extraLargeName");
        assert_eq!(OptionDef::new("-A, --no-apples", "").key(), "apples");
        assert_eq!(OptionDef::new("--piano-notes", "").key(), "pianoNotes");
    }

    #[test]
    fn negated_option_starts_true_and_flips() {
        let opt = OptionDef::new("-A, --no-apples", "");
        assert!(opt.is_negated());
        let initial = opt.initial();
        assert_eq!(initial, Some(json!(true)));
        assert_eq!(opt.resolve(None, initial.as_ref()), json!(false));
    }

    #[test]
    fn switch_resolves_to_true() {
        let opt = OptionDef::new("-v, --verbose", "");
        assert_eq!(opt.initial(), None);
        assert_eq!(opt.resolve(None, None), json!(true));
        assert_eq!(opt.absent(), json!(false));
    }

    #[test]
    fn optional_value_without_value_uses_truthy_default() {
        let opt = OptionDef::new("-d, --drink [drink]", "").with_default("coke");
        let initial = opt.initial();
        assert_eq!(initial, Some(json!("coke")));
        assert_eq!(opt.resolve(None, initial.as_ref()), json!("coke"));
        assert_eq!(opt.resolve(Some("izze"), initial.as_ref()), json!("izze"));

        let opt = OptionDef::new("-d, --drink [drink]", "");
        assert_eq!(opt.resolve(None, None), json!(true));
        assert_eq!(opt.absent(), Value::Null);
    }

    #[test]
    fn coercion_sees_previous_value() {
        let count: Coerce = Arc::new(|_: Option<&str>, prev: &Value| json!(prev.as_i64().unwrap_or(0) + 1));
        let opt = OptionDef::new("-v, --verbose", "")
            .with_coerce(count)
            .with_default(0);
        let once = opt.resolve(None, None);
        let twice = opt.resolve(None, Some(&once));
        assert_eq!(once, json!(1));
        assert_eq!(twice, json!(2));
    }

    #[test]
    fn null_coercion_result_keeps_current() {
        let never: Coerce = Arc::new(|_: Option<&str>, _: &Value| Value::Null);
        let opt = OptionDef::new("-s, --size <size>", "")
            .with_coerce(never)
            .with_default("medium");
        let initial = opt.initial();
        assert_eq!(opt.resolve(Some("huge"), initial.as_ref()), json!("medium"));
    }
}
