use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::argument::{ArgSpec, bind, extend_specs};
use crate::coerce;
use crate::config::{ParseConfig, SendFn};
use crate::error::{DeclareError, ParseError};
use crate::help;
use crate::invocation::{Action, Invocation, OptionValues};
use crate::option::{Coerce, OptionDef};
use crate::parser::{ParseResult, Token, finalize, parse_options, seed, stream};
use crate::token::{normalize_indexed, tokenize};

/// Name of the fallback listener for lines no command matches.
pub const WILDCARD: &str = "*";

const HELP_COMMAND: &str = "help";

/// A node in the command tree.
///
/// The root is created with [`Command::new`]; children are declared with
/// [`Command::command`] and configured through the `&mut` it returns.
pub struct Command<M> {
    name: String,
    alias: Option<String>,
    description: Option<String>,
    usage: Option<String>,
    no_help: bool,
    prefixes: Vec<String>,
    options: Vec<OptionDef>,
    arg_specs: Vec<ArgSpec>,
    children: Vec<Command<M>>,
    actions: Vec<Action<M>>,
    config: ParseConfig<M>,
}

/// State a node hands to the child it delegates to.
struct Inherited<'a> {
    options: Vec<&'a OptionDef>,
    values: IndexMap<String, Value>,
    unknown: Vec<String>,
    errors: Vec<ParseError>,
    help: bool,
}

impl Default for Inherited<'_> {
    fn default() -> Self {
        Self {
            options: Vec::new(),
            values: IndexMap::new(),
            unknown: Vec::new(),
            errors: Vec::new(),
            help: false,
        }
    }
}

impl<M> Default for Command<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Command<M> {
    /// An unnamed root command.
    pub fn new() -> Self {
        Self::named("")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::with_config(name.into(), ParseConfig::default())
    }

    fn with_config(name: String, config: ParseConfig<M>) -> Self {
        Self {
            name,
            alias: None,
            description: None,
            usage: None,
            no_help: false,
            prefixes: Vec::new(),
            options: Vec::new(),
            arg_specs: Vec::new(),
            children: Vec::new(),
            actions: Vec::new(),
            config,
        }
    }

    /// Declare a subcommand: `"name <required> [optional] [rest...]"`.
    ///
    /// The child starts with a copy of this node's parse settings. Declaring
    /// the first child also declares a `help [cmd]` child ahead of it.
    pub fn command(&mut self, decl: &str) -> Result<&mut Command<M>, DeclareError> {
        self.command_with(decl, false)
    }

    /// Like [`Command::command`]; `no_help` hides the child from help output.
    pub fn command_with(&mut self, decl: &str, no_help: bool) -> Result<&mut Command<M>, DeclareError> {
        let words = tokenize(decl);
        let Some((name, args)) = words.split_first() else {
            return Err(DeclareError::EmptyCommandName);
        };

        let mut child = Self::with_config(name.clone(), self.config.clone());
        child.no_help = no_help;
        extend_specs(&mut child.arg_specs, args.iter().map(String::as_str))?;

        if self.children.is_empty() && name != HELP_COMMAND {
            let mut help = Self::with_config(HELP_COMMAND.to_string(), self.config.clone());
            help.description = Some("display help for [cmd]".to_string());
            extend_specs(&mut help.arg_specs, ["[cmd]"])?;
            self.children.push(help);
        }

        debug!(parent = %self.name, command = %child.name, "declared command");
        self.children.push(child);
        let last = self.children.len() - 1;
        Ok(&mut self.children[last])
    }

    /// Declare more positional arguments: `"<required> [optional]"`.
    pub fn arguments(&mut self, decl: &str) -> Result<&mut Self, DeclareError> {
        let words = tokenize(decl);
        extend_specs(&mut self.arg_specs, words.iter().map(String::as_str))?;
        Ok(self)
    }

    /// Declare an option: `"-s, --size <size>"`, `"-d [drink]"`,
    /// `"-p|--pepper"`, `"--no-cheese"`.
    pub fn option(&mut self, flags: &str, description: &str) -> &mut Self {
        self.add_option(OptionDef::new(flags, description))
    }

    pub fn option_default(&mut self, flags: &str, description: &str, default: impl Into<Value>) -> &mut Self {
        self.add_option(OptionDef::new(flags, description).with_default(default))
    }

    pub fn option_with(&mut self, flags: &str, description: &str, coerce: Coerce) -> &mut Self {
        self.add_option(OptionDef::new(flags, description).with_coerce(coerce))
    }

    pub fn option_with_default(
        &mut self,
        flags: &str,
        description: &str,
        coerce: Coerce,
        default: impl Into<Value>,
    ) -> &mut Self {
        self.add_option(
            OptionDef::new(flags, description)
                .with_coerce(coerce)
                .with_default(default),
        )
    }

    /// Declare an option whose value must match `pattern`; a value that does
    /// not match leaves the default.
    pub fn option_matching(
        &mut self,
        flags: &str,
        description: &str,
        pattern: &str,
        default: Option<Value>,
    ) -> Result<&mut Self, DeclareError> {
        let regex = Regex::new(pattern).map_err(|e| DeclareError::InvalidPattern {
            flags: flags.to_string(),
            message: e.to_string(),
        })?;
        let mut option = OptionDef::new(flags, description).with_coerce(coerce::pattern(regex));
        if let Some(default) = default {
            option = option.with_default(default);
        }
        Ok(self.add_option(option))
    }

    pub fn add_option(&mut self, option: OptionDef) -> &mut Self {
        self.options.push(option);
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn alias(&mut self, alias: impl Into<String>) -> &mut Self {
        self.alias = Some(alias.into());
        self
    }

    /// Replace the generated usage line.
    pub fn usage(&mut self, usage: impl Into<String>) -> &mut Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn no_help(&mut self, no_help: bool) -> &mut Self {
        self.no_help = no_help;
        self
    }

    pub fn allow_unknown_option(&mut self, allow: bool) -> &mut Self {
        self.config.allow_unknown_option = allow;
        self
    }

    pub fn show_help_on_error(&mut self, show: bool) -> &mut Self {
        self.config.show_help_on_error = show;
        self
    }

    pub fn show_help_on_empty(&mut self, show: bool) -> &mut Self {
        self.config.show_help_on_empty = show;
        self
    }

    /// Match command names and aliases case-insensitively.
    pub fn lower_case(&mut self, lower_case: bool) -> &mut Self {
        self.config.lower_case = lower_case;
        self
    }

    /// Only parse lines starting with `prefix`; may be called more than once.
    pub fn prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn prefixes<I, S>(&mut self, prefixes: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes.extend(prefixes.into_iter().map(Into::into));
        self
    }

    fn apply_send(&mut self, sink: SendFn<M>) {
        for child in &mut self.children {
            child.apply_send(sink.clone());
        }
        self.config.send = Some(sink);
    }

    /// Register an action. Actions run in registration order.
    pub fn action<F>(&mut self, action: F) -> &mut Self
    where
        F: Fn(&Invocation<'_, M>) + Send + Sync + 'static,
    {
        self.actions.push(Arc::new(action));
        self
    }

    pub fn add_action(&mut self, action: Action<M>) -> &mut Self {
        self.actions.push(action);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The usage line: the override if set, else `[options]`, then
    /// `[command]` when there are subcommands, then the arguments.
    pub fn usage_line(&self) -> String {
        if let Some(usage) = &self.usage {
            return usage.clone();
        }
        let mut line = String::from("[options]");
        if !self.children.is_empty() {
            line.push_str(" [command]");
        }
        if !self.arg_specs.is_empty() {
            let args: Vec<String> = self.arg_specs.iter().map(ArgSpec::human_readable).collect();
            line.push(' ');
            line.push_str(&args.join(" "));
        }
        line
    }

    pub fn is_no_help(&self) -> bool {
        self.no_help
    }

    pub fn commands(&self) -> &[Command<M>] {
        &self.children
    }

    pub fn options(&self) -> &[OptionDef] {
        &self.options
    }

    pub fn arg_specs(&self) -> &[ArgSpec] {
        &self.arg_specs
    }

    pub fn config(&self) -> &ParseConfig<M> {
        &self.config
    }

    pub fn prefix_list(&self) -> &[String] {
        &self.prefixes
    }

    /// The child answering to `name` (canonical name or alias).
    pub fn find_command(&self, name: &str) -> Option<&Command<M>> {
        self.children.iter().find(|c| c.answers_to(name))
    }

    pub fn find_command_mut(&mut self, name: &str) -> Option<&mut Command<M>> {
        self.children.iter_mut().find(|c| c.answers_to(name))
    }

    pub fn help(&self) -> String {
        help::render(self)
    }

    fn answers_to(&self, token: &str) -> bool {
        if self.name == token || self.alias.as_deref() == Some(token) {
            return true;
        }
        if !self.config.lower_case {
            return false;
        }
        let lower = token.to_lowercase();
        self.name == lower || self.alias.as_deref() == Some(lower.as_str())
    }

    fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }

    /// Deliver `text` through the configured sink.
    ///
    /// Empty text is never sent. Returns what the sink returned, or `None`
    /// when nothing was sent.
    pub fn send(&self, meta: &M, text: &str) -> Option<Value> {
        if text.is_empty() {
            return None;
        }
        match &self.config.send {
            Some(sink) => Some(sink(meta, text)),
            None => {
                debug!(command = %self.name, "no send function configured, dropping message");
                None
            }
        }
    }

    pub fn output_help(&self, meta: &M) -> Option<Value> {
        debug!(command = %self.name, "sending help");
        self.send(meta, &self.help())
    }

    fn report(&self, meta: &M, errors: &[ParseError]) {
        debug!(command = %self.name, count = errors.len(), "reporting parse errors");
        let mut text = errors
            .iter()
            .map(ParseError::render)
            .collect::<Vec<_>>()
            .join("\n");
        if self.config.show_help_on_error {
            text.push('\n');
            text.push_str(&self.help());
        }
        self.send(meta, &text);
    }

    /// Parse `line` and dispatch it.
    ///
    /// Lines not starting with one of the configured prefixes are ignored.
    /// Everything else ends in exactly one of: an action call, a help
    /// message, an error message, or nothing when no command matches and no
    /// wildcard action exists.
    pub fn parse(&self, line: &str, meta: &M) {
        let line = match self.strip_prefix(line) {
            Some(line) => line,
            None => {
                debug!(command = %self.name, "line does not start with a configured prefix");
                return;
            }
        };
        self.dispatch(tokenize(line), meta, Inherited::default());
    }

    /// Run only the option parser for `line` at this node, without
    /// dispatching anything.
    pub fn scan(&self, line: &str) -> ParseResult {
        let known: Vec<&OptionDef> = self.options.iter().collect();
        let raw = tokenize(line);
        let tokens = stream(normalize_indexed(&raw, &known).into_iter().map(|(i, t)| (Some(i), t)));
        let mut result = parse_options(&known, &tokens, seed(IndexMap::new(), &self.options));
        result.values = finalize(result.values, &known);
        result
    }

    fn strip_prefix<'l>(&self, line: &'l str) -> Option<&'l str> {
        if self.prefixes.is_empty() {
            return Some(line);
        }
        self.prefixes
            .iter()
            .find_map(|prefix| line.strip_prefix(prefix.as_str()))
    }

    fn dispatch(&self, raw: Vec<String>, meta: &M, inherited: Inherited<'_>) {
        let Inherited {
            options: inherited_options,
            values,
            unknown,
            errors: inherited_errors,
            mut help,
        } = inherited;

        let mut known: Vec<&OptionDef> = self.options.iter().collect();
        known.extend(inherited_options);

        let tokens = stream(
            unknown
                .into_iter()
                .map(|t| (None, t))
                .chain(normalize_indexed(&raw, &known).into_iter().map(|(i, t)| (Some(i), t))),
        );
        let seeded = seed(values, &self.options);
        let parsed = parse_options(&known, &tokens, seeded.clone());

        let mut errors = inherited_errors.clone();
        errors.extend(parsed.errors.iter().cloned());
        let mut positional = parsed.positional;

        if positional.first().is_none_or(|t| t.text.is_empty()) {
            if !errors.is_empty() {
                self.report(meta, &errors);
            } else if help || wants_help(&parsed.unknown) || self.config.show_help_on_empty {
                self.output_help(meta);
            }
            return;
        }

        if positional[0].text == HELP_COMMAND {
            if positional.len() == 1 {
                self.output_help(meta);
                return;
            }
            positional.remove(0);
            help = true;
        }

        let head = positional[0].text.as_str();

        if let Some(child) = self.children.iter().find(|c| c.has_actions() && c.answers_to(head)) {
            debug!(command = %child.name, "invoking command");
            positional.remove(0);
            let mut unknown = parsed.unknown;
            if help {
                unknown.push(Token::synthetic("--help"));
            }
            child.invoke(meta, positional, unknown, finalize(parsed.values, &known), errors);
            return;
        }

        if let Some(child) = self.children.iter().find(|c| c.answers_to(head)) {
            debug!(command = %child.name, "delegating to subcommand");
            let command = positional.remove(0);
            let before: Vec<Token> = tokens.iter().take_while(|t| t.at < command.at).cloned().collect();
            let pre = parse_options(&known, &before, seeded);

            let remainder = match command.raw {
                Some(i) => raw[i + 1..].to_vec(),
                None => raw,
            };
            let mut forwarded_errors = inherited_errors;
            forwarded_errors.extend(pre.errors);

            child.dispatch(
                remainder,
                meta,
                Inherited {
                    options: known,
                    values: pre.values,
                    unknown: pre.unknown.into_iter().map(|t| t.text).collect(),
                    errors: forwarded_errors,
                    help,
                },
            );
            return;
        }

        let wildcard = self
            .children
            .iter()
            .find(|c| c.name == WILDCARD && c.has_actions())
            .or_else(|| self.has_actions().then_some(self));

        match wildcard {
            Some(target) => {
                debug!(command = %self.name, token = %head, "no command matched, using wildcard");
                let mut unknown = parsed.unknown;
                if help {
                    unknown.push(Token::synthetic("--help"));
                }
                target.invoke(meta, positional, unknown, finalize(parsed.values, &known), errors);
            }
            None if !errors.is_empty() => self.report(meta, &errors),
            None => debug!(command = %self.name, token = %head, "no command matched"),
        }
    }

    /// Bind arguments and run this node's actions.
    fn invoke(
        &self,
        meta: &M,
        mut positional: Vec<Token>,
        unknown: Vec<Token>,
        values: IndexMap<String, Value>,
        mut errors: Vec<ParseError>,
    ) {
        let own: Vec<&OptionDef> = self.options.iter().collect();
        let reparsed = parse_options(&own, &unknown, seed(values, &self.options));
        errors.extend(reparsed.errors);
        let values = finalize(reparsed.values, &own);

        if wants_help(&reparsed.unknown) {
            self.output_help(meta);
            return;
        }
        if let Some(first) = reparsed.unknown.first() {
            if !self.config.allow_unknown_option {
                errors.push(ParseError::UnknownOption(first.text.clone()));
            }
        }

        positional.extend(reparsed.positional);
        positional.sort_by_key(|t| t.at);
        let texts: Vec<String> = positional.into_iter().map(|t| t.text).collect();

        let bound = bind(&self.arg_specs, &texts);
        errors.extend(bound.errors);
        if !errors.is_empty() {
            self.report(meta, &errors);
            return;
        }

        let invocation = Invocation {
            command: self,
            meta,
            args: bound.values,
            extra: bound.extra,
            opts: OptionValues::new(values),
        };
        for action in &self.actions {
            action(&invocation);
        }
    }
}

impl<M: 'static> Command<M> {
    /// Set the output sink for this command and every command below it.
    pub fn set_send<F, R>(&mut self, send: F) -> &mut Self
    where
        F: Fn(&M, &str) -> R + Send + Sync + 'static,
        R: Into<Value> + 'static,
    {
        let sink: SendFn<M> = Arc::new(move |meta: &M, text: &str| send(meta, text).into());
        self.apply_send(sink);
        self
    }
}

fn wants_help(unknown: &[Token]) -> bool {
    unknown.iter().any(|t| t.text == "-h" || t.text == "--help")
}

impl<M> fmt::Debug for Command<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("options", &self.options)
            .field("arg_specs", &self.arg_specs)
            .field("children", &self.children)
            .field("actions", &self.actions.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Sent = Arc<Mutex<Vec<String>>>;

    fn capture(cmd: &mut Command<()>) -> Sent {
        let sent: Sent = Arc::default();
        let sink = sent.clone();
        cmd.set_send(move |_: &(), text: &str| {
            sink.lock().unwrap().push(text.to_string());
            Value::Null
        });
        sent
    }

    #[test]
    fn first_child_brings_help_command() {
        let mut root = Command::<()>::new();
        root.command("test").unwrap();
        let names: Vec<&str> = root.commands().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["help", "test"]);
        assert_eq!(root.usage_line(), "[options] [command]");
    }

    #[test]
    fn empty_declaration_is_rejected() {
        let mut root = Command::<()>::new();
        assert_eq!(root.command("   ").unwrap_err(), DeclareError::EmptyCommandName);
        assert!(root.commands().is_empty());
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let mut root = Command::<()>::new();
        let err = root.option_matching("-s <size>", "", "(", None).unwrap_err();
        assert!(matches!(err, DeclareError::InvalidPattern { .. }));
    }

    #[test]
    fn children_copy_settings_at_declaration() {
        let mut root = Command::<()>::new();
        root.lower_case(true);
        root.command("early").unwrap();
        root.lower_case(false);
        root.command("late").unwrap();
        assert!(root.find_command("early").unwrap().config().lower_case);
        assert!(!root.find_command("late").unwrap().config().lower_case);
    }

    #[test]
    fn send_skips_empty_text() {
        let mut root = Command::<()>::new();
        root.set_send(|_: &(), text: &str| Value::from(text.len()));
        assert_eq!(root.send(&(), ""), None);
        assert_eq!(root.send(&(), "abc"), Some(Value::from(3)));
    }

    #[test]
    fn send_reaches_existing_children() {
        let mut root = Command::<()>::new();
        root.command("test").unwrap();
        let sent = capture(&mut root);
        root.find_command("test").unwrap().send(&(), "hi");
        assert_eq!(*sent.lock().unwrap(), vec!["hi".to_string()]);
    }

    #[test]
    fn scan_reports_parse_result() {
        let mut root = Command::<()>::new();
        root.option("-s, --size <size>", "");
        let result = root.scan("order -s large -x");
        assert_eq!(result.positional(), vec!["order"]);
        assert_eq!(result.unknown(), vec!["-x"]);
        assert_eq!(result.values()["size"], Value::from("large"));
    }

    #[test]
    fn errors_without_listener_are_reported() {
        let mut root = Command::<()>::new();
        root.option("-s, --size <size>", "").show_help_on_error(false);
        let sent = capture(&mut root);
        root.parse("-s", &());
        assert_eq!(
            *sent.lock().unwrap(),
            vec!["  error: option -s, --size <size> argument missing".to_string()]
        );
    }
}
