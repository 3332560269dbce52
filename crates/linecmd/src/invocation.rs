//! What an action sees when it runs.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::argument::ArgValue;
use crate::command::Command;
use crate::option::truthy;

/// A handler attached to a command.
pub type Action<M> = Arc<dyn Fn(&Invocation<'_, M>) + Send + Sync>;

/// Option values for one invocation, keyed by canonical option key.
///
/// Every option declared on the command and its ancestors has an entry.
/// Absent valued options hold `null`, which [`OptionValues::get`] reports as
/// `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionValues(IndexMap<String, Value>);

impl OptionValues {
    pub fn new(values: IndexMap<String, Value>) -> Self {
        Self(values)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Whether the option is set to a truthy value.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(truthy)
    }

    pub fn i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Whether an option with this key is declared, whatever its value.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.0
    }
}

/// A matched command with its bound arguments and options.
pub struct Invocation<'a, M> {
    pub(crate) command: &'a Command<M>,
    pub(crate) meta: &'a M,
    pub(crate) args: Vec<ArgValue>,
    pub(crate) extra: Vec<String>,
    pub(crate) opts: OptionValues,
}

impl<'a, M> Invocation<'a, M> {
    /// The command whose action is running.
    pub fn command(&self) -> &'a Command<M> {
        self.command
    }

    /// Metadata passed to `parse`.
    pub fn meta(&self) -> &'a M {
        self.meta
    }

    /// Bound arguments, one per declared argument, in declaration order.
    pub fn args(&self) -> &[ArgValue] {
        &self.args
    }

    /// The single value of argument `index`, if bound.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(ArgValue::as_str)
    }

    /// The values of argument `index`; handy for variadic arguments.
    pub fn values(&self, index: usize) -> &[String] {
        self.args.get(index).map(ArgValue::values).unwrap_or(&[])
    }

    /// Positional tokens left over after binding.
    pub fn extra(&self) -> &[String] {
        &self.extra
    }

    pub fn opts(&self) -> &OptionValues {
        &self.opts
    }

    /// Send through the command's output sink.
    pub fn send(&self, text: &str) -> Option<Value> {
        self.command.send(self.meta, text)
    }
}
