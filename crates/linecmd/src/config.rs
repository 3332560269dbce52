use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Output sink: receives the caller's metadata and a rendered message.
pub type SendFn<M> = Arc<dyn Fn(&M, &str) -> Value + Send + Sync>;

/// Per-node parse settings. A child starts from a copy of its parent's
/// settings at the time it is declared.
pub struct ParseConfig<M> {
    pub(crate) send: Option<SendFn<M>>,
    pub allow_unknown_option: bool,
    pub show_help_on_error: bool,
    pub show_help_on_empty: bool,
    pub lower_case: bool,
}

impl<M> ParseConfig<M> {
    pub fn has_send(&self) -> bool {
        self.send.is_some()
    }
}

impl<M> Default for ParseConfig<M> {
    fn default() -> Self {
        Self {
            send: None,
            allow_unknown_option: false,
            show_help_on_error: true,
            show_help_on_empty: true,
            lower_case: false,
        }
    }
}

impl<M> Clone for ParseConfig<M> {
    fn clone(&self) -> Self {
        Self {
            send: self.send.clone(),
            allow_unknown_option: self.allow_unknown_option,
            show_help_on_error: self.show_help_on_error,
            show_help_on_empty: self.show_help_on_empty,
            lower_case: self.lower_case,
        }
    }
}

impl<M> fmt::Debug for ParseConfig<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseConfig")
            .field("send", &self.send.is_some())
            .field("allow_unknown_option", &self.allow_unknown_option)
            .field("show_help_on_error", &self.show_help_on_error)
            .field("show_help_on_empty", &self.show_help_on_empty)
            .field("lower_case", &self.lower_case)
            .finish()
    }
}
