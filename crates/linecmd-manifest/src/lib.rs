//! Declarative command modules for `linecmd`.
//!
//! A command module is a JSON document declaring commands, their options and
//! arguments, and the name of the action each command runs. Actions are
//! looked up by name when the module is applied, so a module carries no
//! code. Modules may pull in further modules through `load`, with paths
//! relative to the module file.
//!
//! ```json
//! {
//!   "commands": [
//!     {
//!       "command": "greet <name>",
//!       "description": "Say hello",
//!       "options": [{ "flags": "-l, --loud", "description": "Shout" }],
//!       "action": "greet"
//!     }
//!   ],
//!   "load": ["more-commands.json"]
//! }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// File extension of command module files picked up from a directory.
pub const MODULE_EXTENSION: &str = "json";

/// Current module format version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandModule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandDecl>,
    /// Further modules applied to the same command, relative to this file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load: Vec<PathBuf>,
}

impl CommandModule {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One command declaration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandDecl {
    /// Name followed by argument declarations, e.g. `"cat <files...>"`.
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(default)]
    pub no_help: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_unknown_option: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_case: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_help_on_empty: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_help_on_error: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDecl>,
    /// Name of the registered action to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandDecl>,
    /// Modules applied to this command, relative to the declaring file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptionDecl {
    pub flags: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Builtin coercion name: `int`, `float`, `list`, `range`, `collect`,
    /// `count`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coerce: Option<String>,
    /// Regular expression the value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}
