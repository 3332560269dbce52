//! Applying command modules from the filesystem to a command tree.
//!
//! A module is a JSON [`CommandModule`]; its actions are resolved by name
//! against a [`HandlerSet`]. Loading happens while the tree is being
//! configured, so every problem is a hard [`LoadError`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use linecmd_manifest::{CommandDecl, CommandModule, MODULE_EXTENSION, OptionDecl};
use regex::Regex;
use tracing::debug;

use crate::coerce;
use crate::command::Command;
use crate::error::{DeclareError, LoadError};
use crate::invocation::{Action, Invocation};
use crate::option::OptionDef;

/// Actions available to modules, by name.
pub struct HandlerSet<M> {
    actions: IndexMap<String, Action<M>>,
}

impl<M> Default for HandlerSet<M> {
    fn default() -> Self {
        Self {
            actions: IndexMap::new(),
        }
    }
}

impl<M> HandlerSet<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, action: F) -> &mut Self
    where
        F: Fn(&Invocation<'_, M>) + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(action));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Action<M>> {
        self.actions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }
}

pub struct Loader<M> {
    handlers: HandlerSet<M>,
}

impl<M> Loader<M> {
    pub fn new(handlers: HandlerSet<M>) -> Self {
        Self { handlers }
    }

    pub fn handlers(&self) -> &HandlerSet<M> {
        &self.handlers
    }

    /// Load a module file, or every `*.json` file of a directory in file
    /// name order, into `cmd`.
    pub fn load(&self, cmd: &mut Command<M>, path: &Path) -> Result<(), LoadError> {
        self.load_path(cmd, path, &mut Vec::new())
    }

    /// Apply an already decoded module. Relative `load` paths resolve
    /// against the directory of `source`.
    pub fn apply(&self, cmd: &mut Command<M>, module: &CommandModule, source: &Path) -> Result<(), LoadError> {
        let mut active: Vec<PathBuf> = fs::canonicalize(source).into_iter().collect();
        self.apply_module(cmd, module, source, &mut active)
    }

    /// `active` holds the canonical paths of the module files being applied,
    /// outermost first.
    fn load_path(&self, cmd: &mut Command<M>, path: &Path, active: &mut Vec<PathBuf>) -> Result<(), LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return self.load_file(cmd, path, active);
        }

        let entries = fs::read_dir(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let file = entry.path();
            if file.is_file() && file.extension().is_some_and(|ext| ext == MODULE_EXTENSION) {
                files.push(file);
            }
        }
        files.sort();

        debug!(dir = %path.display(), count = files.len(), "loading command modules");
        for file in files {
            self.load_file(cmd, &file, active)?;
        }
        Ok(())
    }

    fn load_file(&self, cmd: &mut Command<M>, path: &Path, active: &mut Vec<PathBuf>) -> Result<(), LoadError> {
        let canonical = fs::canonicalize(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if active.contains(&canonical) {
            return Err(LoadError::Cycle(path.to_path_buf()));
        }

        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let module = CommandModule::from_json(&text).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), commands = module.commands.len(), "loaded command module");

        active.push(canonical);
        let applied = self.apply_module(cmd, &module, path, active);
        active.pop();
        applied
    }

    fn apply_module(
        &self,
        cmd: &mut Command<M>,
        module: &CommandModule,
        source: &Path,
        active: &mut Vec<PathBuf>,
    ) -> Result<(), LoadError> {
        for decl in &module.commands {
            self.declare(cmd, decl, source, active)?;
        }
        for path in &module.load {
            self.load_path(cmd, &resolve_against(source, path), active)?;
        }
        Ok(())
    }

    fn declare(
        &self,
        parent: &mut Command<M>,
        decl: &CommandDecl,
        source: &Path,
        active: &mut Vec<PathBuf>,
    ) -> Result<(), LoadError> {
        let declare_err = |source_err: DeclareError| LoadError::Declare {
            path: source.to_path_buf(),
            source: source_err,
        };

        let cmd = parent
            .command_with(&decl.command, decl.no_help)
            .map_err(declare_err)?;

        if let Some(description) = &decl.description {
            cmd.description(description.as_str());
        }
        if let Some(alias) = &decl.alias {
            cmd.alias(alias.as_str());
        }
        if let Some(usage) = &decl.usage {
            cmd.usage(usage.as_str());
        }
        if let Some(allow) = decl.allow_unknown_option {
            cmd.allow_unknown_option(allow);
        }
        if let Some(lower_case) = decl.lower_case {
            cmd.lower_case(lower_case);
        }
        if let Some(show) = decl.show_help_on_empty {
            cmd.show_help_on_empty(show);
        }
        if let Some(show) = decl.show_help_on_error {
            cmd.show_help_on_error(show);
        }

        for option in &decl.options {
            cmd.add_option(self.option(option, source)?);
        }

        if let Some(name) = &decl.action {
            let action = self
                .handlers
                .get(name)
                .ok_or_else(|| LoadError::UnknownHandler {
                    path: source.to_path_buf(),
                    command: decl.command.clone(),
                    action: name.clone(),
                })?;
            cmd.add_action(action.clone());
        }

        for child in &decl.commands {
            self.declare(cmd, child, source, active)?;
        }
        for path in &decl.load {
            self.load_path(cmd, &resolve_against(source, path), active)?;
        }
        Ok(())
    }

    fn option(&self, decl: &OptionDecl, source: &Path) -> Result<OptionDef, LoadError> {
        let mut option = OptionDef::new(decl.flags.as_str(), decl.description.as_str());

        if let Some(pattern) = &decl.pattern {
            let regex = Regex::new(pattern).map_err(|e| LoadError::Declare {
                path: source.to_path_buf(),
                source: DeclareError::InvalidPattern {
                    flags: decl.flags.clone(),
                    message: e.to_string(),
                },
            })?;
            option = option.with_coerce(coerce::pattern(regex));
        } else if let Some(name) = &decl.coerce {
            let coerce = coerce::by_name(name).ok_or_else(|| LoadError::UnknownCoercion {
                path: source.to_path_buf(),
                flags: decl.flags.clone(),
                coerce: name.clone(),
            })?;
            option = option.with_coerce(coerce);
        }

        if let Some(default) = &decl.default {
            option = option.with_default(default.clone());
        }
        Ok(option)
    }
}

fn resolve_against(source: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match source.parent() {
        Some(dir) => dir.join(path),
        None => path.to_path_buf(),
    }
}
