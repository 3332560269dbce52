use anyhow::{Context, Result, bail};
use linecmd::Command;
use linecmd_manifest::{CommandDecl, CommandModule, FORMAT_VERSION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SETTINGS_NAME: &str = "linecmd.json";

pub const SETTINGS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,

    /// Lines must start with one of these to be handled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_unknown_option: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_help_on_empty: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_help_on_error: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_case: Option<bool>,

    /// Command module files or directories, relative to the settings file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<PathBuf>,
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("cannot read settings file {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        settings
            .validate()
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if let Some(version) = self.schema_version.filter(|v| *v > SETTINGS_SCHEMA_VERSION) {
            bail!("schemaVersion {version} is newer than the supported version {SETTINGS_SCHEMA_VERSION}");
        }
        // An empty prefix would match every line.
        if self.prefixes.iter().any(String::is_empty) {
            bail!("prefixes must not be empty strings");
        }
        Ok(())
    }

    /// Apply the parse flags to `root`. Must run before commands are
    /// declared, since children take their flags from the parent.
    pub fn configure<M>(&self, root: &mut Command<M>) {
        root.prefixes(self.prefixes.iter().cloned());
        if let Some(allow) = self.allow_unknown_option {
            root.allow_unknown_option(allow);
        }
        // A blank line at the prompt should not print the whole help.
        root.show_help_on_empty(self.show_help_on_empty.unwrap_or(false));
        if let Some(show) = self.show_help_on_error {
            root.show_help_on_error(show);
        }
        if let Some(lower_case) = self.lower_case {
            root.lower_case(lower_case);
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub base_dir: PathBuf,
    pub settings: Settings,
}

impl LoadedSettings {
    /// Module paths from the settings file, resolved against its directory.
    pub fn command_paths(&self) -> Vec<PathBuf> {
        self.settings
            .commands
            .iter()
            .map(|p| resolve_against(&self.base_dir, p))
            .collect()
    }
}

/// Read the shell settings. Without an explicit path, `./linecmd.json` is
/// used when present and defaults apply otherwise.
pub fn load_settings(settings_path: Option<&Path>) -> Result<Option<LoadedSettings>> {
    let Some(path) = locate_settings(settings_path)? else {
        tracing::debug!("no {DEFAULT_SETTINGS_NAME} in the working directory, using defaults");
        return Ok(None);
    };

    let settings = Settings::from_file(&path)?;
    let base_dir = match path.parent() {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("failed to get current directory")?,
    };
    tracing::debug!(
        path = %path.display(),
        prefixes = settings.prefixes.len(),
        modules = settings.commands.len(),
        "loaded settings"
    );

    Ok(Some(LoadedSettings { base_dir, settings }))
}

fn locate_settings(settings_path: Option<&Path>) -> Result<Option<PathBuf>> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    match settings_path {
        Some(p) => {
            let path = resolve_against(&cwd, p);
            if !path.is_file() {
                bail!("settings file {} does not exist", path.display());
            }
            Ok(Some(path))
        }
        None => {
            let path = cwd.join(DEFAULT_SETTINGS_NAME);
            Ok(path.is_file().then_some(path))
        }
    }
}

/// Write `linecmd.json` and a starter module under `commands/`.
pub fn write_default_settings(project_dir: &Path, overwrite: bool) -> Result<PathBuf> {
    let dest = project_dir.join(DEFAULT_SETTINGS_NAME);
    if dest.exists() && !overwrite {
        return Ok(dest);
    }

    let settings = Settings {
        schema_version: Some(SETTINGS_SCHEMA_VERSION),
        commands: vec![PathBuf::from("commands")],
        ..Default::default()
    };
    write_json(&dest, &settings, overwrite)?;

    let commands_dir = project_dir.join("commands");
    fs::create_dir_all(&commands_dir)
        .with_context(|| format!("failed to create {}", commands_dir.display()))?;
    let module = CommandModule {
        format_version: Some(FORMAT_VERSION),
        commands: vec![CommandDecl {
            command: "hello [words...]".to_string(),
            description: Some("Say hello".to_string()),
            action: Some("echo".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let module_path = commands_dir.join("hello.json");
    if overwrite || !module_path.exists() {
        write_json(&module_path, &module, overwrite)?;
    }
    Ok(dest)
}

fn write_json<T: Serialize>(dest: &Path, value: &T, overwrite: bool) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).context("failed to serialize JSON")?;
    let mut out = String::from_utf8(bytes).context("JSON is not valid UTF-8")?;
    out.push('\n');

    let tmp = dest.with_extension("tmp");
    fs::write(&tmp, out.as_bytes())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    if overwrite && dest.exists() {
        fs::remove_file(dest).with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    fs::rename(&tmp, dest)
        .with_context(|| format!("failed to move {} into place", dest.display()))?;
    Ok(())
}

pub(crate) fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
