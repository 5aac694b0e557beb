//! Settings resolution: project file, else bundled defaults + user overrides.
//!
//! ## Search order
//!
//! 1. `<working dir>/<settings file name>`
//! 2. the subtree of every project folder, in the order given
//!
//! Within one project folder several files may match. The walk is sorted by
//! file name and the shallowest match wins, ties broken by path order, so the
//! result does not depend on the platform's directory iteration order.
//!
//! A project file, when found, is authoritative: it is *not* merged with the
//! defaults. Settings are re-read on every call, so edits to the project file
//! apply to the next conversion.

use crate::config::SpandocConfig;
use crate::error::SpandocError;
use crate::output::{ResolvedSettings, SettingsSource};
use crate::pipeline::jsonc;
use crate::settings::{self, Settings};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Resolve the effective settings for a document.
///
/// # Arguments
/// * `working_dir` — directory of the active document, `None` when unsaved
/// * `project_folders` — root folders open in the editor window
pub fn resolve_settings(
    config: &SpandocConfig,
    working_dir: Option<&Path>,
    project_folders: &[PathBuf],
) -> Result<ResolvedSettings, SpandocError> {
    let search_folders: &[PathBuf] = if config.search_project_folders {
        project_folders
    } else {
        &[]
    };

    if let Some(path) = find_project_settings(&config.settings_file_name, working_dir, search_folders)
    {
        let settings = load_project_settings(&path)?;
        log_source(config, &format!("Using project settings {}", path.display()));
        return Ok(ResolvedSettings {
            settings,
            source: SettingsSource::Project(path),
        });
    }

    load_default_settings(config)
}

/// Locate the project settings file without reading it.
pub fn find_project_settings(
    file_name: &str,
    working_dir: Option<&Path>,
    project_folders: &[PathBuf],
) -> Option<PathBuf> {
    if let Some(dir) = working_dir {
        let candidate = dir.join(file_name);
        debug!("Is {} in the current folder? {}", file_name, dir.display());
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    for folder in project_folders {
        debug!("Searching {} for {}", folder.display(), file_name);
        let mut matches: Vec<(usize, PathBuf)> = WalkDir::new(folder)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && e.file_name() == file_name)
            .map(|e| (e.depth(), e.into_path()))
            .collect();

        if matches.is_empty() {
            continue;
        }
        matches.sort();
        if matches.len() > 1 {
            warn!(
                "Found {} '{}' files under {}; using the shallowest: {}",
                matches.len(),
                file_name,
                folder.display(),
                matches[0].1.display()
            );
        }
        return matches.into_iter().next().map(|(_, path)| path);
    }

    debug!("No project settings file '{}' found", file_name);
    None
}

/// Read and parse a project settings file.
///
/// A top-level `default` object is used as the settings; otherwise the whole
/// document is.
pub fn load_project_settings(path: &Path) -> Result<Settings, SpandocError> {
    let value = read_settings_document(path)?;
    Settings::from_value(settings::unwrap_default(value)).map_err(|e| {
        SpandocError::ConfigParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        }
    })
}

/// Bundled defaults, with the configured user settings merged over them.
fn load_default_settings(config: &SpandocConfig) -> Result<ResolvedSettings, SpandocError> {
    let (merged, user_path) = merged_default_document(config)?;

    let Some(user_path) = user_path else {
        log_source(config, "Using bundled default settings");
        return Ok(ResolvedSettings {
            settings: Settings::from_value(Value::Object(merged))
                .map_err(|e| SpandocError::Internal(format!("bundled settings: {e}")))?,
            source: SettingsSource::Defaults,
        });
    };

    let settings =
        Settings::from_value(Value::Object(merged)).map_err(|e| SpandocError::ConfigParse {
            path: user_path.clone(),
            detail: e.to_string(),
        })?;

    log_source(
        config,
        &format!("Using default settings merged with {}", user_path.display()),
    );
    Ok(ResolvedSettings {
        settings,
        source: SettingsSource::User(user_path),
    })
}

/// The defaults settings object as raw JSON, user overrides applied.
///
/// Returns the user settings path when one was found and merged.
pub(crate) fn merged_default_document(
    config: &SpandocConfig,
) -> Result<(Map<String, Value>, Option<PathBuf>), SpandocError> {
    let bundled = settings::bundled_document()?;
    let mut default = settings::take_object(bundled, "default").unwrap_or_default();

    let user_path = config.user_settings.as_deref().filter(|p| {
        let exists = p.is_file();
        if !exists {
            debug!("User settings {} not found, ignoring", p.display());
        }
        exists
    });
    let Some(user_path) = user_path else {
        return Ok((default, None));
    };

    let user_doc = read_settings_document(user_path)?;
    // A user file may replace the defaults wholesale as well as add overrides
    if let Some(replacement) = settings::take_object(user_doc.clone(), "default") {
        default = replacement;
    }
    let user = settings::take_object(user_doc, "user").unwrap_or_else(Map::new);

    Ok((
        settings::merge_user_over_default(default, user),
        Some(user_path.to_path_buf()),
    ))
}

fn read_settings_document(path: &Path) -> Result<Value, SpandocError> {
    let text = std::fs::read_to_string(path).map_err(|e| SpandocError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&jsonc::strip_comments(&text)).map_err(|e| SpandocError::ConfigParse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

fn log_source(config: &SpandocConfig, message: &str) {
    if config.debug {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }
}
