//! Typed settings model and the default/user merge.
//!
//! Settings files are JSON with comments. The raw document may wrap the
//! settings in a `default` object (and, for user files, carry a `user`
//! object with overrides). Merging happens on the JSON tree so that a user
//! transformation can override a single key of a bundled one. Only the merged
//! tree is deserialised into [`Settings`].
//!
//! Key names accept the spellings used by older plugin generations
//! (`pandoc_path`, `output_extension`, ...), so one parser covers them all.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::error::SpandocError;

/// Bundled default settings document (JSON with comments).
pub const DEFAULT_SETTINGS_JSON: &str = include_str!("../defaults/spandoc.default.json");

/// Keep the order entries appear in the file: ranking ties keep
/// configuration order, and the first best-scoring scope selector picks the
/// input format.
pub type OrderedMap<V> = IndexMap<String, V>;

/// `"scope": null` reads as an empty mapping.
fn null_as_empty<'de, D, V>(deserializer: D) -> Result<OrderedMap<V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    Ok(Option::<OrderedMap<V>>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Settings model ───────────────────────────────────────────────────────

/// A named conversion recipe.
///
/// Immutable once parsed; optional attributes are defaulted here rather
/// than probed for at use sites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    /// Scope selector → pandoc input format used when that selector wins.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scope: OrderedMap<String>,

    /// Arguments passed to pandoc after `-f <format>`.
    #[serde(rename = "pandoc-arguments", alias = "pandoc_arguments", default)]
    pub pandoc_arguments: Vec<String>,

    /// Output file extension. Defaults to the output format name.
    #[serde(
        rename = "out-ext",
        alias = "output_extension",
        alias = "out_ext",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub out_ext: Option<String>,

    /// Write file output next to the source document instead of a temp file.
    #[serde(
        rename = "out-local",
        alias = "out_local",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub out_local: Option<bool>,

    /// Put an inline result into a new document instead of the current one.
    #[serde(
        rename = "new-buffer",
        alias = "new_buffer",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub new_buffer: Option<bool>,

    /// Syntax applied to the document receiving an inline result.
    #[serde(
        rename = "syntax_file",
        alias = "syntax-file",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub syntax_file: Option<String>,
}

impl Transformation {
    pub fn out_local(&self) -> bool {
        self.out_local.unwrap_or(false)
    }

    pub fn new_buffer(&self) -> bool {
        self.new_buffer.unwrap_or(false)
    }
}

/// Effective settings for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Explicit converter path. `None` (or an empty string) searches `PATH`.
    #[serde(rename = "pandoc-path", alias = "pandoc_path", default)]
    pub pandoc_path: Option<PathBuf>,

    /// Output formats that are written to a file rather than returned inline.
    #[serde(
        rename = "pandoc-format-file",
        alias = "pandoc_format_file",
        default
    )]
    pub format_file: Vec<String>,

    #[serde(default)]
    pub transformations: OrderedMap<Transformation>,
}

impl Settings {
    /// Deserialise a settings object (already unwrapped from `default`).
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// The bundled defaults, merged with nothing.
    pub fn bundled() -> Result<Self, SpandocError> {
        let root = bundled_document()?;
        let default = take_object(root, "default").unwrap_or_default();
        Self::from_value(Value::Object(default))
            .map_err(|e| SpandocError::Internal(format!("bundled settings: {e}")))
    }

    /// Whether `format` is written to a file instead of being returned inline.
    pub fn writes_to_file(&self, format: &str) -> bool {
        self.format_file.iter().any(|f| f == format)
    }

    /// Look up a transformation by name.
    ///
    /// An empty `transformations` table is a configuration error in its own
    /// right, reported before the unknown-name case.
    pub fn transformation(&self, name: &str) -> Result<&Transformation, SpandocError> {
        if self.transformations.is_empty() {
            return Err(SpandocError::NoTransformationsConfigured);
        }
        self.transformations
            .get(name)
            .ok_or_else(|| SpandocError::UnknownTransformation {
                name: name.to_string(),
            })
    }
}

// ── Raw-document helpers ─────────────────────────────────────────────────

/// Parse the bundled defaults document.
pub(crate) fn bundled_document() -> Result<Value, SpandocError> {
    let stripped = crate::pipeline::jsonc::strip_comments(DEFAULT_SETTINGS_JSON);
    serde_json::from_str(&stripped)
        .map_err(|e| SpandocError::Internal(format!("bundled settings: {e}")))
}

/// Remove `key` from an object document, if both exist.
pub(crate) fn take_object(value: Value, key: &str) -> Option<Map<String, Value>> {
    match value {
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Object(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

/// For a project file: the `default` sub-object if present, otherwise the
/// whole document.
pub(crate) fn unwrap_default(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("default") {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Merge user overrides over default settings.
///
/// Transformations merge key by key: a user transformation's keys override
/// or extend the matching default transformation, and user-only
/// transformations are appended. Every other top-level user key replaces the
/// default one wholesale.
pub fn merge_user_over_default(
    mut default: Map<String, Value>,
    mut user: Map<String, Value>,
) -> Map<String, Value> {
    if user.is_empty() {
        return default;
    }

    let mut transformations = match default.remove("transformations") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    if let Some(Value::Object(user_transformations)) = user.remove("transformations") {
        for (name, data) in user_transformations {
            match data {
                Value::Object(overrides)
                    if transformations.get(&name).is_some_and(Value::is_object) =>
                {
                    if let Some(Value::Object(existing)) = transformations.get_mut(&name) {
                        for (k, v) in overrides {
                            existing.insert(k, v);
                        }
                    }
                }
                data => {
                    transformations.insert(name, data);
                }
            }
        }
    }
    default.insert("transformations".to_string(), Value::Object(transformations));

    for (k, v) in user {
        default.insert(k, v);
    }
    default
}
