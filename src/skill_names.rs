use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use hashbrown::HashMap;
use log::{info, warn};
use serde_json::{Map, Value};

use crate::abstractions::FileSystem;
use crate::constants::{SKILL_NAMES_ENV, SKILL_NAMES_FILE};

pub type SharedSkillNames = Arc<SkillNames>;

/// Field priority for object entries; the first non-empty string wins.
const NAME_FIELDS: &[&str] = &["name", "EnglishShortManualOverride", "EnglishShort", "AIEnglishShort", "ChineseShort"];

/// Display names for skill ids, loaded once from a JSON table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SkillNames {
    names: HashMap<i32, String>,
}

impl SkillNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `{"<id>": "<name>"}` or `{"<id>": {"name": "<name>", ...}}`. Entries with a
    /// non-numeric id or no usable name are skipped.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(root) = value else {
            bail!("skill name table must be a JSON object");
        };

        let names = root
            .iter()
            .filter_map(|(id, entry)| {
                let skill_id = id.parse::<i32>().ok()?;
                let name = match entry {
                    Value::String(name) => non_empty(name),
                    Value::Object(fields) => first_name(fields),
                    _ => None,
                }?;

                Some((skill_id, name))
            })
            .collect();

        Ok(Self { names })
    }

    pub fn load<FS: FileSystem>(file_system: &mut FS, path: &Path) -> Result<Self> {
        let reader = file_system.get_reader(path)?;
        let value: Value = serde_json::from_reader(reader)
            .with_context(|| format!("could not parse skill names at {}", path.display()))?;

        Self::from_json(&value)
    }

    /// Missing or broken tables fall back to an empty one so skills still render.
    pub fn load_or_empty<FS: FileSystem>(file_system: &mut FS, path: &Path) -> Self {
        if !file_system.exists(path) {
            info!("no skill name table at {}", path.display());
            return Self::new();
        }

        match Self::load(file_system, path) {
            Ok(names) => {
                info!("loaded {} skill names from {}", names.len(), path.display());
                names
            }
            Err(err) => {
                warn!("{err:#}");
                Self::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn resolve(&self, skill_id: i32) -> String {
        self.names
            .get(&skill_id)
            .cloned()
            .unwrap_or_else(|| format!("Skill #{skill_id}"))
    }
}

/// The env override wins; relative overrides resolve against `directory`.
pub fn skill_names_path(directory: &Path) -> PathBuf {
    match env::var_os(SKILL_NAMES_ENV) {
        Some(configured) => directory.join(configured),
        None => directory.join(SKILL_NAMES_FILE),
    }
}

fn first_name(fields: &Map<String, Value>) -> Option<String> {
    NAME_FIELDS
        .iter()
        .find_map(|field| fields.get(*field).and_then(Value::as_str).and_then(non_empty))
}

fn non_empty(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}
