use crate::backup::category::{editor_user_dir, CategoryPaths, DEFAULT_EXTENSION_ID};
use crate::backup::compress::CompressorConfig;
use crate::backup::hash::HashAlgorithm;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::validate::{validate_not_blank, validate_writable_dir};
use bon::Builder;
use getset::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use validator::Validate;

/// One year of daily backups
pub static DEFAULT_MAX_BACKUPS: usize = 367;
pub static DEFAULT_BACKUP_DIR_NAME: &str = "ClineBackups";
pub static DEFAULT_EDITOR_COMMAND: &str = "code";

/// Keys whose objects are merged key by key instead of being replaced
static MERGED_SECTIONS: [&str; 1] = ["categories"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate, Builder, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct RepairConfig {
    #[validate(custom(function = validate_writable_dir))]
    #[builder(into)]
    backup_root: PathBuf,
    #[validate(range(min = 1))]
    #[builder(default = DEFAULT_MAX_BACKUPS)]
    max_backups: usize,
    #[validate(nested)]
    #[serde(default)]
    #[builder(default)]
    compression: CompressorConfig,
    #[serde(default)]
    #[builder(default)]
    hash_algorithm: HashAlgorithm,
    categories: CategoryPaths,
    #[validate(custom(function = validate_not_blank))]
    #[builder(into, default = DEFAULT_EDITOR_COMMAND.to_string())]
    editor_command: String,
    #[validate(custom(function = validate_not_blank))]
    #[builder(into, default = DEFAULT_EXTENSION_ID.to_string())]
    extension_id: String,
    #[builder(into)]
    extensions_dir: PathBuf,
    /// Editor `settings.json` receiving the sidebar setting
    #[builder(into)]
    settings_file: PathBuf,
}

impl RepairConfig {
    /// Built-in defaults for a user whose home directory is `home`
    pub fn for_home<P: AsRef<Path>>(home: P) -> Self {
        let home = home.as_ref();
        Self::builder()
            .backup_root(home.join(DEFAULT_BACKUP_DIR_NAME))
            .categories(CategoryPaths::for_home(home))
            .extensions_dir(home.join(".vscode").join("extensions"))
            .settings_file(editor_user_dir(home).join("settings.json"))
            .build()
    }

    /// Layers, lowest precedence first: defaults for `home`, the optional YAML
    /// file, then each overlay in order. The result is validated.
    pub fn load<P: AsRef<Path>, I: IntoIterator<Item = Value>>(
        home: P,
        yaml_file: Option<&Path>,
        overlays: I,
    ) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::for_home(home))?;

        if let Some(path) = yaml_file {
            let yaml = File::open(path)
                .map_err(Error::from)
                .and_then(|f| serde_yml::from_reader::<_, Value>(f).map_err(Error::from))
                .with_msg(format!("Parse YAML config failed: {:?}", path))?;
            merge_layer(&mut merged, yaml).with_msg(format!("Invalid config file: {:?}", path))?;
        }

        for overlay in overlays {
            merge_layer(&mut merged, overlay)?;
        }

        let config: Self = serde_json::from_value(merged)
            .map_err(Error::from)
            .with_msg("Config is malformed")?;
        config
            .validate()
            .map_err(Error::from)
            .with_msg(format!("Config validation failed: {:?}", config.backup_root))?;
        Ok(config)
    }
}

/// Parses a `--json-input` blob into a config overlay
pub fn parse_json_input(blob: &str) -> Result<Value> {
    serde_json::from_str(blob)
        .map_err(Error::from)
        .with_msg("Parse JSON input failed")
}

fn merge_layer(base: &mut Value, layer: Value) -> Result<()> {
    let Value::Object(layer) = layer else {
        return Err(Error::InvalidConfig("config layer must be an object".into()));
    };
    let Some(base) = base.as_object_mut() else {
        return Err(Error::InvalidConfig("base config is not an object".into()));
    };

    for (key, value) in layer {
        if MERGED_SECTIONS.contains(&key.as_str()) {
            if let (Some(Value::Object(existing)), Value::Object(incoming)) =
                (base.get_mut(&key), &value)
            {
                existing.extend(incoming.clone());
                continue;
            }
        }
        base.insert(key, value);
    }
    Ok(())
}
