use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub static SIDEBAR_LOCATION_KEY: &str = "workbench.sideBar.location";
pub static SIDEBAR_LOCATION: &str = "left";

/// Sets one key in the editor's `settings.json`, keeping every other key.
/// The file and its parent are created when missing.
pub fn merge_setting<P: AsRef<Path>>(settings_file: P, key: &str, value: Value) -> Result<()> {
    let settings_file = settings_file.as_ref();
    let mut settings = read_settings(settings_file)
        .with_msg(format!("Reading editor settings {:?} failed", settings_file))?;
    settings.insert(key.to_string(), value);

    if let Some(parent) = settings_file.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(settings_file)?);
    serde_json::to_writer_pretty(&mut writer, &settings)?;
    writer.flush()?;
    Ok(())
}

fn read_settings(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(&content)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::InvalidConfig(format!("{:?} is not a JSON object", path))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_creates_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("User/settings.json");

        merge_setting(&file, SIDEBAR_LOCATION_KEY, json!(SIDEBAR_LOCATION)).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(written, json!({"workbench.sideBar.location": "left"}));
    }

    #[test]
    fn test_keeps_other_keys() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("settings.json");
        fs::write(&file, r#"{"editor.fontSize": 14, "workbench.sideBar.location": "right"}"#).unwrap();

        merge_setting(&file, SIDEBAR_LOCATION_KEY, json!(SIDEBAR_LOCATION)).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(written["editor.fontSize"], 14);
        assert_eq!(written[SIDEBAR_LOCATION_KEY], "left");
    }

    #[test]
    fn test_refuses_to_overwrite_unparsable_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("settings.json");
        fs::write(&file, "[1, 2]").unwrap();

        assert!(merge_setting(&file, SIDEBAR_LOCATION_KEY, json!(SIDEBAR_LOCATION)).is_err());
        assert_eq!(fs::read_to_string(&file).unwrap(), "[1, 2]");
    }
}
