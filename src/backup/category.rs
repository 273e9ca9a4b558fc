//! The fixed set of user-data categories and where each one lives.

use bon::Builder;
use derive_more::Display;
use getset::Getters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

/// One kind of extension user data, backed up and restored independently.
#[derive(
    Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[display("tasks")]
    Tasks,
    #[display("task_history")]
    TaskHistory,
    #[display("mcp_settings")]
    McpSettings,
    #[display("mcp_servers")]
    McpServers,
    #[display("rules")]
    Rules,
    #[display("workflows")]
    Workflows,
    #[display("checkpoints")]
    Checkpoints,
}

/// Whether a category's live location is a directory tree or a single file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceShape {
    Dir,
    File,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Self::Tasks,
        Self::TaskHistory,
        Self::McpSettings,
        Self::McpServers,
        Self::Rules,
        Self::Workflows,
        Self::Checkpoints,
    ];

    /// Folder inside a snapshot holding this category
    pub fn staging_name(&self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::TaskHistory => "task_history",
            Self::McpSettings => "settings",
            Self::McpServers => "mcp_servers",
            Self::Rules => "rules",
            Self::Workflows => "workflows",
            Self::Checkpoints => "checkpoints",
        }
    }

    /// Snapshot folders searched on restore, current layout first.
    ///
    /// Directory backups made by the 1.x tool kept the task history index
    /// next to the MCP settings.
    pub fn restore_candidates(&self) -> Vec<&'static str> {
        match self {
            Self::TaskHistory => vec!["task_history", "settings"],
            other => vec![other.staging_name()],
        }
    }

    pub fn shape(&self) -> SourceShape {
        match self {
            Self::TaskHistory | Self::McpSettings => SourceShape::File,
            _ => SourceShape::Dir,
        }
    }
}

/// Live location of every category.
///
/// The same table drives both snapshot and restore so the two can never
/// disagree about where a category belongs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate, Builder, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct CategoryPaths {
    #[builder(into)]
    tasks: PathBuf,
    #[builder(into)]
    task_history: PathBuf,
    #[builder(into)]
    mcp_settings: PathBuf,
    #[builder(into)]
    mcp_servers: PathBuf,
    #[builder(into)]
    rules: PathBuf,
    #[builder(into)]
    workflows: PathBuf,
    #[builder(into)]
    checkpoints: PathBuf,
}

pub static DEFAULT_EXTENSION_ID: &str = "saoudrizwan.claude-dev";

#[cfg(target_os = "macos")]
pub fn editor_user_dir<P: AsRef<Path>>(home: P) -> PathBuf {
    home.as_ref()
        .join("Library")
        .join("Application Support")
        .join("Code")
        .join("User")
}

#[cfg(not(target_os = "macos"))]
pub fn editor_user_dir<P: AsRef<Path>>(home: P) -> PathBuf {
    home.as_ref().join(".config").join("Code").join("User")
}

impl CategoryPaths {
    /// Default locations for a user whose home directory is `home`
    pub fn for_home<P: AsRef<Path>>(home: P) -> Self {
        let home = home.as_ref();
        let global_storage = editor_user_dir(home)
            .join("globalStorage")
            .join(DEFAULT_EXTENSION_ID);
        let documents = home.join("Documents").join("Cline");

        Self::builder()
            .tasks(global_storage.join("tasks"))
            .task_history(global_storage.join("state").join("taskHistory.json"))
            .mcp_settings(
                global_storage
                    .join("settings")
                    .join("cline_mcp_settings.json"),
            )
            .mcp_servers(documents.join("MCP"))
            .rules(documents.join("Rules"))
            .workflows(documents.join("Workflows"))
            .checkpoints(global_storage.join("checkpoints"))
            .build()
    }

    pub fn get(&self, category: Category) -> &Path {
        match category {
            Category::Tasks => &self.tasks,
            Category::TaskHistory => &self.task_history,
            Category::McpSettings => &self.mcp_settings,
            Category::McpServers => &self.mcp_servers,
            Category::Rules => &self.rules,
            Category::Workflows => &self.workflows,
            Category::Checkpoints => &self.checkpoints,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &Path)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    #[test]
    fn test_staging_names_are_unique() {
        let names = Category::ALL.iter().map(Category::staging_name).collect_vec();
        assert_eq!(names.iter().unique().count(), names.len());
    }

    #[test]
    fn test_restore_candidates_start_with_staging_name() {
        for category in Category::ALL {
            assert_eq!(category.restore_candidates()[0], category.staging_name());
        }
        assert_eq!(Category::TaskHistory.restore_candidates(), ["task_history", "settings"]);
    }

    #[test]
    fn test_for_home_layout() {
        let paths = CategoryPaths::for_home("/home/u");
        assert!(paths.rules().ends_with("Documents/Cline/Rules"));
        assert!(paths
            .tasks()
            .ends_with("globalStorage/saoudrizwan.claude-dev/tasks"));
        assert!(paths.mcp_settings().ends_with("settings/cline_mcp_settings.json"));
        assert_eq!(paths.iter().count(), Category::ALL.len());
    }

    #[test]
    fn test_file_shaped_categories() {
        let files = Category::ALL
            .into_iter()
            .filter(|c| c.shape() == SourceShape::File)
            .collect_vec();
        assert_eq!(files, vec![Category::TaskHistory, Category::McpSettings]);
    }

    #[test]
    fn test_category_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Category::McpServers).unwrap(), "\"mcp_servers\"");
        assert_eq!(Category::TaskHistory.to_string(), "task_history");
    }
}
