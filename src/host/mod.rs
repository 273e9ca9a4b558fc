//! The editor that hosts the extension, driven as an opaque external tool.

pub mod code_cli;
pub mod settings;

use crate::backup::result_error::result::Result;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostInfo {
    /// First line of the editor's `--version` output
    pub version: String,
}

pub trait ExtensionHost {
    /// Fails with `HostNotFound` when the editor command is unavailable
    fn detect(&self) -> Result<HostInfo>;

    fn running_processes(&self) -> Result<usize>;

    fn uninstall(&self) -> Result<()>;

    fn install(&self) -> Result<()>;
}
