pub mod archive;
pub mod backup_config;
pub mod category;
pub mod compress;
pub mod entry;
pub mod file_ext;
pub mod fs_tree;
pub mod hash;
pub mod manifest;
pub mod report;
pub mod restore;
pub mod result_error;
pub mod retention;
pub mod run_context;
pub mod snapshot;
pub mod timestamp;
pub mod validate;
pub mod verify;

macro_rules! function_path {
    () => {
        concat!(module_path!(), "::", function_name!(), " ", file!(), ":", line!())
    };
}

pub(crate) use function_path;
