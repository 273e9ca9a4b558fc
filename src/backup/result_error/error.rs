use crate::backup::category::Category;
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};
use itertools::Itertools;
use std::fmt::Debug;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),
    #[error(transparent)]
    StripPrefix(#[from] std::path::StripPrefixError),
    #[error(transparent)]
    LiblzmaStream(#[from] liblzma::stream::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    SerdeYml(#[from] serde_yml::Error),
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Home directory could not be determined")]
    NoHomeDir,
    #[error("No backup matches {0:?}")]
    BackupNotFound(String),
    #[error("Extracting {:?} failed:\n{}", path, indent::indent_all_with("  ", error.to_string()))]
    Extraction { path: PathBuf, error: Box<Error> },
    #[error("Editor not found: {0}")]
    HostNotFound(String),
    #[error("{0} editor process(es) still running")]
    HostRunning(usize),
    #[error("Command `{command}` failed: {detail}")]
    ExternalCommand { command: String, detail: String },
    #[error("{}:\n{}", msg, indent::indent_all_with("  ", error.to_string()))]
    WithMsg { msg: String, error: Box<Error> },
    #[error("{:?} {} failed:\n{}", obj_debug, fn_name, indent::indent_all_with("  ", error.to_string()))]
    WithDebugObjAndFnName {
        error: Box<Error>,
        obj_debug: Box<dyn Debug + Send + Sync>,
        fn_name: String,
    },
    #[error("{}", itertools::join(.0, "\n\n"))]
    LotsOfError(Vec<Error>),
}

/// Failure of a single category during snapshot or restore.
///
/// Sibling categories keep going; the caller collects these into the run's
/// error list.
#[derive(Error, Debug)]
#[error("Category {category} failed:\n{}", indent::indent_all_with("  ", error.to_string()))]
pub struct CategoryError {
    pub category: Category,
    pub error: Box<Error>,
}

impl CategoryError {
    pub fn new<E: Into<Error>>(category: Category, error: E) -> Self {
        Self {
            category,
            error: Box::new(error.into()),
        }
    }
}

impl<S: Into<String>, O: Debug + Send + Sync + 'static> WithDebugObjectAndFnName<S, O> for Error {
    fn with_debug_object_and_fn_name(self, obj: O, fn_name: S) -> Self {
        Error::WithDebugObjAndFnName {
            error: Box::new(self),
            obj_debug: Box::new(obj),
            fn_name: fn_name.into(),
        }
    }
}

impl<S: Into<String>> WithMsg<S> for Error {
    fn with_msg(self, msg: S) -> Self {
        Self::WithMsg {
            msg: msg.into(),
            error: Box::new(self),
        }
    }
}

impl From<Vec<Error>> for Error {
    fn from(errors: Vec<Error>) -> Self {
        if errors.is_empty() {
            panic!("Should not create lots of errors when error is empty")
        }
        Self::LotsOfError(errors.into_iter().flat_map(|e| e.into_iter()).collect_vec())
    }
}

impl Error {
    pub fn into_iter(self) -> Box<dyn Iterator<Item = Error>> {
        match self {
            Error::LotsOfError(v) => Box::new(v.into_iter().flat_map(|e| e.into_iter())),
            e => Box::new(std::iter::once(e)),
        }
    }

    pub fn chain(self, other: Error) -> Error {
        Error::LotsOfError(self.into_iter().chain(other.into_iter()).collect_vec())
    }
}
