use std::path::*;
use crate::image_formats::*;

/*****************************************************************************/

/* Data identifiers */

/// Single-key identifier of one exposure inside a repository.
#[derive(Clone, Debug, PartialEq)]
pub struct DataId {
    pub calexp: String,
}

impl DataId {
    pub fn new(name: &str) -> DataId {
        DataId {
            calexp: strip_fits_extension(name).to_string(),
        }
    }
}

impl std::fmt::Display for DataId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "calexp={}", self.calexp)
    }
}

/// An identifier resolved against a repository.
#[derive(Clone, Debug)]
pub struct DataRef {
    pub data_id: DataId,
    pub path: PathBuf,
}

impl DataRef {
    /// Numeric exposure id. Flat files carry no observation metadata,
    /// so every exposure answers 0.
    pub fn exposure_id(&self) -> i64 {
        0
    }

    /// Number of bits reserved for the exposure id in compound ids.
    pub fn exposure_id_bits(&self) -> u32 {
        32
    }
}

/*****************************************************************************/

/* Repository over plain directories */

pub struct FileRepo {
    pub input: PathBuf,
    pub calib: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl FileRepo {
    pub fn new(input: PathBuf, calib: Option<PathBuf>, output: Option<PathBuf>) -> FileRepo {
        FileRepo { input, calib, output }
    }

    /// Maps an identifier to a file below the input root. An existing
    /// file wins the extension search, otherwise `.fits` is assumed.
    pub fn map_calexp(&self, data_id: &DataId) -> PathBuf {
        for ext in ["fits", "fit", "fts"] {
            let candidate = self.input.join(format!("{}.{}", data_id.calexp, ext));
            if candidate.is_file() {
                return candidate;
            }
        }
        self.input.join(format!("{}.fits", data_id.calexp))
    }

    pub fn make_refs(&self, ids: &[DataId]) -> Vec<DataRef> {
        ids.iter()
            .map(|id| DataRef {
                data_id: id.clone(),
                path: self.map_calexp(id),
            })
            .collect()
    }
}

/// Prefers the copy under the `_parent` sibling directory when one exists.
pub fn prefer_parent_copy(path: &Path) -> PathBuf {
    if let (Some(dir), Some(name)) = (path.parent(), path.file_name()) {
        let parent_copy = dir.join("_parent").join(name);
        if parent_copy.is_file() {
            log::info!("using parent copy `{}`", parent_copy.display());
            return parent_copy;
        }
    }
    path.to_path_buf()
}

/*****************************************************************************/

/* Filter names */

const FILTER_ALIASES: &[(&str, &str)] = &[
    ("W-S-G+", "g"),
    ("W-S-R+", "r"),
    ("W-S-I+", "i"),
    ("W-S-Z+", "z"),
    ("W-S-ZR", "y"),
];

/// Canonical short name for a filter. Unknown names pass unchanged.
pub fn canonical_filter(name: &str) -> &str {
    FILTER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(name)
}
