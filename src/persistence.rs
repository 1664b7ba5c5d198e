// File: src/persistence.rs
use crate::core::config::ModelConfig;
use crate::core::model::TransitionModel;
use crate::core::types::RatingRecord;
use crate::error::{RecError, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

pub const FORMAT_VERSION: u32 = 1;

/// The on-disk snapshot: the fitted matrix, its item index and alpha.
#[derive(serde::Serialize, serde::Deserialize)]
struct SerializableState<M> {
    format_version: u32,
    model: M,
}

/// Writes the model atomically: a temp file in the target directory is
/// renamed over `path` once fully written.
pub fn save_to_disk(model: &TransitionModel, path: &Path) -> Result<()> {
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let state = SerializableState { format_version: FORMAT_VERSION, model };

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(temp_file.as_file());
        bincode::serialize_into(&mut writer, &state)?;
        writer.flush()?;
    }

    temp_file.persist(path).map_err(|e| RecError::Io(e.error))?;
    info!(path = %path.display(), items = model.item_count(), "model saved");
    Ok(())
}

pub fn load_from_disk(path: &Path) -> Result<TransitionModel> {
    let reader = BufReader::new(File::open(path)?);
    let state: SerializableState<TransitionModel> = bincode::deserialize_from(reader)?;
    if state.format_version > FORMAT_VERSION {
        return Err(RecError::UnsupportedVersion {
            found: state.format_version,
            supported: FORMAT_VERSION,
        });
    }
    state.model.check_consistency()?;
    info!(path = %path.display(), items = state.model.item_count(), "model loaded");
    Ok(state.model)
}

/// Loads the model at `path`, or fits one from `ratings` and saves it there.
pub fn from_file_or_fit(path: &Path, ratings: &[RatingRecord], config: &ModelConfig) -> Result<TransitionModel> {
    if path.exists() {
        return load_from_disk(path);
    }
    let model = TransitionModel::fit(ratings, config)?;
    save_to_disk(&model, path)?;
    Ok(model)
}
