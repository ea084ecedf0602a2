//! Read/write model JSON files.
//!
//! A model file is the portable result of a fit: the normalized transfer
//! function, the physical parameters it implies and, when it came from a fit,
//! the regression quality. The schema is defined by `domain::ModelFile`.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::Utc;

use crate::domain::{FitQuality, ModelFile};
use crate::error::AppError;
use crate::models::FirstOrder;

pub const TOOL_NAME: &str = "hc";

impl ModelFile {
    pub fn from_model(model: &FirstOrder, fit_quality: Option<FitQuality>) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            generated: Utc::now(),
            num: model.num(),
            den: model.den(),
            heat_capacity: model.heat_capacity(),
            thermal_conductivity: model.thermal_conductivity(),
            fit_quality,
        }
    }

    /// Rebuild the model from the stored transfer-function coefficients.
    pub fn to_model(&self) -> Result<FirstOrder, AppError> {
        FirstOrder::new(&self.num, &self.den)
            .map_err(|e| AppError::precondition(format!("Model file holds an invalid model: {e}")))
    }
}

/// Write a model JSON file.
pub fn write_model_json(path: &Path, model: &FirstOrder, fit_quality: Option<FitQuality>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create model JSON '{}': {e}", path.display())))?;
    let contents = ModelFile::from_model(model, fit_quality);
    serde_json::to_writer_pretty(BufWriter::new(file), &contents)
        .map_err(|e| AppError::io(format!("Failed to write model JSON: {e}")))?;
    Ok(())
}

/// Read a model JSON file.
pub fn read_model_json(path: &Path) -> Result<ModelFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open model JSON '{}': {e}", path.display())))?;
    let contents: ModelFile =
        serde_json::from_reader(file).map_err(|e| AppError::io(format!("Invalid model JSON: {e}")))?;
    Ok(contents)
}

/// Read a model JSON file and rebuild the model it describes.
pub fn load_model(path: &Path) -> Result<FirstOrder, AppError> {
    read_model_json(path)?.to_model()
}
