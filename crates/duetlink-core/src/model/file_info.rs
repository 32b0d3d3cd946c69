// ── Print file metadata ──

use serde::Serialize;

/// Metadata of the file being printed, from `rr_fileinfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileInfo {
    pub file_name: Option<String>,
    pub size: Option<u64>,
    /// Object height in mm.
    pub height: f64,
    pub layer_height: f64,
    pub first_layer_height: f64,
    /// Filament needed per extruder, in mm.
    pub filament: Vec<f64>,
    pub generated_by: Option<String>,
    /// Seconds the print has been running when the info was fetched.
    pub print_duration: Option<f64>,
}

impl FileInfo {
    pub fn total_filament(&self) -> f64 {
        self.filament.iter().sum()
    }

    /// Expected number of layers, when both the object height and the
    /// layer height are known. A first layer of different thickness
    /// (reported by the firmware while printing) is accounted for.
    pub fn layer_count(&self, first_layer_height: f64) -> Option<u32> {
        if self.height <= 0.0 || self.layer_height <= 0.0 {
            return None;
        }
        let layers = if first_layer_height > 0.0 {
            (self.height - first_layer_height) / self.layer_height + 1.0
        } else {
            self.height / self.layer_height
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
        Some(layers.round().max(0.0) as u32)
    }
}
