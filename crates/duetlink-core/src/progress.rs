// ── Print progress tracking ──
//
// Turns print-level status fields plus the file metadata into a completion
// percentage and a per-layer duration history.

use serde::Serialize;
use strum::Display;

use crate::model::{FileInfo, PrintStatus};

/// Where a progress figure came from, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum ProgressSource {
    /// Filament fed vs. filament the file needs.
    Filament,
    /// Current Z vs. object height.
    Height,
    /// The firmware's file-position estimate.
    Firmware,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintProgress {
    /// 0..=100, one decimal.
    pub percent: f64,
    pub source: ProgressSource,
    pub file_name: Option<String>,
    pub current_layer: u32,
    pub layer_count: Option<u32>,
    /// `(used, total)` filament in mm, when progress is filament based.
    pub filament: Option<(f64, f64)>,
}

/// Duration of one completed layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerEntry {
    pub layer: u32,
    /// Seconds.
    pub duration: f64,
    /// `false` for averages back-filled after connecting mid-print.
    pub observed: bool,
}

/// What one update produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    /// New progress figure, if it changed.
    pub progress: Option<PrintProgress>,
    /// The print reached 100% in this update.
    pub finished: bool,
    pub layers_changed: bool,
}

#[derive(Debug, Default)]
pub struct PrintTracker {
    finished: bool,
    last: Option<PrintProgress>,
    layers: Vec<LayerEntry>,
    last_layer_print_duration: f64,
}

impl PrintTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything. Called when a new print starts.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn layers(&self) -> &[LayerEntry] {
        &self.layers
    }

    pub fn progress(&self) -> Option<&PrintProgress> {
        self.last.as_ref()
    }

    pub fn update(&mut self, file: &FileInfo, print: &PrintStatus, z: f64) -> ProgressUpdate {
        let mut update = ProgressUpdate::default();

        if !self.finished {
            let progress = self.compute(file, print, z);
            update.finished = self.finished;
            if self.last.as_ref() != Some(&progress) {
                self.last = Some(progress.clone());
                update.progress = Some(progress);
            }
        }

        update.layers_changed = self.record_layers(print, update.finished);
        update
    }

    fn compute(&mut self, file: &FileInfo, print: &PrintStatus, z: f64) -> PrintProgress {
        let total_filament = round1(file.total_filament());
        let mut filament = None;

        let (raw, source) = if total_filament > 0.0 {
            let used = round1(print.extruded_raw.iter().sum());
            filament = Some((used, total_filament));
            (used / total_filament * 100.0, ProgressSource::Filament)
        } else if file.height > 0.0 {
            (z / file.height * 100.0, ProgressSource::Height)
        } else {
            (print.fraction_printed, ProgressSource::Firmware)
        };

        let percent = clamp_percent(raw);
        if percent >= 100.0 {
            self.finished = true;
            if let Some((used, total)) = filament.as_mut() {
                *used = *total;
            }
        }

        PrintProgress {
            percent,
            source,
            file_name: file.file_name.clone(),
            current_layer: print.current_layer,
            layer_count: file.layer_count(print.first_layer_height),
            filament,
        }
    }

    /// Append completed layers. Returns whether the history changed.
    fn record_layers(&mut self, print: &PrintStatus, just_finished: bool) -> bool {
        let layer = print.current_layer;
        if layer <= 1 {
            return false;
        }

        let mut real_print_time =
            print.print_duration - print.warm_up_duration - print.first_layer_duration;

        if self.layers.is_empty() {
            if layer > 2 {
                // Connected mid-print: only the first layer's duration is
                // known, spread the rest evenly over the missing layers.
                self.push(print.first_layer_duration, false);
                real_print_time -= print.current_layer_time;
                let average = real_print_time / f64::from(layer - 1);
                for _ in 2..layer {
                    self.push(average, false);
                }
                self.last_layer_print_duration = real_print_time;
            } else {
                self.push(print.first_layer_duration, true);
                self.last_layer_print_duration = 0.0;
            }
            return true;
        }

        let completed = u32::try_from(self.layers.len()).unwrap_or(u32::MAX);
        if just_finished || layer - 1 > completed {
            self.push(real_print_time - self.last_layer_print_duration, true);
            self.last_layer_print_duration = real_print_time;
            return true;
        }
        false
    }

    fn push(&mut self, duration: f64, observed: bool) {
        let layer = u32::try_from(self.layers.len()).unwrap_or(u32::MAX).saturating_add(1);
        self.layers.push(LayerEntry {
            layer,
            duration,
            observed,
        });
    }
}

/// Clamp to `[0, 100]` and round to one decimal.
fn clamp_percent(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    round1(raw).clamp(0.0, 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
