// ── Machine properties ──
//
// Accumulated from extended status responses. Each field only changes when
// a response actually carries it.

use serde::Serialize;

use super::snapshot::ExtendedStatus;

/// Z-probe parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbeParams {
    pub threshold: f64,
    pub height: f64,
    pub probe_type: u32,
    /// Reading at which the probe is considered close to triggering.
    pub slow_down_threshold: f64,
}

impl ProbeParams {
    pub fn new(threshold: f64, height: f64, probe_type: u32) -> Self {
        Self {
            threshold,
            height,
            probe_type,
            slow_down_threshold: threshold * 0.9,
        }
    }
}

/// One entry of the tool mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tool {
    pub number: i32,
    pub name: Option<String>,
    pub heaters: Vec<usize>,
    pub drives: Vec<usize>,
}

/// Input voltage statistics, in volts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Voltage {
    pub min: f64,
    pub current: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MachineInfo {
    pub firmware_name: Option<String>,
    pub name: Option<String>,
    pub geometry: Option<String>,
    pub cold_extrude_temp: Option<f64>,
    pub cold_retract_temp: Option<f64>,
    pub temp_limit: Option<f64>,
    /// Endstop hit bitmap, one bit per drive.
    pub endstops: Option<u32>,
    pub volumes: Option<u32>,
    /// Bitmap of mounted storage volumes.
    pub mounted_volumes: Option<u32>,
    pub probe: Option<ProbeParams>,
    pub tools: Vec<Tool>,
    pub vin: Option<Voltage>,
}

/// What a merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub changed: bool,
    pub tools_changed: bool,
}

impl MachineInfo {
    /// Fold the fields present in `ext` into `self`.
    pub fn merge(&mut self, ext: &ExtendedStatus) -> MergeOutcome {
        let before = self.clone();

        merge_field(&mut self.firmware_name, ext.firmware_name.as_ref());
        merge_field(&mut self.name, ext.name.as_ref());
        merge_field(&mut self.geometry, ext.geometry.as_ref());
        merge_field(&mut self.cold_extrude_temp, ext.cold_extrude_temp.as_ref());
        merge_field(&mut self.cold_retract_temp, ext.cold_retract_temp.as_ref());
        merge_field(&mut self.temp_limit, ext.temp_limit.as_ref());
        merge_field(&mut self.endstops, ext.endstops.as_ref());
        merge_field(&mut self.volumes, ext.volumes.as_ref());
        merge_field(&mut self.mounted_volumes, ext.mounted_volumes.as_ref());
        merge_field(&mut self.probe, ext.probe.as_ref());
        merge_field(&mut self.vin, ext.vin.as_ref());

        if let Some(tools) = &ext.tools {
            self.tools.clone_from(tools);
        }

        MergeOutcome {
            changed: *self != before,
            tools_changed: self.tools != before.tools,
        }
    }

    /// Tool entry for a tool number.
    pub fn tool(&self, number: i32) -> Option<&Tool> {
        self.tools.iter().find(|tool| tool.number == number)
    }

    pub fn is_volume_mounted(&self, volume: u32) -> bool {
        self.mounted_volumes
            .is_some_and(|bitmap| volume < 32 && bitmap & (1 << volume) != 0)
    }
}

fn merge_field<T: Clone>(slot: &mut Option<T>, value: Option<&T>) {
    if let Some(value) = value {
        *slot = Some(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_are_kept() {
        let mut info = MachineInfo {
            name: Some("Printy".into()),
            ..MachineInfo::default()
        };

        let outcome = info.merge(&ExtendedStatus {
            geometry: Some("delta".into()),
            ..ExtendedStatus::default()
        });

        assert!(outcome.changed);
        assert!(!outcome.tools_changed);
        assert_eq!(info.name.as_deref(), Some("Printy"));
        assert_eq!(info.geometry.as_deref(), Some("delta"));
    }

    #[test]
    fn unchanged_merge_reports_nothing() {
        let ext = ExtendedStatus {
            name: Some("Printy".into()),
            tools: Some(vec![Tool {
                number: 0,
                name: None,
                heaters: vec![1],
                drives: vec![0],
            }]),
            ..ExtendedStatus::default()
        };
        let mut info = MachineInfo::default();
        assert!(info.merge(&ext).tools_changed);
        assert_eq!(info.merge(&ext), MergeOutcome::default());
    }

    #[test]
    fn probe_slow_down_is_ninety_percent() {
        let probe = ProbeParams::new(500.0, 0.7, 1);
        assert!((probe.slow_down_threshold - 450.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mounted_volume_bitmap() {
        let info = MachineInfo {
            mounted_volumes: Some(0b01),
            ..MachineInfo::default()
        };
        assert!(info.is_volume_mounted(0));
        assert!(!info.is_volume_mounted(1));
    }
}
