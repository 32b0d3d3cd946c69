// ── API-to-domain type conversions ──
//
// Bridges raw `duetlink_api` payloads into the normalized model. The
// heater layout is decided here, once per response, so nothing downstream
// has to probe for keys.

use duetlink_api::models::{
    FileInfoResponse, RawHeaterBlock, RawMessageBox, RawOutput, RawTemps, StatusResponse,
};

use crate::model::{
    Beep, Coordinates, ExtendedStatus, ExtraSensor, FileInfo, HeadReading, HeaterReadings,
    HeaterState, HeaterZone, MachineStatus, MessageBox, Output, Params, PrintStatus,
    ProbeParams, ScannerStatus, Sensors, StatusSnapshot, Temperatures, TimesLeft, Tool,
    ToolTargets, Voltage,
};

// ── Status ─────────────────────────────────────────────────────────

impl From<StatusResponse> for StatusSnapshot {
    fn from(raw: StatusResponse) -> Self {
        let extended = extended_block(&raw);
        let print = print_block(&raw);

        Self {
            status: MachineStatus::from_code(&raw.status),
            coords: Coordinates {
                xyz: raw.coords.xyz,
                axes_homed: raw.coords.axes_homed.into_iter().map(|h| h != 0).collect(),
                extruders: raw.coords.extr,
            },
            current_tool: (raw.current_tool >= 0).then_some(raw.current_tool),
            params: Params {
                atx_power: raw.params.atx_power != 0,
                fan_percent: raw.params.fan_percent.into_vec(),
                speed_factor: raw.params.speed_factor,
                extrusion_factors: raw.params.extr_factors,
                babystep: raw.params.babystep,
            },
            seq: raw.seq,
            sensors: Sensors {
                probe_value: raw.sensors.probe_value,
                probe_secondary: raw.sensors.probe_secondary.unwrap_or_default(),
                fan_rpm: raw.sensors.fan_rpm.into_vec(),
            },
            temps: temperatures(raw.temps),
            output: raw.output.map(output),
            scanner: raw.scanner.map(|s| ScannerStatus {
                status: s.status,
                progress: s.progress,
            }),
            uptime: raw.time,
            extended,
            print,
        }
    }
}

fn temperatures(raw: RawTemps) -> Temperatures {
    let heaters = match (raw.current, raw.state, raw.heads) {
        (Some(current), Some(state), _) => HeaterReadings::Unified {
            current,
            state: state.into_iter().map(HeaterState::from).collect(),
        },
        (_, _, Some(heads)) => HeaterReadings::Legacy {
            heads: heads
                .current
                .iter()
                .enumerate()
                .map(|(i, current)| HeadReading {
                    current: *current,
                    active: heads.active.get(i).copied().unwrap_or_default(),
                    standby: heads.standby.get(i).copied().unwrap_or_default(),
                    state: heads.state.get(i).copied().map_or(HeaterState::Off, HeaterState::from),
                })
                .collect(),
        },
        _ => HeaterReadings::None,
    };

    Temperatures {
        bed: raw.bed.map(heater_zone),
        chamber: raw.chamber.map(heater_zone),
        heaters,
        tools: raw.tools.map(|t| ToolTargets {
            active: t.active,
            standby: t.standby,
        }),
        extra: raw
            .extra
            .unwrap_or_default()
            .into_iter()
            .map(|e| ExtraSensor {
                name: e.name,
                temp: e.temp,
            })
            .collect(),
    }
}

fn heater_zone(raw: RawHeaterBlock) -> HeaterZone {
    HeaterZone {
        current: raw.current,
        active: raw.active,
        standby: raw.standby,
        state: HeaterState::from(raw.state),
        heater: raw.heater,
    }
}

fn output(raw: RawOutput) -> Output {
    let beep = match (raw.beep_frequency, raw.beep_duration) {
        (Some(frequency), Some(duration_ms)) => Some(Beep {
            frequency,
            duration_ms,
        }),
        _ => None,
    };
    Output {
        beep,
        message: raw.message,
        message_box: raw.msg_box.map(message_box),
    }
}

fn message_box(raw: RawMessageBox) -> MessageBox {
    MessageBox {
        title: raw.title,
        message: raw.msg,
        mode: raw.mode,
        seq: raw.seq,
        timeout: raw.timeout,
        controls: raw.controls,
    }
}

/// Extended-only fields, or `None` if the response carried none of them.
fn extended_block(raw: &StatusResponse) -> Option<ExtendedStatus> {
    let ext = ExtendedStatus {
        firmware_name: raw.firmware_name.clone(),
        name: raw.name.clone(),
        geometry: raw.geometry.clone(),
        axes: raw.axes,
        cold_extrude_temp: raw.cold_extrude_temp,
        cold_retract_temp: raw.cold_retract_temp,
        temp_limit: raw.temp_limit,
        endstops: raw.endstops,
        volumes: raw.volumes,
        mounted_volumes: raw.mounted_volumes,
        probe: raw
            .probe
            .as_ref()
            .map(|p| ProbeParams::new(p.threshold, p.height, p.probe_type)),
        tools: raw.tools.as_ref().map(|tools| {
            tools
                .iter()
                .map(|t| Tool {
                    number: t.number,
                    name: t.name.clone().filter(|n| !n.is_empty()),
                    heaters: t.heaters.clone(),
                    drives: t.drives.clone(),
                })
                .collect()
        }),
        vin: raw.vin.map(|v| Voltage {
            min: v.min,
            current: v.cur,
            max: v.max,
        }),
    };
    (ext != ExtendedStatus::default()).then_some(ext)
}

/// Print-only fields, keyed on `fractionPrinted`.
fn print_block(raw: &StatusResponse) -> Option<PrintStatus> {
    let fraction_printed = raw.fraction_printed?;
    let times_left = raw.times_left.unwrap_or_default();
    Some(PrintStatus {
        fraction_printed,
        current_layer: raw.current_layer.unwrap_or_default(),
        current_layer_time: raw.current_layer_time.unwrap_or_default(),
        extruded_raw: raw.extr_raw.clone().unwrap_or_default(),
        first_layer_duration: raw.first_layer_duration.unwrap_or_default(),
        first_layer_height: raw.first_layer_height.unwrap_or_default(),
        print_duration: raw.print_duration.unwrap_or_default(),
        warm_up_duration: raw.warm_up_duration.unwrap_or_default(),
        times_left: TimesLeft {
            file: times_left.file,
            filament: times_left.filament,
            layer: times_left.layer,
        },
    })
}

// ── File info ──────────────────────────────────────────────────────

impl From<FileInfoResponse> for FileInfo {
    fn from(raw: FileInfoResponse) -> Self {
        Self {
            file_name: raw.file_name,
            size: raw.size,
            height: raw.height.unwrap_or_default(),
            layer_height: raw.layer_height.unwrap_or_default(),
            first_layer_height: raw.first_layer_height.unwrap_or_default(),
            filament: raw.filament,
            generated_by: raw.generated_by.filter(|g| !g.is_empty()),
            print_duration: raw.print_duration,
        }
    }
}
