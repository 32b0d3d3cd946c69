// ── Heater reconciliation ──
//
// Flattens whichever heater layout a snapshot carries into one sample per
// poll: bed, chamber, every heater, tool targets and extra sensors.

use serde::Serialize;

use crate::model::{ExtraSensor, HeaterReadings, HeaterState, HeaterZone, Temperatures, Tool};

/// Heater index the bed uses when the firmware does not say.
pub const DEFAULT_BED_HEATER: usize = 0;

/// Bed and chamber heater indices, as configured on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeatersInUse {
    pub bed: Option<usize>,
    pub chamber: Option<usize>,
}

impl Default for HeatersInUse {
    fn default() -> Self {
        Self {
            bed: Some(DEFAULT_BED_HEATER),
            chamber: None,
        }
    }
}

impl HeatersInUse {
    /// Indices implied by a snapshot. A zone the payload omits has no heater.
    pub fn from_temps(temps: &Temperatures) -> Self {
        Self {
            bed: temps
                .bed
                .as_ref()
                .map(|bed| bed.heater.unwrap_or(DEFAULT_BED_HEATER)),
            chamber: temps.chamber.as_ref().and_then(|chamber| chamber.heater),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneReading {
    pub current: f64,
    pub active: f64,
    pub standby: Option<f64>,
    pub state: HeaterState,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeaterReading {
    pub heater: usize,
    pub current: f64,
    pub state: HeaterState,
    /// Targets are only reported per heater by the legacy layout.
    pub active: Option<f64>,
    pub standby: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToolTarget {
    pub tool: i32,
    pub heater: usize,
    pub active: f64,
    pub standby: Option<f64>,
}

/// Everything temperature related from one poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemperatureSample {
    pub bed: Option<ZoneReading>,
    pub chamber: Option<ZoneReading>,
    pub heaters: Vec<HeaterReading>,
    pub tool_targets: Vec<ToolTarget>,
    pub extra: Vec<ExtraSensor>,
}

pub fn sample(temps: &Temperatures, in_use: HeatersInUse, tools: &[Tool]) -> TemperatureSample {
    let heaters: Vec<HeaterReading> = match &temps.heaters {
        HeaterReadings::Unified { current, state } => current
            .iter()
            .enumerate()
            .map(|(heater, current)| HeaterReading {
                heater,
                current: *current,
                state: state.get(heater).copied().unwrap_or(HeaterState::Off),
                active: None,
                standby: None,
            })
            .collect(),
        // Heater 0 is the bed in this layout, heads start at 1.
        HeaterReadings::Legacy { heads } => heads
            .iter()
            .enumerate()
            .map(|(i, head)| HeaterReading {
                heater: i + 1,
                current: head.current,
                state: head.state,
                active: Some(head.active),
                standby: Some(head.standby),
            })
            .collect(),
        HeaterReadings::None => Vec::new(),
    };

    let unified = matches!(temps.heaters, HeaterReadings::Unified { .. });
    let zone = |block: Option<&HeaterZone>, index: Option<usize>| {
        block.map(|block| {
            let reading = index
                .filter(|_| unified)
                .and_then(|index| heaters.iter().find(|h| h.heater == index));
            ZoneReading {
                current: reading.map_or(block.current, |r| r.current),
                active: block.active,
                standby: block.standby,
                state: reading.map_or(block.state, |r| r.state),
            }
        })
    };
    let bed = zone(temps.bed.as_ref(), in_use.bed);
    let chamber = zone(temps.chamber.as_ref(), in_use.chamber);

    TemperatureSample {
        bed,
        chamber,
        tool_targets: tool_targets(temps, tools),
        extra: temps.extra.clone(),
        heaters,
    }
}

/// Map `temps.tools` slots onto tool numbers and heater indices. Only done
/// when the tool mapping has as many entries as the payload.
fn tool_targets(temps: &Temperatures, tools: &[Tool]) -> Vec<ToolTarget> {
    let Some(targets) = &temps.tools else {
        return Vec::new();
    };
    if targets.active.len() != tools.len() {
        return Vec::new();
    }

    tools
        .iter()
        .zip(&targets.active)
        .enumerate()
        .flat_map(|(slot, (tool, active))| {
            active.iter().enumerate().filter_map(move |(i, active)| {
                let heater = *tool.heaters.get(i)?;
                let standby = targets.standby.get(slot).and_then(|s| s.get(i)).copied();
                Some(ToolTarget {
                    tool: tool.number,
                    heater,
                    active: *active,
                    standby,
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HeadReading, ToolTargets};

    fn bed(heater: Option<usize>) -> HeaterZone {
        HeaterZone {
            current: 21.0,
            active: 60.0,
            standby: None,
            state: HeaterState::Off,
            heater,
        }
    }

    #[test]
    fn heaters_in_use_defaults() {
        let temps = Temperatures {
            bed: Some(bed(None)),
            ..Temperatures::default()
        };
        assert_eq!(
            HeatersInUse::from_temps(&temps),
            HeatersInUse {
                bed: Some(0),
                chamber: None
            }
        );
        assert_eq!(
            HeatersInUse::from_temps(&Temperatures::default()),
            HeatersInUse {
                bed: None,
                chamber: None
            }
        );
    }

    #[test]
    fn unified_layout_feeds_bed_from_heater_array() {
        let temps = Temperatures {
            bed: Some(bed(Some(0))),
            heaters: HeaterReadings::Unified {
                current: vec![58.5, 199.0],
                state: vec![HeaterState::Active, HeaterState::Active],
            },
            ..Temperatures::default()
        };
        let sample = sample(&temps, HeatersInUse::from_temps(&temps), &[]);

        let bed = sample.bed.expect("bed reading");
        assert!((bed.current - 58.5).abs() < f64::EPSILON);
        assert_eq!(bed.state, HeaterState::Active);
        assert!((bed.active - 60.0).abs() < f64::EPSILON);
        assert_eq!(sample.heaters.len(), 2);
    }

    #[test]
    fn legacy_layout_numbers_heads_from_one() {
        let temps = Temperatures {
            bed: Some(bed(None)),
            heaters: HeaterReadings::Legacy {
                heads: vec![HeadReading {
                    current: 180.0,
                    active: 200.0,
                    standby: 150.0,
                    state: HeaterState::Standby,
                }],
            },
            ..Temperatures::default()
        };
        let sample = sample(&temps, HeatersInUse::from_temps(&temps), &[]);

        assert_eq!(sample.heaters[0].heater, 1);
        assert_eq!(sample.heaters[0].active, Some(200.0));
        let bed = sample.bed.expect("bed reading");
        assert!((bed.current - 21.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tool_targets_need_matching_mapping() {
        let temps = Temperatures {
            tools: Some(ToolTargets {
                active: vec![vec![210.0], vec![195.0]],
                standby: vec![vec![150.0], vec![140.0]],
            }),
            ..Temperatures::default()
        };
        let tools = vec![
            Tool {
                number: 0,
                name: None,
                heaters: vec![1],
                drives: vec![0],
            },
            Tool {
                number: 3,
                name: None,
                heaters: vec![2],
                drives: vec![1],
            },
        ];

        let sample = sample(&temps, HeatersInUse::default(), &tools);
        assert_eq!(
            sample.tool_targets[1],
            ToolTarget {
                tool: 3,
                heater: 2,
                active: 195.0,
                standby: Some(140.0),
            }
        );

        let sample = super::sample(&temps, HeatersInUse::default(), &tools[..1]);
        assert!(sample.tool_targets.is_empty());
    }
}
