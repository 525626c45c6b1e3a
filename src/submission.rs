use crate::calculator::{CondensateReadings, VolumeReadings, STANDARD_PRESSURE_HPA};
use crate::coerce::{lenient_date, lenient_f64, lenient_flag, lenient_string, lenient_time};
use crate::db::models::{MeasurementRecord, Parameter};
use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Which normalized volume a draw's humidity measurement is paired with.
///
/// A draw has one condensate train but may sample several parameters, each
/// with its own gas meter and thus its own normalized volume.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VolumeSelection {
    /// Volume of the draw's first parameter.
    #[default]
    First,
    /// Volume of the draw's Nth parameter, 1-based.
    Parameter { index: usize },
    /// A volume chosen by the operator.
    Explicit { volume: f64 },
}

impl VolumeSelection {
    /// Pick one volume out of a draw's per-parameter volumes.
    ///
    /// An index past the last parameter falls back to the first one; a draw
    /// without parameters yields `0.0`.
    pub fn choose(&self, volumes: &[f64]) -> f64 {
        match *self {
            VolumeSelection::First => volumes.first().copied().unwrap_or(0.0),
            VolumeSelection::Parameter { index } => {
                match index.checked_sub(1).and_then(|i| volumes.get(i)) {
                    Some(volume) => *volume,
                    None => {
                        warn!(
                            "Volume selection index {} out of range for {} parameters, using the first",
                            index,
                            volumes.len()
                        );
                        volumes.first().copied().unwrap_or(0.0)
                    }
                }
            }
            VolumeSelection::Explicit { volume } => volume,
        }
    }
}

/// Column encoding: `first`, `parameter:<index>` or `explicit:<volume>`.
impl fmt::Display for VolumeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeSelection::First => write!(f, "first"),
            VolumeSelection::Parameter { index } => write!(f, "parameter:{}", index),
            VolumeSelection::Explicit { volume } => write!(f, "explicit:{}", volume),
        }
    }
}

impl FromStr for VolumeSelection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AppError::Parse(format!("Invalid volume selection: '{}'", s));

        let (mode, value) = match s.trim().split_once(':') {
            Some((mode, value)) => (mode.trim(), Some(value.trim())),
            None => (s.trim(), None),
        };

        match (mode, value) {
            ("first", None) => Ok(VolumeSelection::First),
            ("parameter", Some(v)) => v
                .parse()
                .map(|index| VolumeSelection::Parameter { index })
                .map_err(|_| invalid()),
            ("explicit", Some(v)) => v
                .parse()
                .map(|volume| VolumeSelection::Explicit { volume })
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionInput {
    #[serde(deserialize_with = "lenient_string")]
    pub session_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub company: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub plant: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub stack: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub campaign_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub operator_1: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub operator_2: String,
    #[serde(default)]
    pub draws: Vec<DrawInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DrawInput {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub nozzle_diameter: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sampling_duration: f64,
    #[serde(default, deserialize_with = "lenient_time")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub filter_id: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub multiple_draw: bool,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub ambient_temperature: f64,
    #[serde(default = "default_pressure", deserialize_with = "lenient_f64")]
    pub ambient_pressure: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub ambient_humidity: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub weather: String,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub coil_mass_initial: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub coil_mass_final: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gel_mass_initial: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gel_mass_final: f64,

    /// Overrides the configured selection for this draw only.
    #[serde(default)]
    pub volume_selection: Option<VolumeSelection>,

    #[serde(default)]
    pub parameters: Vec<ParameterInput>,
}

fn default_pressure() -> f64 {
    STANDARD_PRESSURE_HPA
}

impl DrawInput {
    pub fn condensate_readings(&self) -> CondensateReadings {
        CondensateReadings {
            coil_mass_initial: self.coil_mass_initial,
            coil_mass_final: self.coil_mass_final,
            gel_mass_initial: self.gel_mass_initial,
            gel_mass_final: self.gel_mass_final,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParameterInput {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// Free text used when `name` is "Other".
    #[serde(default, deserialize_with = "lenient_string")]
    pub other: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pump: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub flow_rate: f64,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume_initial: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume_final: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temp_initial: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temp_final: f64,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub isokinetic_ratio: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sampling_velocity: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub differential_pressure: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub flue_gas_temperature: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: String,
}

impl ParameterInput {
    pub fn volume_readings(&self, ambient_pressure: f64) -> VolumeReadings {
        VolumeReadings {
            volume_initial: self.volume_initial,
            volume_final: self.volume_final,
            temp_initial: self.temp_initial,
            temp_final: self.temp_final,
            pressure_hpa: ambient_pressure,
        }
    }
}

impl SessionInput {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let input: SessionInput = serde_yaml::from_str(content)
            .map_err(|e| AppError::Parse(format!("Failed to parse submission: {}", e)))?;

        if input.session_id.trim().is_empty() {
            return Err(AppError::InvalidData(
                "Submission has an empty session_id".to_string(),
            ));
        }

        Ok(input)
    }

    /// Derive one record per parameter of every draw.
    ///
    /// Draws are numbered from 1 in submission order. `default_selection`
    /// applies to every draw without its own `volume_selection`; the
    /// selection actually used is stored on each row of the draw.
    pub fn build_rows(
        &self,
        default_selection: VolumeSelection,
        now: DateTime<Utc>,
    ) -> Vec<MeasurementRecord> {
        let mut rows = Vec::new();

        for (idx, draw) in self.draws.iter().enumerate() {
            let draw_number = idx as i32 + 1;

            let volumes: Vec<f64> = draw
                .parameters
                .iter()
                .map(|p| p.volume_readings(draw.ambient_pressure).normalized_volume())
                .collect();

            let selection = draw.volume_selection.unwrap_or(default_selection);
            let humidity = draw
                .condensate_readings()
                .flue_gas_humidity(selection.choose(&volumes));
            let selection = selection.to_string();

            for (param, normalized_volume) in draw.parameters.iter().zip(volumes) {
                let parameter = Parameter::from_parts(&param.name, &param.other);

                rows.push(MeasurementRecord {
                    session_id: self.session_id.clone(),
                    company: self.company.clone(),
                    plant: self.plant.clone(),
                    stack: self.stack.clone(),
                    campaign_date: self.campaign_date,
                    operator_1: self.operator_1.clone(),
                    operator_2: self.operator_2.clone(),
                    draw_number,
                    nozzle_diameter: draw.nozzle_diameter,
                    sampling_duration: draw.sampling_duration,
                    start_time: draw.start_time,
                    filter_id: draw.filter_id.clone(),
                    multiple_draw: draw.multiple_draw,
                    ambient_temperature: draw.ambient_temperature,
                    ambient_pressure: draw.ambient_pressure,
                    ambient_humidity: draw.ambient_humidity,
                    weather: draw.weather.clone(),
                    parameter_name: parameter.label().to_string(),
                    other_parameter: parameter.other_text().to_string(),
                    pump: param.pump.clone(),
                    flow_rate: param.flow_rate,
                    volume_initial: param.volume_initial,
                    volume_final: param.volume_final,
                    temp_initial: param.temp_initial,
                    temp_final: param.temp_final,
                    normalized_volume,
                    coil_mass_initial: draw.coil_mass_initial,
                    coil_mass_final: draw.coil_mass_final,
                    gel_mass_initial: draw.gel_mass_initial,
                    gel_mass_final: draw.gel_mass_final,
                    flue_gas_humidity: humidity.humidity_pct,
                    isokinetic_ratio: param.isokinetic_ratio,
                    sampling_velocity: param.sampling_velocity,
                    differential_pressure: param.differential_pressure,
                    flue_gas_temperature: param.flue_gas_temperature,
                    notes: param.notes.clone(),
                    volume_selection: selection.clone(),
                    last_modified: now,
                });
            }
        }

        rows
    }
}

/// Recompute both derived columns of already-built rows.
///
/// Rows are grouped by draw number; within a draw, the selection indexes the
/// rows in their given order. Each draw keeps the selection stored on its
/// first row; `default_selection` only applies to draws with none recorded,
/// and is then stored on them.
pub fn recompute_derived(rows: &mut [MeasurementRecord], default_selection: VolumeSelection) {
    for row in rows.iter_mut() {
        row.normalized_volume = row.volume_readings().normalized_volume();
    }

    let mut draws: Vec<i32> = Vec::new();
    for row in rows.iter() {
        if !draws.contains(&row.draw_number) {
            draws.push(row.draw_number);
        }
    }

    for draw_number in draws {
        let draw_rows: Vec<&MeasurementRecord> = rows
            .iter()
            .filter(|r| r.draw_number == draw_number)
            .collect();
        let volumes: Vec<f64> = draw_rows.iter().map(|r| r.normalized_volume).collect();
        let selection = stored_selection(&draw_rows).unwrap_or(default_selection);
        let chosen = selection.choose(&volumes);
        let encoded = selection.to_string();

        for row in rows.iter_mut().filter(|r| r.draw_number == draw_number) {
            row.flue_gas_humidity = row
                .condensate_readings()
                .flue_gas_humidity(chosen)
                .humidity_pct;
            row.volume_selection = encoded.clone();
        }
    }
}

fn stored_selection(draw_rows: &[&MeasurementRecord]) -> Option<VolumeSelection> {
    let first = draw_rows.first()?;
    if first.volume_selection.trim().is_empty() {
        return None;
    }
    match first.volume_selection.parse() {
        Ok(selection) => Some(selection),
        Err(e) => {
            warn!(
                "Draw {} of session {}: {}, using the configured selection",
                first.draw_number, first.session_id, e
            );
            None
        }
    }
}
