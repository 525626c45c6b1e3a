use crate::calculator::{CondensateReadings, VolumeReadings};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use std::fmt;

/// One stored row: a single (session, draw, parameter) triple.
///
/// `normalized_volume` and `flue_gas_humidity` are derived from the other
/// fields and stored alongside them. They are recomputed before every save,
/// pairing the humidity with the volume picked by the draw's stored
/// `volume_selection`.
#[derive(Debug, Clone, PartialEq, Default, FromRow)]
pub struct MeasurementRecord {
    pub session_id: String,

    pub company: String,
    pub plant: String,
    pub stack: String,
    pub campaign_date: Option<NaiveDate>,
    pub operator_1: String,
    pub operator_2: String,

    pub draw_number: i32,
    /// Nozzle diameter, mm.
    pub nozzle_diameter: f64,
    /// Sampling duration, s.
    pub sampling_duration: f64,
    pub start_time: Option<NaiveTime>,
    pub filter_id: String,
    pub multiple_draw: bool,
    /// Ambient temperature, °C.
    pub ambient_temperature: f64,
    pub ambient_pressure: f64,
    /// Ambient relative humidity, %.
    pub ambient_humidity: f64,
    pub weather: String,

    pub parameter_name: String,
    pub other_parameter: String,
    pub pump: String,
    pub flow_rate: f64,

    pub volume_initial: f64,
    pub volume_final: f64,
    pub temp_initial: f64,
    pub temp_final: f64,
    pub normalized_volume: f64,

    pub coil_mass_initial: f64,
    pub coil_mass_final: f64,
    pub gel_mass_initial: f64,
    pub gel_mass_final: f64,
    pub flue_gas_humidity: f64,

    pub isokinetic_ratio: f64,
    pub sampling_velocity: f64,
    pub differential_pressure: f64,
    pub flue_gas_temperature: f64,
    pub notes: String,

    /// Encoded `VolumeSelection` the draw's humidity was paired with.
    /// Empty when unknown.
    pub volume_selection: String,

    pub last_modified: DateTime<Utc>,
}

impl MeasurementRecord {
    pub fn volume_readings(&self) -> VolumeReadings {
        VolumeReadings {
            volume_initial: self.volume_initial,
            volume_final: self.volume_final,
            temp_initial: self.temp_initial,
            temp_final: self.temp_final,
            pressure_hpa: self.ambient_pressure,
        }
    }

    pub fn condensate_readings(&self) -> CondensateReadings {
        CondensateReadings {
            coil_mass_initial: self.coil_mass_initial,
            coil_mass_final: self.coil_mass_final,
            gel_mass_initial: self.gel_mass_initial,
            gel_mass_final: self.gel_mass_final,
        }
    }

    pub fn parameter(&self) -> Parameter {
        Parameter::from_parts(&self.parameter_name, &self.other_parameter)
    }
}

/// Result of replacing the rows of one session (or some of its draws).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceResult {
    pub removed: usize,
    pub inserted: usize,
}

/// Measurand sampled on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    Dust,
    DustSiO2,
    Acids,
    SOx,
    HCl,
    HF,
    Metals,
    CrVI,
    NH3,
    SO3,
    PhenolFormaldehyde,
    Voc,
    /// Anything not in the list; carries the operator's free text.
    Other(String),
}

impl Parameter {
    pub const OTHER_LABEL: &'static str = "Other";

    /// Every predefined parameter, in form order.
    pub const KNOWN: [Parameter; 12] = [
        Parameter::Dust,
        Parameter::DustSiO2,
        Parameter::Acids,
        Parameter::SOx,
        Parameter::HCl,
        Parameter::HF,
        Parameter::Metals,
        Parameter::CrVI,
        Parameter::NH3,
        Parameter::SO3,
        Parameter::PhenolFormaldehyde,
        Parameter::Voc,
    ];

    /// Label stored in the `parameter_name` column.
    pub fn label(&self) -> &str {
        match self {
            Parameter::Dust => "Dust",
            Parameter::DustSiO2 => "Dust SiO2",
            Parameter::Acids => "Acids",
            Parameter::SOx => "SOx",
            Parameter::HCl => "HCl",
            Parameter::HF => "HF",
            Parameter::Metals => "Metals",
            Parameter::CrVI => "CrVI",
            Parameter::NH3 => "NH3",
            Parameter::SO3 => "SO3",
            Parameter::PhenolFormaldehyde => "Phenol Formaldehyde",
            Parameter::Voc => "VOC",
            Parameter::Other(_) => Self::OTHER_LABEL,
        }
    }

    /// Free text stored in the `other_parameter` column; empty for known ones.
    pub fn other_text(&self) -> &str {
        match self {
            Parameter::Other(text) => text,
            _ => "",
        }
    }

    /// Rebuild a parameter from its two stored columns.
    ///
    /// Labels match case-insensitively. An unknown label is itself the free
    /// text; `other` is only read when the label is "Other" or empty.
    pub fn from_parts(name: &str, other: &str) -> Self {
        let name = name.trim();
        if let Some(known) = Self::KNOWN
            .iter()
            .find(|p| p.label().eq_ignore_ascii_case(name))
        {
            return known.clone();
        }

        if name.is_empty() || name.eq_ignore_ascii_case(Self::OTHER_LABEL) {
            Parameter::Other(other.trim().to_string())
        } else {
            Parameter::Other(name.to_string())
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Other(text) if !text.is_empty() => write!(f, "{}", text),
            _ => write!(f, "{}", self.label()),
        }
    }
}
