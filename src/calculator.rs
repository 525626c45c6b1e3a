/// Reference temperature, 0 °C in kelvin.
pub const STANDARD_TEMPERATURE_K: f64 = 273.15;

/// Reference pressure in hPa.
pub const STANDARD_PRESSURE_HPA: f64 = 1013.25;

/// Molar mass of water, g/mol.
pub const WATER_MOLAR_MASS: f64 = 18.0;

/// Molar volume of an ideal gas at 0 °C and 1013.25 hPa, L/mol.
pub const MOLAR_VOLUME_L: f64 = 22.414;

/// Gas meter readings of a single parameter's sampling line.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VolumeReadings {
    /// Meter reading at start, L.
    pub volume_initial: f64,
    /// Meter reading at end, L.
    pub volume_final: f64,
    /// Gas temperature at start, °C.
    pub temp_initial: f64,
    /// Gas temperature at end, °C.
    pub temp_final: f64,
    /// Ambient pressure, hPa.
    pub pressure_hpa: f64,
}

impl VolumeReadings {
    pub fn normalized_volume(&self) -> f64 {
        normalized_volume(
            self.volume_initial,
            self.volume_final,
            self.temp_initial,
            self.temp_final,
            self.pressure_hpa,
        )
    }
}

/// Condensate weighings of the coil and silica gel trap, g.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CondensateReadings {
    pub coil_mass_initial: f64,
    pub coil_mass_final: f64,
    pub gel_mass_initial: f64,
    pub gel_mass_final: f64,
}

impl CondensateReadings {
    /// Water captured by both traps, g.
    pub fn water_mass(&self) -> f64 {
        (self.coil_mass_final - self.coil_mass_initial)
            + (self.gel_mass_final - self.gel_mass_initial)
    }

    pub fn flue_gas_humidity(&self, chosen_normalized_volume: f64) -> HumidityResult {
        flue_gas_humidity(
            self.coil_mass_initial,
            self.coil_mass_final,
            self.gel_mass_initial,
            self.gel_mass_final,
            chosen_normalized_volume,
        )
    }
}

/// Output of the humidity determination.
///
/// When `total_volume == 0.0` the percentage is `0.0` but the two volumes are
/// still the computed ones, so the caller can tell the degenerate case apart.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HumidityResult {
    /// Water vapour share of the total normalized volume, %.
    pub humidity_pct: f64,
    /// Normalized volume of the condensed water as vapour, L.
    pub water_volume: f64,
    /// Water vapour plus dry gas normalized volume, L.
    pub total_volume: f64,
}

/// Normalize a sampled gas volume to 0 °C and 1013.25 hPa.
///
/// Pure and infallible: degenerate inputs degrade to `0.0`.
/// The mean of the two temperature readings is taken as the gas temperature
/// over the draw. Inputs are not range-checked; a mean temperature of
/// exactly -273.15 °C or a non-finite result yields `0.0`.
pub fn normalized_volume(
    vol_initial: f64,
    vol_final: f64,
    temp_initial: f64,
    temp_final: f64,
    pressure_hpa: f64,
) -> f64 {
    let delta_v = vol_final - vol_initial;
    let mean_temp_k = (temp_initial + temp_final) / 2.0 + STANDARD_TEMPERATURE_K;

    if mean_temp_k == 0.0 {
        return 0.0;
    }

    let result =
        delta_v * (STANDARD_TEMPERATURE_K / mean_temp_k) * (pressure_hpa / STANDARD_PRESSURE_HPA);

    if result.is_finite() {
        result
    } else {
        0.0
    }
}

/// Flue gas humidity from the water captured in the coil and gel traps.
///
/// `chosen_normalized_volume` is the single dry-gas volume paired with the
/// draw's one humidity measurement.
pub fn flue_gas_humidity(
    coil_mass_initial: f64,
    coil_mass_final: f64,
    gel_mass_initial: f64,
    gel_mass_final: f64,
    chosen_normalized_volume: f64,
) -> HumidityResult {
    let inputs = [
        coil_mass_initial,
        coil_mass_final,
        gel_mass_initial,
        gel_mass_final,
        chosen_normalized_volume,
    ];
    if inputs.iter().any(|v| !v.is_finite()) {
        return HumidityResult::default();
    }

    let water_mass = (coil_mass_final - coil_mass_initial) + (gel_mass_final - gel_mass_initial);
    let water_volume = (water_mass / WATER_MOLAR_MASS) * MOLAR_VOLUME_L;
    let total_volume = water_volume + chosen_normalized_volume;

    let humidity_pct = if total_volume == 0.0 {
        0.0
    } else {
        (water_volume / total_volume) * 100.0
    };

    HumidityResult {
        humidity_pct,
        water_volume,
        total_volume,
    }
}
