use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rng::round_half_up;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntervalGranularity {
    #[default]
    #[serde(rename = "15m")]
    FifteenMinute,
    #[serde(rename = "5m")]
    FiveMinute,
}

impl IntervalGranularity {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "15m" => Some(Self::FifteenMinute),
            "5m" => Some(Self::FiveMinute),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FifteenMinute => "15m",
            Self::FiveMinute => "5m",
        }
    }

    pub fn steps_per_day(self) -> usize {
        match self {
            Self::FifteenMinute => 96,
            Self::FiveMinute => 288,
        }
    }

    pub fn step_hours(self) -> f64 {
        match self {
            Self::FifteenMinute => 0.25,
            Self::FiveMinute => 1.0 / 12.0,
        }
    }

    /// Wall-clock period between simulated ticks.
    pub fn tick_period(self) -> Duration {
        match self {
            Self::FifteenMinute => Duration::from_millis(900),
            Self::FiveMinute => Duration::from_millis(500),
        }
    }
}

/// Slider and toggle snapshot driving one simulated tick.
///
/// Market and governance sliders use a 0-100 scale; SOC values are
/// percentages of usable energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Controls {
    pub spread_expectation: f64,
    pub volatility_expectation: f64,
    pub ancillary_price_level: f64,
    pub scarcity_likelihood: f64,

    pub confidence_index: u8,
    pub band_width: f64,
    pub forecast_fragile: bool,

    pub soc: f64,
    pub power_mw: f64,
    pub duration_hours: f64,
    pub efficiency: f64,
    pub min_soc: f64,
    pub max_soc: f64,

    pub cycle_budget_daily: f64,
    pub cycle_budget_annual: f64,
    pub max_daily_cycles: f64,
    pub degradation_sensitivity: f64,
    pub ramp_speed: f64,
    pub max_virtual_mw: f64,
    pub virtual_mw: f64,
    pub loss_limit_enabled: bool,
    pub protect_scarcity: bool,
    pub reserved_soc: f64,
    pub use_virtuals_to_preserve_battery_life: bool,
    /// Energy and ancillary co-optimized every interval (RTC+B).
    pub co_optimized: bool,

    pub ignore_confidence: bool,
    pub always_chase_spread: bool,
    pub never_hold_scarcity: bool,

    pub granularity: IntervalGranularity,
    pub show_scarcity_window: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            spread_expectation: 55.0,
            volatility_expectation: 50.0,
            ancillary_price_level: 55.0,
            scarcity_likelihood: 35.0,
            confidence_index: 1,
            band_width: 40.0,
            forecast_fragile: false,
            soc: 52.0,
            power_mw: 100.0,
            duration_hours: 4.0,
            efficiency: 0.9,
            min_soc: 10.0,
            max_soc: 90.0,
            cycle_budget_daily: 1.6,
            cycle_budget_annual: 220.0,
            max_daily_cycles: 2.2,
            degradation_sensitivity: 50.0,
            ramp_speed: 70.0,
            max_virtual_mw: 120.0,
            virtual_mw: 60.0,
            loss_limit_enabled: true,
            protect_scarcity: true,
            reserved_soc: 20.0,
            use_virtuals_to_preserve_battery_life: true,
            co_optimized: true,
            ignore_confidence: false,
            always_chase_spread: false,
            never_hold_scarcity: false,
            granularity: IntervalGranularity::FifteenMinute,
            show_scarcity_window: true,
        }
    }
}

impl Controls {
    /// Clamps every field into its domain. Non-finite inputs fall back to
    /// the default value for that field.
    pub fn normalized(self) -> Self {
        let d = Self::default();

        let max_soc = percent(self.max_soc, d.max_soc);
        let min_soc = percent(self.min_soc, d.min_soc).min(max_soc);
        let max_virtual_mw = non_negative(self.max_virtual_mw, d.max_virtual_mw);

        Self {
            spread_expectation: percent(self.spread_expectation, d.spread_expectation),
            volatility_expectation: percent(self.volatility_expectation, d.volatility_expectation),
            ancillary_price_level: percent(self.ancillary_price_level, d.ancillary_price_level),
            scarcity_likelihood: percent(self.scarcity_likelihood, d.scarcity_likelihood),
            confidence_index: self.confidence_index.min(2),
            band_width: percent(self.band_width, d.band_width),
            forecast_fragile: self.forecast_fragile,
            soc: percent(self.soc, d.soc),
            power_mw: non_negative(self.power_mw, d.power_mw),
            duration_hours: non_negative(self.duration_hours, d.duration_hours),
            efficiency: finite_or(self.efficiency, d.efficiency).clamp(0.01, 1.0),
            min_soc,
            max_soc,
            cycle_budget_daily: non_negative(self.cycle_budget_daily, d.cycle_budget_daily),
            cycle_budget_annual: non_negative(self.cycle_budget_annual, d.cycle_budget_annual),
            max_daily_cycles: non_negative(self.max_daily_cycles, d.max_daily_cycles),
            degradation_sensitivity: percent(
                self.degradation_sensitivity,
                d.degradation_sensitivity,
            ),
            ramp_speed: percent(self.ramp_speed, d.ramp_speed),
            max_virtual_mw,
            virtual_mw: finite_or(self.virtual_mw, d.virtual_mw).clamp(0.0, max_virtual_mw),
            loss_limit_enabled: self.loss_limit_enabled,
            protect_scarcity: self.protect_scarcity,
            reserved_soc: percent(self.reserved_soc, d.reserved_soc),
            use_virtuals_to_preserve_battery_life: self.use_virtuals_to_preserve_battery_life,
            co_optimized: self.co_optimized,
            ignore_confidence: self.ignore_confidence,
            always_chase_spread: self.always_chase_spread,
            never_hold_scarcity: self.never_hold_scarcity,
            granularity: self.granularity,
            show_scarcity_window: self.show_scarcity_window,
        }
    }

    /// Lowest SOC the asset may discharge to, including the scarcity reserve.
    pub fn effective_min_soc(&self) -> f64 {
        if self.protect_scarcity {
            self.min_soc.max(self.reserved_soc)
        } else {
            self.min_soc
        }
    }

    /// Usable energy in MWh, floored at 1 so SOC deltas never divide by zero.
    pub fn capacity_mwh(&self) -> f64 {
        (self.power_mw * self.duration_hours).max(1.0)
    }

    pub fn any_failure_mode(&self) -> bool {
        self.ignore_confidence || self.always_chase_spread || self.never_hold_scarcity
    }

    pub fn apply_patch(&self, patch: &ControlsPatch) -> Self {
        let mut next = self.clone();
        patch.overlay(&mut next);
        next.normalized()
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn percent(value: f64, fallback: f64) -> f64 {
    finite_or(value, fallback).clamp(0.0, 100.0)
}

fn non_negative(value: f64, fallback: f64) -> f64 {
    finite_or(value, fallback).max(0.0)
}

/// Partial override of [`Controls`]; unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlsPatch {
    pub spread_expectation: Option<f64>,
    pub volatility_expectation: Option<f64>,
    pub ancillary_price_level: Option<f64>,
    pub scarcity_likelihood: Option<f64>,
    /// Any number; rounded and clamped onto the 0-2 ordinal when applied.
    pub confidence_index: Option<f64>,
    pub band_width: Option<f64>,
    pub forecast_fragile: Option<bool>,
    pub soc: Option<f64>,
    pub power_mw: Option<f64>,
    pub duration_hours: Option<f64>,
    pub efficiency: Option<f64>,
    pub min_soc: Option<f64>,
    pub max_soc: Option<f64>,
    pub cycle_budget_daily: Option<f64>,
    pub cycle_budget_annual: Option<f64>,
    pub max_daily_cycles: Option<f64>,
    pub degradation_sensitivity: Option<f64>,
    pub ramp_speed: Option<f64>,
    pub max_virtual_mw: Option<f64>,
    pub virtual_mw: Option<f64>,
    pub loss_limit_enabled: Option<bool>,
    pub protect_scarcity: Option<bool>,
    pub reserved_soc: Option<f64>,
    pub use_virtuals_to_preserve_battery_life: Option<bool>,
    pub co_optimized: Option<bool>,
    pub ignore_confidence: Option<bool>,
    pub always_chase_spread: Option<bool>,
    pub never_hold_scarcity: Option<bool>,
    pub granularity: Option<IntervalGranularity>,
    pub show_scarcity_window: Option<bool>,
}

fn confidence_ordinal(value: f64, fallback: u8) -> u8 {
    if !value.is_finite() {
        return fallback;
    }
    round_half_up(value).clamp(0, 2) as u8
}

macro_rules! overlay_fields {
    ($patch:expr, $target:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $patch.$field {
                $target.$field = value;
            }
        )+
    };
}

impl ControlsPatch {
    fn overlay(&self, target: &mut Controls) {
        overlay_fields!(
            self,
            target,
            spread_expectation,
            volatility_expectation,
            ancillary_price_level,
            scarcity_likelihood,
            band_width,
            forecast_fragile,
            soc,
            power_mw,
            duration_hours,
            efficiency,
            min_soc,
            max_soc,
            cycle_budget_daily,
            cycle_budget_annual,
            max_daily_cycles,
            degradation_sensitivity,
            ramp_speed,
            max_virtual_mw,
            virtual_mw,
            loss_limit_enabled,
            protect_scarcity,
            reserved_soc,
            use_virtuals_to_preserve_battery_life,
            co_optimized,
            ignore_confidence,
            always_chase_spread,
            never_hold_scarcity,
            granularity,
            show_scarcity_window,
        );
        if let Some(value) = self.confidence_index {
            target.confidence_index = confidence_ordinal(value, target.confidence_index);
        }
    }

    /// True when the patch touches an input of the price series.
    pub fn touches_price_inputs(&self) -> bool {
        self.spread_expectation.is_some()
            || self.volatility_expectation.is_some()
            || self.scarcity_likelihood.is_some()
            || self.granularity.is_some()
    }
}
