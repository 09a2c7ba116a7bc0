use market_sim::ForecastPoint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhysicalDirection {
    Charge,
    Discharge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VirtualDirection {
    /// Buy DA, sell RT.
    #[serde(rename = "INC-like")]
    IncLike,
    /// Sell DA, buy RT.
    #[serde(rename = "DEC-like")]
    DecLike,
}

impl VirtualDirection {
    pub fn sign(self) -> f64 {
        match self {
            Self::IncLike => 1.0,
            Self::DecLike => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::IncLike => "INC-like",
            Self::DecLike => "DEC-like",
        }
    }
}

/// Forecast RT at or above the day's average RT favours discharging.
pub fn physical_direction(rt_forecast: f64, average_rt: f64) -> PhysicalDirection {
    if rt_forecast >= average_rt {
        PhysicalDirection::Discharge
    } else {
        PhysicalDirection::Charge
    }
}

pub fn da_rt_spread(point: &ForecastPoint) -> f64 {
    point.rt_forecast - point.price.da
}

pub fn virtual_direction(da_rt_spread: f64) -> VirtualDirection {
    if da_rt_spread >= 0.0 {
        VirtualDirection::IncLike
    } else {
        VirtualDirection::DecLike
    }
}
