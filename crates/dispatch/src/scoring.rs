use market_sim::Controls;
use serde::{Deserialize, Serialize};

use crate::divergence::{virtual_direction, PhysicalDirection, VirtualDirection};
use crate::risk::RiskContext;

pub const SCORE_RANGE: (f64, f64) = (0.0, 120.0);

const NEAR_INFEASIBLE_HEADROOM: f64 = 0.1;
const NEAR_INFEASIBLE_PENALTY: f64 = 30.0;
const SPREAD_CHASER_BONUS: f64 = 15.0;
const SPREAD_CHASER_DEGRADATION_FACTOR: f64 = 0.4;

const THIN_AS_HEADROOM: f64 = 0.2;
const THIN_AS_HEADROOM_PENALTY: f64 = 20.0;
const FRAGILE_HEDGE_BONUS: f64 = 4.0;

const VIRTUAL_FRAGILITY_PENALTY: f64 = 6.0;
const PRESERVE_LIFE_TIGHTNESS: f64 = 0.4;
const PRESERVE_LIFE_BONUS: f64 = 12.0;

const NEVER_HOLD_PENALTY: f64 = 60.0;
const STOP_OUT_BONUS: f64 = 120.0;

/// Competing uses of the asset, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    Physical,
    Ancillary,
    Virtual,
    Hold,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Physical,
        StrategyKind::Ancillary,
        StrategyKind::Virtual,
        StrategyKind::Hold,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Physical => "Physical Dispatch",
            Self::Ancillary => "Ancillary Services",
            Self::Virtual => "DA Virtuals",
            Self::Hold => "Hold for Scarcity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyScore {
    pub kind: StrategyKind,
    pub score: f64,
    pub label: &'static str,
    pub detail: &'static str,
}

impl StrategyScore {
    fn new(kind: StrategyKind, raw_score: f64, detail: &'static str) -> Self {
        Self {
            kind,
            score: clamp_score(raw_score),
            label: kind.label(),
            detail,
        }
    }
}

/// Clamps into [`SCORE_RANGE`]; NaN collapses to zero.
pub fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return SCORE_RANGE.0;
    }
    raw.clamp(SCORE_RANGE.0, SCORE_RANGE.1)
}

/// Everything a scorer reads for one interval.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub controls: &'a Controls,
    pub risk: &'a RiskContext,
    pub physical_direction: PhysicalDirection,
    pub da_rt_spread: f64,
}

impl ScoringContext<'_> {
    fn direction_headroom(&self) -> f64 {
        match self.physical_direction {
            PhysicalDirection::Discharge => self.risk.soc_headroom_up,
            PhysicalDirection::Charge => self.risk.soc_headroom_down,
        }
    }

    pub fn virtual_direction(&self) -> VirtualDirection {
        virtual_direction(self.da_rt_spread)
    }
}

pub fn score_strategy(kind: StrategyKind, ctx: &ScoringContext<'_>) -> StrategyScore {
    match kind {
        StrategyKind::Physical => score_physical(ctx),
        StrategyKind::Ancillary => score_ancillary(ctx),
        StrategyKind::Virtual => score_virtual(ctx),
        StrategyKind::Hold => score_hold(ctx),
    }
}

/// Scores in declaration order.
pub fn score_all(ctx: &ScoringContext<'_>) -> [StrategyScore; 4] {
    StrategyKind::ALL.map(|kind| score_strategy(kind, ctx))
}

pub fn score_physical(ctx: &ScoringContext<'_>) -> StrategyScore {
    let controls = ctx.controls;
    let confidence = ctx.risk.confidence_score;
    let headroom = ctx.direction_headroom();

    let spread_signal = controls.spread_expectation * 0.8 + controls.volatility_expectation * 0.4;
    let base = spread_signal + headroom * 25.0;

    let confidence_penalty = if controls.ignore_confidence {
        0.0
    } else {
        (1.0 - confidence) * (0.6 + controls.band_width / 100.0) * 35.0
    };

    let degradation_penalty = (12.0 + controls.degradation_sensitivity / 100.0 * 28.0)
        * (0.6 + ctx.risk.cycle_tightness);
    let degradation_penalty = if controls.always_chase_spread {
        degradation_penalty * SPREAD_CHASER_DEGRADATION_FACTOR
    } else {
        degradation_penalty
    };

    let mut score = base * (0.55 + headroom) - confidence_penalty - degradation_penalty;
    if controls.always_chase_spread {
        score += SPREAD_CHASER_BONUS;
    }
    if headroom < NEAR_INFEASIBLE_HEADROOM {
        score -= NEAR_INFEASIBLE_PENALTY;
    }

    let detail = match ctx.physical_direction {
        PhysicalDirection::Discharge => "High price window favors discharge.",
        PhysicalDirection::Charge => "Low price window favors charging.",
    };
    StrategyScore::new(StrategyKind::Physical, score, detail)
}

pub fn score_ancillary(ctx: &ScoringContext<'_>) -> StrategyScore {
    let controls = ctx.controls;
    let headroom = ctx.risk.as_headroom;
    let speed = controls.ramp_speed / 100.0;

    let mode_adjustment = if controls.co_optimized { 0.1 } else { -0.05 };
    let base = controls.ancillary_price_level * (0.9 + mode_adjustment);

    let mut score = base * (0.6 + headroom) * (0.7 + speed * 0.6);
    if controls.co_optimized {
        score -= (1.0 - headroom) * 12.0;
    }
    if controls.forecast_fragile {
        score += FRAGILE_HEDGE_BONUS;
    }
    if headroom < THIN_AS_HEADROOM {
        score -= THIN_AS_HEADROOM_PENALTY;
    }

    let detail = if controls.co_optimized {
        "Speed value with RTC+B co-optimization."
    } else {
        "Availability revenue with simplified scheduling."
    };
    StrategyScore::new(StrategyKind::Ancillary, score, detail)
}

pub fn score_virtual(ctx: &ScoringContext<'_>) -> StrategyScore {
    let controls = ctx.controls;
    let confidence = ctx.risk.confidence_score;

    let exposure_ratio = controls.virtual_mw / controls.max_virtual_mw.max(1.0);
    let base = ctx.da_rt_spread.abs() * 2.2 + controls.spread_expectation * 0.3;

    let mut score = base * (0.6 + confidence) * exposure_ratio;
    if !controls.ignore_confidence {
        score -= (1.0 - confidence) * 30.0;
    }
    if controls.forecast_fragile {
        score -= VIRTUAL_FRAGILITY_PENALTY;
    }
    if controls.use_virtuals_to_preserve_battery_life
        && ctx.risk.cycle_tightness > PRESERVE_LIFE_TIGHTNESS
    {
        score += PRESERVE_LIFE_BONUS;
    }
    if controls.virtual_mw <= 0.0 {
        score = 0.0;
    }

    let detail = match ctx.virtual_direction() {
        VirtualDirection::IncLike => "RT forecast above DA.",
        VirtualDirection::DecLike => "RT forecast below DA.",
    };
    StrategyScore::new(StrategyKind::Virtual, score, detail)
}

pub fn score_hold(ctx: &ScoringContext<'_>) -> StrategyScore {
    let controls = ctx.controls;
    let scarcity = controls.scarcity_likelihood / 100.0;

    let mut score = scarcity * 80.0
        + (1.0 - ctx.risk.confidence_score) * 35.0
        + ctx.risk.cycle_tightness * 30.0;
    if controls.protect_scarcity {
        score += 8.0;
    }
    if controls.never_hold_scarcity {
        score -= NEVER_HOLD_PENALTY;
    }
    if controls.always_chase_spread {
        score -= 12.0;
    }
    if controls.ignore_confidence {
        score -= 6.0;
    }
    if ctx.risk.loss_limit_breached {
        score += STOP_OUT_BONUS;
    }

    let detail = if scarcity > 0.4 {
        "Scarcity tail option dominates."
    } else {
        "Preserve optionality under uncertainty."
    };
    StrategyScore::new(StrategyKind::Hold, score, detail)
}
