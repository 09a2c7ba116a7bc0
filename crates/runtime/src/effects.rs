use dispatch::{Action, DecisionResult};
use market_sim::{Controls, ForecastPoint, PnlBuckets, PricePoint};
use serde::Serialize;

pub const CYCLE_USE_PER_INTERVAL: f64 = 0.08;
pub const SPREAD_CHASER_CYCLE_FACTOR: f64 = 1.4;
pub const ANNUAL_CYCLES_PER_DAILY_CYCLE: f64 = 260.0;

const ANCILLARY_REVENUE_FACTOR: f64 = 15.0;
const VIRTUAL_CAPTURE_FACTOR: f64 = 0.6;
const VIRTUAL_ERROR_FACTOR: f64 = 6.0;
const PHYSICAL_ERROR_FACTOR: f64 = 2.0;
const IGNORED_CONFIDENCE_ERROR_FACTOR: f64 = 1.4;

/// Outcome of dispatching one interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickEffect {
    pub next_soc: f64,
    pub cycle_use: f64,
    pub pnl_delta: PnlBuckets,
}

impl TickEffect {
    fn idle(soc: f64) -> Self {
        Self {
            next_soc: soc,
            cycle_use: 0.0,
            pnl_delta: PnlBuckets::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct IntervalSizing {
    step_hours: f64,
    interval_mwh: f64,
    soc_delta: f64,
}

impl IntervalSizing {
    fn for_controls(controls: &Controls) -> Self {
        let step_hours = controls.granularity.step_hours();
        let interval_mwh = controls.power_mw * step_hours;

        Self {
            step_hours,
            interval_mwh,
            soc_delta: interval_mwh / controls.capacity_mwh() * 100.0,
        }
    }
}

fn cycle_use(controls: &Controls) -> f64 {
    if controls.always_chase_spread {
        CYCLE_USE_PER_INTERVAL * SPREAD_CHASER_CYCLE_FACTOR
    } else {
        CYCLE_USE_PER_INTERVAL
    }
}

fn degradation_cost(controls: &Controls, cycle_use: f64) -> f64 {
    (4.0 + controls.degradation_sensitivity / 100.0 * 10.0) * cycle_use * 20.0
}

/// Applies the decided action to one interval. Physical actions are skipped
/// when the SOC bound they push against is already reached.
pub fn apply_action(
    controls: &Controls,
    decision: &DecisionResult,
    price: &PricePoint,
    forecast: &ForecastPoint,
) -> TickEffect {
    let sizing = IntervalSizing::for_controls(controls);
    let effective_min_soc = controls.effective_min_soc();
    let mut effect = TickEffect::idle(controls.soc);

    match decision.best_action {
        Action::Charge if controls.soc < controls.max_soc => {
            effect.next_soc = controls
                .max_soc
                .min(controls.soc + sizing.soc_delta * controls.efficiency);
            effect.cycle_use = cycle_use(controls);
            effect.pnl_delta.energy -= sizing.interval_mwh * price.rt;
            effect.pnl_delta.degradation -= degradation_cost(controls, effect.cycle_use);
            effect.pnl_delta.forecast_error +=
                (forecast.rt_forecast - price.rt) * PHYSICAL_ERROR_FACTOR;
        }
        Action::Discharge if controls.soc > effective_min_soc => {
            effect.next_soc = effective_min_soc.max(controls.soc - sizing.soc_delta);
            effect.cycle_use = cycle_use(controls);
            effect.pnl_delta.energy += sizing.interval_mwh * price.rt * controls.efficiency;
            effect.pnl_delta.degradation -= degradation_cost(controls, effect.cycle_use);
            effect.pnl_delta.forecast_error +=
                (price.rt - forecast.rt_forecast) * PHYSICAL_ERROR_FACTOR;
        }
        Action::ProvideAncillary => {
            effect.pnl_delta.ancillary += sizing.interval_mwh
                * (controls.ancillary_price_level / 100.0)
                * ANCILLARY_REVENUE_FACTOR;
        }
        Action::DaVirtual => {
            let direction = decision.virtual_direction.sign();
            let actual_spread = price.rt - price.da;
            let forecast_spread = forecast.rt_forecast - forecast.price.da;

            effect.pnl_delta.virtuals += controls.virtual_mw
                * sizing.step_hours
                * actual_spread
                * direction
                * VIRTUAL_CAPTURE_FACTOR;
            effect.pnl_delta.forecast_error +=
                (actual_spread - forecast_spread) * direction * VIRTUAL_ERROR_FACTOR;
        }
        Action::Charge | Action::Discharge | Action::HoldSoc => {}
    }

    if controls.ignore_confidence {
        effect.pnl_delta.forecast_error *= IGNORED_CONFIDENCE_ERROR_FACTOR;
    }

    effect
}

#[cfg(test)]
mod tests {
    use dispatch::{evaluate_decision, Action, DecisionInputs, DecisionResult, VirtualDirection};
    use market_sim::{Controls, ForecastPoint, IntervalGranularity, PricePoint};

    use super::{apply_action, CYCLE_USE_PER_INTERVAL};

    fn point(da: f64, rt: f64, rt_forecast: f64) -> (PricePoint, ForecastPoint) {
        let price = PricePoint {
            hour: 12.0,
            da,
            rt,
            ..PricePoint::default()
        };
        let forecast = ForecastPoint {
            price: price.clone(),
            rt_forecast,
            ..ForecastPoint::default()
        };
        (price, forecast)
    }

    fn decision_with(action: Action, virtual_direction: VirtualDirection) -> DecisionResult {
        let controls = Controls::default();
        let (_, forecast) = point(40.0, 40.0, 40.0);
        let mut decision = evaluate_decision(&DecisionInputs {
            controls: &controls,
            forecast: &[forecast],
            current_index: 0,
            average_rt: 40.0,
            total_pnl: 0.0,
        });
        decision.best_action = action;
        decision.virtual_direction = virtual_direction;
        decision
    }

    #[test]
    fn charge_raises_soc_scaled_by_efficiency() {
        let controls = Controls::default();
        let (price, forecast) = point(30.0, 25.0, 28.0);

        let effect = apply_action(
            &controls,
            &decision_with(Action::Charge, VirtualDirection::IncLike),
            &price,
            &forecast,
        );

        // 25 MWh per interval on a 400 MWh asset, at 90% efficiency.
        assert!((effect.next_soc - (52.0 + 6.25 * 0.9)).abs() < 1e-9);
        assert_eq!(effect.pnl_delta.energy, -25.0 * 25.0);
        assert_eq!(effect.cycle_use, CYCLE_USE_PER_INTERVAL);
        assert!(effect.pnl_delta.degradation < 0.0);
        assert!((effect.pnl_delta.forecast_error - 6.0).abs() < 1e-9);
    }

    #[test]
    fn discharge_stops_at_effective_min_soc() {
        let controls = Controls {
            soc: 22.0,
            ..Controls::default()
        };
        let (price, forecast) = point(60.0, 80.0, 70.0);

        let effect = apply_action(
            &controls,
            &decision_with(Action::Discharge, VirtualDirection::IncLike),
            &price,
            &forecast,
        );

        assert_eq!(effect.next_soc, 20.0);
        assert!((effect.pnl_delta.energy - 25.0 * 80.0 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn physical_action_at_bound_is_a_no_op() {
        let full = Controls {
            soc: 90.0,
            ..Controls::default()
        };
        let empty = Controls {
            soc: 20.0,
            ..Controls::default()
        };
        let (price, forecast) = point(40.0, 40.0, 40.0);

        let charge = apply_action(
            &full,
            &decision_with(Action::Charge, VirtualDirection::IncLike),
            &price,
            &forecast,
        );
        let discharge = apply_action(
            &empty,
            &decision_with(Action::Discharge, VirtualDirection::IncLike),
            &price,
            &forecast,
        );

        assert_eq!(charge.next_soc, 90.0);
        assert_eq!(charge.cycle_use, 0.0);
        assert_eq!(discharge.next_soc, 20.0);
        assert_eq!(discharge.pnl_delta.total(), 0.0);
    }

    #[test]
    fn ancillary_earns_availability_without_moving_soc() {
        let controls = Controls::default();
        let (price, forecast) = point(40.0, 40.0, 40.0);

        let effect = apply_action(
            &controls,
            &decision_with(Action::ProvideAncillary, VirtualDirection::IncLike),
            &price,
            &forecast,
        );

        assert_eq!(effect.next_soc, controls.soc);
        assert!((effect.pnl_delta.ancillary - 25.0 * 0.55 * 15.0).abs() < 1e-9);
        assert_eq!(effect.cycle_use, 0.0);
    }

    #[test]
    fn dec_like_virtual_profits_when_rt_clears_below_da() {
        let controls = Controls {
            granularity: IntervalGranularity::FifteenMinute,
            ..Controls::default()
        };
        let (price, forecast) = point(50.0, 30.0, 40.0);

        let effect = apply_action(
            &controls,
            &decision_with(Action::DaVirtual, VirtualDirection::DecLike),
            &price,
            &forecast,
        );

        // 60 MW for a quarter hour, spread -20, DEC direction.
        assert!((effect.pnl_delta.virtuals - 60.0 * 0.25 * 20.0 * 0.6).abs() < 1e-9);
        // actual -20 vs forecast -10, flipped by direction.
        assert!((effect.pnl_delta.forecast_error - 60.0).abs() < 1e-9);
    }

    #[test]
    fn ignoring_confidence_amplifies_forecast_error() {
        let careful = Controls::default();
        let careless = Controls {
            ignore_confidence: true,
            ..Controls::default()
        };
        let (price, forecast) = point(30.0, 25.0, 28.0);
        let decision = decision_with(Action::Charge, VirtualDirection::IncLike);

        let base = apply_action(&careful, &decision, &price, &forecast);
        let amplified = apply_action(&careless, &decision, &price, &forecast);

        assert!(
            (amplified.pnl_delta.forecast_error - base.pnl_delta.forecast_error * 1.4).abs()
                < 1e-9
        );
    }

    #[test]
    fn hold_leaves_everything_untouched() {
        let controls = Controls::default();
        let (price, forecast) = point(40.0, 400.0, 40.0);

        let effect = apply_action(
            &controls,
            &decision_with(Action::HoldSoc, VirtualDirection::IncLike),
            &price,
            &forecast,
        );

        assert_eq!(effect.next_soc, controls.soc);
        assert_eq!(effect.pnl_delta.total(), 0.0);
    }
}
