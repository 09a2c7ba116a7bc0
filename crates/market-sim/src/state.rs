use serde::{Deserialize, Serialize};

/// Running P&L attribution, one bucket per value driver.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PnlBuckets {
    pub energy: f64,
    pub ancillary: f64,
    #[serde(rename = "virtual")]
    pub virtuals: f64,
    pub degradation: f64,
    pub forecast_error: f64,
}

impl PnlBuckets {
    pub fn total(&self) -> f64 {
        self.energy + self.ancillary + self.virtuals + self.degradation + self.forecast_error
    }

    pub fn accumulate(&mut self, delta: &PnlBuckets) {
        self.energy += delta.energy;
        self.ancillary += delta.ancillary;
        self.virtuals += delta.virtuals;
        self.degradation += delta.degradation;
        self.forecast_error += delta.forecast_error;
    }
}

#[cfg(test)]
mod tests {
    use super::PnlBuckets;

    #[test]
    fn buckets_default_to_zero() {
        let pnl = PnlBuckets::default();

        assert_eq!(pnl.total(), 0.0);
    }

    #[test]
    fn accumulate_adds_each_bucket_independently() {
        let mut pnl = PnlBuckets {
            energy: 10.0,
            ..PnlBuckets::default()
        };

        pnl.accumulate(&PnlBuckets {
            energy: -4.0,
            ancillary: 2.0,
            virtuals: 1.5,
            degradation: -3.0,
            forecast_error: 0.5,
        });

        assert_eq!(pnl.energy, 6.0);
        assert_eq!(pnl.ancillary, 2.0);
        assert_eq!(pnl.virtuals, 1.5);
        assert_eq!(pnl.degradation, -3.0);
        assert_eq!(pnl.forecast_error, 0.5);
        assert_eq!(pnl.total(), 7.0);
    }

    #[test]
    fn virtual_bucket_uses_plain_name_on_the_wire() {
        let json = serde_json::to_value(PnlBuckets::default()).unwrap();

        assert!(json.get("virtual").is_some());
    }
}
