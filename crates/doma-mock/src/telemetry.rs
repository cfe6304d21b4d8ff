// ── Synthesized telemetry ──
//
// Dashboard and sensor endpoints have no fixture data; every response is
// synthesized on the fly from a [`TelemetrySource`]. The trait's default
// methods assemble the wire payloads and keep all value bounds in one
// place; implementors only supply the two sampling primitives, so tests
// can swap in a constant source and keep the payload shapes.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{TimeDelta, Utc};
use doma_api::model::{
    DashboardData, DashboardOverview, DeviceInfo, DeviceStatusCounts, EnergyConsumption,
    EnergyDistribution, EnvironmentData, SecurityStatus, SensorReading, TemperatureTrend,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sampling backend for the telemetry endpoints.
pub trait TelemetrySource: Send + Sync {
    /// Uniform sample in `low..=high`.
    fn sample_f64(&self, low: f64, high: f64) -> f64;

    /// Uniform sample in `low..=high`.
    fn sample_u32(&self, low: u32, high: u32) -> u32;

    /// One fresh data point for a registry device, bounded by its type.
    fn reading(&self, device: &DeviceInfo) -> SensorReading {
        let (low, high) = value_bounds(device.type_id);
        let at = Utc::now();
        SensorReading {
            id: at.timestamp_millis(),
            device_id: device.id,
            data_time: at,
            topic: None,
            data_value: round1(self.sample_f64(low, high)),
        }
    }

    /// `limit` historical points, newest first, one minute apart.
    fn history(&self, device: &DeviceInfo, limit: u32) -> Vec<SensorReading> {
        let (low, high) = value_bounds(device.type_id);
        let now = Utc::now();
        (0..limit)
            .map(|back| {
                let at = now - TimeDelta::minutes(i64::from(back));
                SensorReading {
                    id: at.timestamp_millis(),
                    device_id: device.id,
                    data_time: at,
                    topic: Some("security_sensors".to_owned()),
                    data_value: round1(self.sample_f64(low, high)),
                }
            })
            .collect()
    }

    fn environment(&self) -> EnvironmentData {
        EnvironmentData {
            temperature: round1(self.sample_f64(18.0, 28.0)),
            humidity: self.sample_u32(40, 80),
            pm25: self.sample_u32(10, 100),
            co2: self.sample_u32(400, 1000),
            timestamp: Utc::now(),
        }
    }

    fn energy(&self) -> EnergyConsumption {
        EnergyConsumption {
            total: round1(self.sample_f64(50.0, 200.0)),
            lighting: round1(self.sample_f64(10.0, 30.0)),
            appliances: round1(self.sample_f64(20.0, 80.0)),
            hvac: round1(self.sample_f64(30.0, 100.0)),
            other: round1(self.sample_f64(5.0, 20.0)),
            timestamp: Utc::now(),
        }
    }

    fn security(&self) -> SecurityStatus {
        SecurityStatus {
            doors_locked: self.sample_u32(3, 5),
            windows_closed: self.sample_u32(8, 12),
            motion_detected: self.sample_u32(0, 2),
            alarms_active: self.sample_u32(0, 1),
        }
    }

    fn device_status(&self) -> DeviceStatusCounts {
        DeviceStatusCounts {
            online: self.sample_u32(15, 25),
            offline: self.sample_u32(0, 5),
            total: 30,
        }
    }

    /// Hourly series ending now; `timestamps` and `values` stay parallel.
    fn temperature_trend(&self, hours: u32) -> TemperatureTrend {
        let now = Utc::now();
        let (timestamps, values) = (0..hours)
            .rev()
            .map(|back| {
                (
                    now - TimeDelta::hours(i64::from(back)),
                    round1(self.sample_f64(18.0, 28.0)),
                )
            })
            .unzip();
        TemperatureTrend { timestamps, values }
    }

    /// Per-category consumption plus its share of the sampled total.
    fn energy_distribution(&self) -> Vec<EnergyDistribution> {
        let values: Vec<(&str, f64)> = [
            ("Lighting", (5.0, 15.0)),
            ("Appliances", (20.0, 40.0)),
            ("HVAC", (30.0, 50.0)),
            ("Other", (5.0, 15.0)),
        ]
        .into_iter()
        .map(|(category, (low, high))| (category, round1(self.sample_f64(low, high))))
        .collect();

        let total: f64 = values.iter().map(|(_, value)| value).sum();
        values
            .into_iter()
            .map(|(category, value)| EnergyDistribution {
                category: category.to_owned(),
                value,
                percentage: round1(value / total * 100.0),
            })
            .collect()
    }

    fn humidity_gauge(&self) -> u32 {
        self.sample_u32(40, 80)
    }

    fn dashboard(&self) -> DashboardData {
        DashboardData {
            overview: DashboardOverview {
                device_status: self.device_status(),
                environment: self.environment(),
                energy: self.energy(),
                security: self.security(),
            },
            temperature_trend: self.temperature_trend(24),
            energy_distribution: self.energy_distribution(),
            humidity_gauge: self.humidity_gauge(),
        }
    }
}

/// Default source: a seeded [`StdRng`], so a fixed seed replays the same
/// value sequence across runs.
pub struct SeededTelemetry {
    rng: Mutex<StdRng>,
}

impl SeededTelemetry {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TelemetrySource for SeededTelemetry {
    fn sample_f64(&self, low: f64, high: f64) -> f64 {
        self.rng().random_range(low..=high)
    }

    fn sample_u32(&self, low: u32, high: u32) -> u32 {
        self.rng().random_range(low..=high)
    }
}

/// Plausible reading range for a registry device type.
fn value_bounds(type_id: i64) -> (f64, f64) {
    match type_id {
        // Flame detectors report a normalized intensity.
        3 => (0.0, 1.0),
        // Gas sensors report ppm.
        4 => (0.0, 1000.0),
        _ => (0.0, 100.0),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn same_seed_replays_the_same_sequence() {
        let a = SeededTelemetry::new(7);
        let b = SeededTelemetry::new(7);
        for _ in 0..16 {
            assert!((a.sample_f64(0.0, 100.0) - b.sample_f64(0.0, 100.0)).abs() < f64::EPSILON);
            assert_eq!(a.sample_u32(0, 1000), b.sample_u32(0, 1000));
        }
    }

    #[test]
    fn environment_stays_within_bounds() {
        let source = SeededTelemetry::new(1);
        for _ in 0..50 {
            let env = source.environment();
            assert!((18.0..=28.0).contains(&env.temperature));
            assert!((40..=80).contains(&env.humidity));
            assert!((10..=100).contains(&env.pm25));
            assert!((400..=1000).contains(&env.co2));
        }
    }

    #[test]
    fn distribution_percentages_cover_the_total() {
        let source = SeededTelemetry::new(3);
        let distribution = source.energy_distribution();
        assert_eq!(distribution.len(), 4);
        let sum: f64 = distribution.iter().map(|slice| slice.percentage).sum();
        // Per-slice rounding can drift the sum slightly off 100.
        assert!((99.0..=101.0).contains(&sum), "sum was {sum}");
    }

    #[test]
    fn trend_is_hourly_and_ends_now() {
        let source = SeededTelemetry::new(9);
        let trend = source.temperature_trend(6);
        assert_eq!(trend.timestamps.len(), 6);
        assert_eq!(trend.values.len(), 6);
        assert!(trend.timestamps.windows(2).all(|pair| pair[0] < pair[1]));
        let span = Utc::now() - *trend.timestamps.first().unwrap();
        assert_eq!(span.num_hours(), 5);
    }
}
