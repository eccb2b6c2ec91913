//! Posture heuristic over accelerometer samples.
//!
//! Readings are in units of g with the device held in portrait; an upright
//! device reads roughly `(0, -1, 0)`. Posture is judged from how far the
//! averaged gravity vector leans away from that upright axis.

use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelerometerReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelerometerReading {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.z.mul_add(self.z, self.x.mul_add(self.x, self.y * self.y)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Posture {
    Good,
    Slouching,
    Poor,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostureThresholds {
    pub good_max_degrees: f64,
    pub slouch_max_degrees: f64,
    /// Samples further than this from 1 g are treated as motion.
    pub motion_tolerance: f64,
    pub window: usize,
}

impl Default for PostureThresholds {
    fn default() -> Self {
        Self { good_max_degrees: 20.0, slouch_max_degrees: 45.0, motion_tolerance: 0.3, window: 10 }
    }
}

#[derive(Debug, Clone)]
pub struct PostureClassifier {
    thresholds: PostureThresholds,
    samples: VecDeque<AccelerometerReading>,
}

impl Default for PostureClassifier {
    fn default() -> Self {
        Self::new(PostureThresholds::default())
    }
}

impl PostureClassifier {
    #[must_use]
    pub fn new(thresholds: PostureThresholds) -> Self {
        let window = thresholds.window.max(1);
        Self { thresholds: PostureThresholds { window, ..thresholds }, samples: VecDeque::with_capacity(window) }
    }

    /// Adds a sample and returns the posture over the current window.
    pub fn push(&mut self, reading: AccelerometerReading) -> Posture {
        if (reading.magnitude() - 1.0).abs() <= self.thresholds.motion_tolerance {
            if self.samples.len() == self.thresholds.window {
                self.samples.pop_front();
            }
            self.samples.push_back(reading);
        } else {
            tracing::trace!(magnitude = reading.magnitude(), "Ignoring motion sample");
        }
        self.classify()
    }

    #[must_use]
    pub fn classify(&self) -> Posture {
        self.tilt_degrees().map_or(Posture::Unknown, |tilt| {
            if tilt <= self.thresholds.good_max_degrees {
                Posture::Good
            } else if tilt <= self.thresholds.slouch_max_degrees {
                Posture::Slouching
            } else {
                Posture::Poor
            }
        })
    }

    /// Angle between the averaged gravity vector and the upright axis.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tilt_degrees(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let n = self.samples.len() as f64;
        let (sx, sy, sz) =
            self.samples.iter().fold((0.0, 0.0, 0.0), |(x, y, z), r| (x + r.x, y + r.y, z + r.z));
        let mean = AccelerometerReading::new(sx / n, sy / n, sz / n);
        let magnitude = mean.magnitude();
        if magnitude == 0.0 {
            return None;
        }
        let cos = (-mean.y / magnitude).clamp(-1.0, 1.0);
        Some(cos.acos().to_degrees())
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

/// Classifies a batch of readings from scratch.
#[must_use]
pub fn classify_readings(readings: &[AccelerometerReading], thresholds: PostureThresholds) -> Posture {
    let mut classifier = PostureClassifier::new(thresholds);
    readings.iter().fold(Posture::Unknown, |_, r| classifier.push(*r))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tilted(degrees: f64) -> AccelerometerReading {
        let rad = degrees.to_radians();
        AccelerometerReading::new(0.0, -rad.cos(), -rad.sin())
    }

    #[test]
    fn test_upright_is_good() {
        let readings = vec![AccelerometerReading::new(0.0, -1.0, 0.0); 5];
        assert_eq!(classify_readings(&readings, PostureThresholds::default()), Posture::Good);
    }

    #[test]
    fn test_tilt_bands() {
        let t = PostureThresholds::default();
        assert_eq!(classify_readings(&[tilted(10.0)], t), Posture::Good);
        assert_eq!(classify_readings(&[tilted(30.0)], t), Posture::Slouching);
        assert_eq!(classify_readings(&[tilted(70.0)], t), Posture::Poor);
    }

    #[test]
    fn test_motion_samples_are_ignored() {
        let mut classifier = PostureClassifier::default();
        assert_eq!(classifier.push(AccelerometerReading::new(1.5, -1.2, 0.4)), Posture::Unknown);
        assert_eq!(classifier.push(tilted(5.0)), Posture::Good);
        assert_eq!(classifier.push(AccelerometerReading::new(0.0, 0.0, 0.0)), Posture::Good);
    }

    #[test]
    fn test_window_slides() {
        let thresholds = PostureThresholds { window: 3, ..PostureThresholds::default() };
        let mut classifier = PostureClassifier::new(thresholds);
        for _ in 0..3 {
            classifier.push(tilted(0.0));
        }
        assert_eq!(classifier.classify(), Posture::Good);
        for _ in 0..3 {
            classifier.push(tilted(80.0));
        }
        assert_eq!(classifier.classify(), Posture::Poor);
        let tilt = classifier.tilt_degrees().unwrap();
        assert!((tilt - 80.0).abs() < 1e-6, "tilt was {tilt}");
    }

    #[test]
    fn test_empty_is_unknown() {
        let mut classifier = PostureClassifier::default();
        assert_eq!(classifier.classify(), Posture::Unknown);
        classifier.push(tilted(0.0));
        classifier.reset();
        assert_eq!(classifier.classify(), Posture::Unknown);
    }
}
