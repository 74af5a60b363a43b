//! Time-sampled transitions for chart attributes.
//!
//! A transition is plain data (from, to, start, duration) evaluated against a
//! caller-supplied clock, so panels never need a timer of their own. Re-targeting
//! starts from wherever the value currently is, which makes the latest update win
//! for each keyed element.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opacity used for elements that are present but not yet visible.
pub const HIDDEN: f64 = 1e-6;
pub const VISIBLE: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

pub trait Lerp: Clone {
    fn lerp(&self, to: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for [f64; 2] {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        [self[0].lerp(&to[0], t), self[1].lerp(&to[1], t)]
    }
}

impl Lerp for Point {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        Point::new(self.x.lerp(&to.x, t), self.y.lerp(&to.y, t))
    }
}

/// Path geometry: vertices pair up by position; vertices the source lacks
/// appear directly at their target.
impl Lerp for Vec<Point> {
    fn lerp(&self, to: &Self, t: f64) -> Self {
        to.iter()
            .enumerate()
            .map(|(i, target)| match self.get(i) {
                Some(source) => source.lerp(target, t),
                None => *target,
            })
            .collect()
    }
}

pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = 2.0 * t - 2.0;
        0.5 * u * u * u + 1.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Animated<T> {
    from: T,
    to: T,
    start: Duration,
    duration: Duration,
}

impl<T: Lerp> Animated<T> {
    pub fn settled(value: T) -> Self {
        Self {
            from: value.clone(),
            to: value,
            start: Duration::ZERO,
            duration: Duration::ZERO,
        }
    }

    pub fn towards(from: T, to: T, now: Duration, duration: Duration) -> Self {
        Self {
            from,
            to,
            start: now,
            duration,
        }
    }

    fn progress(&self, now: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start).as_secs_f64();
        (elapsed / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn sample(&self, now: Duration) -> T {
        let p = self.progress(now);
        if p >= 1.0 {
            return self.to.clone();
        }
        self.from.lerp(&self.to, ease_cubic_in_out(p))
    }

    /// Supersede any in-flight transition, continuing from the current value.
    pub fn retarget(&mut self, to: T, now: Duration, duration: Duration) {
        self.from = self.sample(now);
        self.to = to;
        self.start = now;
        self.duration = duration;
    }

    pub fn target(&self) -> &T {
        &self.to
    }

    pub fn is_finished(&self, now: Duration) -> bool {
        self.progress(now) >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_ease_endpoints_and_midpoint() {
        assert_eq!(ease_cubic_in_out(0.0), 0.0);
        assert_eq!(ease_cubic_in_out(1.0), 1.0);
        assert!((ease_cubic_in_out(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_sample_clamps_to_target() {
        let anim = Animated::towards(0.0, 10.0, ms(100), ms(750));
        assert_eq!(anim.sample(ms(0)), 0.0);
        assert_eq!(anim.sample(ms(850)), 10.0);
        assert!(anim.is_finished(ms(850)));
        assert!(!anim.is_finished(ms(500)));
    }

    #[test]
    fn test_retarget_continues_from_current_value() {
        let mut anim = Animated::towards(0.0, 100.0, ms(0), ms(1000));
        let midway = anim.sample(ms(500));
        anim.retarget(20.0, ms(500), ms(1000));
        assert_eq!(anim.sample(ms(500)), midway);
        assert_eq!(anim.sample(ms(1500)), 20.0);
        assert_eq!(*anim.target(), 20.0);
    }

    #[test]
    fn test_retarget_to_same_target_does_not_drift() {
        let mut anim = Animated::settled(Point::new(3.0, 4.0));
        anim.retarget(Point::new(3.0, 4.0), ms(10), ms(750));
        for t in [10, 200, 400, 760] {
            assert_eq!(anim.sample(ms(t)), Point::new(3.0, 4.0));
        }
    }

    #[test]
    fn test_path_lerp_with_new_vertices() {
        let from = vec![Point::new(0.0, 0.0)];
        let to = vec![Point::new(10.0, 10.0), Point::new(20.0, 0.0)];
        let mid = from.lerp(&to, 0.5);
        assert_eq!(mid, vec![Point::new(5.0, 5.0), Point::new(20.0, 0.0)]);
        assert_eq!(to.lerp(&from, 1.0), from);
    }
}
