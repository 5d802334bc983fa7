use std::time::{Duration, Instant};

use rand::Rng;
use serde::Serialize;
use siteconfig::ShootingStarsConfig;

use crate::{sample, Viewport};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShootingStar {
    pub id: u64,
    /// Start position in percent of the viewport.
    pub start_x: f64,
    pub start_y: f64,
    /// Degrees below the horizontal.
    pub angle: f64,
    pub size: f64,
    pub tail_length: f64,
    /// Flight time in seconds.
    pub duration: f64,
    #[serde(skip)]
    pub spawned_at: Instant,
}

/// Start and end of a flight in viewport percent, for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShootingStarPath {
    pub start: [f64; 2],
    pub end: [f64; 2],
    pub angle: f64,
    pub size: f64,
    pub tail_length: f64,
    pub duration: f64,
}

impl ShootingStarPath {
    pub(crate) fn idle() -> Self {
        Self {
            start: [0.0, 0.0],
            end: [0.0, 0.0],
            angle: 0.0,
            size: 0.0,
            tail_length: 0.0,
            duration: 0.0,
        }
    }
}

impl ShootingStar {
    /// End point in viewport percent: the start pushed one viewport diagonal
    /// along the flight angle.
    pub fn end_point(&self, viewport: Viewport) -> [f64; 2] {
        if viewport.width == 0 || viewport.height == 0 {
            return [self.start_x, self.start_y];
        }
        let distance = viewport.diagonal();
        let radians = self.angle.to_radians();
        [
            self.start_x + distance / f64::from(viewport.width) * 100.0 * radians.cos(),
            self.start_y + distance / f64::from(viewport.height) * 100.0 * radians.sin(),
        ]
    }

    pub fn path(&self, viewport: Viewport) -> ShootingStarPath {
        ShootingStarPath {
            start: [self.start_x, self.start_y],
            end: self.end_point(viewport),
            angle: self.angle,
            size: self.size,
            tail_length: self.tail_length,
            duration: self.duration,
        }
    }

    /// Flight time, capped at [`MAX_INTERVAL`]; negative or NaN durations are
    /// treated as instantaneous.
    pub fn flight(&self) -> Duration {
        match Duration::try_from_secs_f64(self.duration) {
            Ok(flight) => flight.min(MAX_INTERVAL),
            Err(_) if self.duration > 0.0 => MAX_INTERVAL,
            Err(_) => Duration::ZERO,
        }
    }

    /// Normalised flight progress in [0, 1], eased out.
    pub fn progress(&self, now: Instant) -> f64 {
        let flight = self.flight().as_secs_f64();
        if flight <= 0.0 {
            return 1.0;
        }
        let t = (now.saturating_duration_since(self.spawned_at).as_secs_f64() / flight).min(1.0);
        1.0 - (1.0 - t).powi(2)
    }

    /// Opacity keyframes 0.2 → 1 → 0 over the flight.
    pub fn opacity(&self, now: Instant) -> f64 {
        let flight = self.flight().as_secs_f64();
        if flight <= 0.0 {
            return 0.0;
        }
        let t = (now.saturating_duration_since(self.spawned_at).as_secs_f64() / flight).min(1.0);
        if t < 0.5 {
            0.2 + 0.8 * (t / 0.5)
        } else {
            1.0 - (t - 0.5) / 0.5
        }
    }
}

/// What one [`ShootingStars::tick`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShootingTick {
    pub spawned: usize,
    pub expired: usize,
}

const MIN_INTERVAL: Duration = Duration::from_millis(1);
const MAX_INTERVAL: Duration = Duration::from_secs(3600);
const MAX_LINGER: Duration = Duration::from_secs(60);

/// Periodic shooting-star spawner.
///
/// The spawn interval is drawn once per instance. One star is spawned
/// immediately; each star is removed `linger` after its flight ends.
pub struct ShootingStars {
    config: ShootingStarsConfig,
    interval: Duration,
    next_spawn: Instant,
    next_id: u64,
    active: Vec<ShootingStar>,
}

impl ShootingStars {
    pub fn new<R: Rng + ?Sized>(config: ShootingStarsConfig, now: Instant, rng: &mut R) -> Self {
        let interval = Duration::try_from_secs_f64(sample(config.interval, rng))
            .unwrap_or(MAX_INTERVAL)
            .clamp(MIN_INTERVAL, MAX_INTERVAL);
        let mut stars = Self {
            config,
            interval,
            next_spawn: now + interval,
            next_id: 0,
            active: Vec::new(),
        };
        stars.spawn(now, rng);
        stars
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_spawn(&self) -> Instant {
        self.next_spawn
    }

    pub fn active(&self) -> &[ShootingStar] {
        &self.active
    }

    /// Removal deadline for `star`.
    pub fn expires_at(&self, star: &ShootingStar) -> Instant {
        star.spawned_at + star.flight() + self.config.linger.min(MAX_LINGER)
    }

    /// Spawns at most one star if a spawn came due, then drops expired ones.
    ///
    /// Intervals missed while the caller was not ticking (a suspended
    /// process, say) are skipped rather than replayed.
    pub fn tick<R: Rng + ?Sized>(&mut self, now: Instant, rng: &mut R) -> ShootingTick {
        let mut outcome = ShootingTick::default();
        if self.next_spawn <= now {
            let overdue = now.saturating_duration_since(self.next_spawn).as_nanos();
            let into_interval = (overdue % self.interval.as_nanos()) as u64;
            let due = now
                .checked_sub(Duration::from_nanos(into_interval))
                .unwrap_or(now);
            self.spawn(due, rng);
            self.next_spawn = due + self.interval;
            outcome.spawned = 1;
        }

        let linger = self.config.linger.min(MAX_LINGER);
        let before = self.active.len();
        self.active
            .retain(|star| now < star.spawned_at + star.flight() + linger);
        outcome.expired = before - self.active.len();
        outcome
    }

    fn spawn<R: Rng + ?Sized>(&mut self, at: Instant, rng: &mut R) {
        let config = &self.config;
        let star = ShootingStar {
            id: self.next_id,
            start_x: sample(config.start_x, rng),
            start_y: sample(config.start_y, rng),
            angle: sample(config.angle, rng),
            size: sample(config.size, rng),
            tail_length: sample(config.tail_length, rng),
            duration: sample(config.duration, rng),
            spawned_at: at,
        };
        self.next_id += 1;
        self.active.push(star);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use siteconfig::Span;

    fn fixed_config() -> ShootingStarsConfig {
        ShootingStarsConfig {
            interval: Span::new(5.0, 5.0),
            duration: Span::new(1.0, 1.0),
            ..ShootingStarsConfig::default()
        }
    }

    #[test]
    fn spawns_initial_star_and_schedules_next() {
        let now = Instant::now();
        let mut rng = StdRng::seed_from_u64(1);
        let stars = ShootingStars::new(ShootingStarsConfig::default(), now, &mut rng);
        assert_eq!(stars.active().len(), 1);
        let interval = stars.interval().as_secs_f64();
        assert!((5.0..=15.0).contains(&interval));
        assert_eq!(stars.next_spawn(), now + stars.interval());
    }

    #[test]
    fn star_expires_after_flight_plus_linger() {
        let now = Instant::now();
        let mut rng = StdRng::seed_from_u64(2);
        let mut stars = ShootingStars::new(fixed_config(), now, &mut rng);
        let expiry = stars.expires_at(&stars.active()[0]);
        assert_eq!(expiry, now + Duration::from_millis(1100));

        let tick = stars.tick(now + Duration::from_millis(1099), &mut rng);
        assert_eq!(tick, ShootingTick::default());
        let tick = stars.tick(now + Duration::from_millis(1100), &mut rng);
        assert_eq!(tick.expired, 1);
        assert!(stars.active().is_empty());
    }

    #[test]
    fn late_tick_spawns_once_on_the_interval_grid() {
        let now = Instant::now();
        let mut rng = StdRng::seed_from_u64(3);
        let mut stars = ShootingStars::new(fixed_config(), now, &mut rng);
        let tick = stars.tick(now + Duration::from_secs(10), &mut rng);
        assert_eq!(tick.spawned, 1);
        assert_eq!(stars.next_spawn(), now + Duration::from_secs(15));
        // The initial star has finished; the 10 s star is just starting.
        assert_eq!(tick.expired, 1);
        assert_eq!(stars.active().len(), 1);
        assert_eq!(stars.active()[0].spawned_at, now + Duration::from_secs(10));
    }

    #[test]
    fn long_pause_does_not_replay_missed_spawns() {
        let now = Instant::now();
        let mut rng = StdRng::seed_from_u64(6);
        let mut stars = ShootingStars::new(fixed_config(), now, &mut rng);
        let resumed = now + Duration::from_millis(3_600_500);

        let tick = stars.tick(resumed, &mut rng);
        assert_eq!(tick.spawned, 1);
        assert_eq!(stars.active().len(), 1);
        assert_eq!(stars.active()[0].spawned_at, now + Duration::from_secs(3600));
        assert_eq!(stars.next_spawn(), now + Duration::from_secs(3605));
        assert!(stars.next_spawn() > resumed);
    }

    #[test]
    fn huge_spans_are_clamped_instead_of_overflowing() {
        let config = ShootingStarsConfig {
            interval: Span::new(1e300, 1e300),
            duration: Span::new(1e300, 1e300),
            linger: Duration::MAX,
            ..ShootingStarsConfig::default()
        };
        let now = Instant::now();
        let mut rng = StdRng::seed_from_u64(7);
        let mut stars = ShootingStars::new(config, now, &mut rng);
        assert_eq!(stars.interval(), MAX_INTERVAL);
        let star = &stars.active()[0];
        assert_eq!(star.flight(), MAX_INTERVAL);
        assert_eq!(
            stars.expires_at(star),
            now + MAX_INTERVAL + MAX_LINGER
        );
        assert_eq!(stars.tick(now + Duration::from_secs(1), &mut rng), ShootingTick::default());
    }

    #[test]
    fn end_point_follows_angle_and_diagonal() {
        let star = ShootingStar {
            id: 0,
            start_x: 10.0,
            start_y: 0.0,
            angle: 0.0,
            size: 2.0,
            tail_length: 40.0,
            duration: 1.0,
            spawned_at: Instant::now(),
        };
        let end = star.end_point(Viewport::new(300, 400));
        // diagonal 500 => 500 / 300 * 100 along x, nothing along y.
        assert!((end[0] - (10.0 + 500.0 / 3.0)).abs() < 1e-9);
        assert!(end[1].abs() < 1e-9);
    }

    #[test]
    fn opacity_peaks_mid_flight() {
        let now = Instant::now();
        let mut rng = StdRng::seed_from_u64(4);
        let stars = ShootingStars::new(fixed_config(), now, &mut rng);
        let star = &stars.active()[0];
        assert!((star.opacity(now) - 0.2).abs() < 1e-9);
        assert!((star.opacity(now + Duration::from_millis(500)) - 1.0).abs() < 1e-9);
        assert!(star.opacity(now + Duration::from_secs(1)).abs() < 1e-9);
        assert_eq!(star.progress(now + Duration::from_secs(2)), 1.0);
    }
}
