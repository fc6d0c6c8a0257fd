//! Projectile motion helpers
//!
//! Tick-based 2D kinematics: aim jitter, spread fans, homing steering and
//! the circle tests used for walls, bodies and melee cones.

use bevy::math::{Rect, Vec2};
use rand::Rng;
use std::f32::consts::{PI, TAU};

/// Advance a projectile by one tick. Returns the new position.
pub fn step_linear(position: Vec2, velocity: Vec2) -> Vec2 {
    position + velocity
}

/// Heading angle of a direction vector (radians, +X = 0)
pub fn heading(direction: Vec2) -> f32 {
    direction.y.atan2(direction.x)
}

/// Unit vector for a heading angle
pub fn direction_from_heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Wrap an angle into (-PI, PI]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Apply a single random angular jitter to an aim heading
///
/// `max_jitter` is the largest deviation in either direction (radians).
pub fn apply_jitter<R: Rng>(aim: f32, max_jitter: f32, rng: &mut R) -> f32 {
    if max_jitter <= 0.0 {
        return aim;
    }
    aim + rng.gen_range(-max_jitter..=max_jitter)
}

/// Evenly distribute `count` headings across `spread` radians, centered on `aim`
pub fn spread_headings(aim: f32, count: u32, spread: f32) -> Vec<f32> {
    if count <= 1 {
        return vec![aim];
    }
    let first = aim - spread * 0.5;
    let step = spread / (count - 1) as f32;
    (0..count).map(|i| first + step * i as f32).collect()
}

/// Rotate `velocity` toward `desired` heading by at most `turn_rate` radians
///
/// Only the direction changes; the speed is preserved.
pub fn steer_towards(velocity: Vec2, desired: f32, turn_rate: f32) -> Vec2 {
    let speed = velocity.length();
    if speed <= f32::EPSILON {
        return velocity;
    }
    let current = heading(velocity);
    let delta = wrap_angle(desired - current).clamp(-turn_rate, turn_rate);
    direction_from_heading(current + delta) * speed
}

/// Strict circle-circle overlap (touching does not count)
pub fn circles_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    a.distance(b) < radius_a + radius_b
}

/// Circle vs axis-aligned rectangle
pub fn circle_hits_rect(center: Vec2, radius: f32, rect: Rect) -> bool {
    let closest = center.clamp(rect.min, rect.max);
    closest.distance_squared(center) < radius * radius
}

/// Is `point` inside a cone starting at `apex`?
///
/// The angle to the point is wrapped into [0, PI] before comparing with the
/// half angle, so cones facing across the +/-PI seam work.
pub fn in_cone(apex: Vec2, facing: f32, half_angle: f32, range: f32, point: Vec2) -> bool {
    let offset = point - apex;
    let distance = offset.length();
    if distance > range {
        return false;
    }
    if distance <= f32::EPSILON {
        return true;
    }
    let angle = wrap_angle(heading(offset) - facing).abs();
    angle <= half_angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_wrap_angle_range() {
        for raw in [-10.0, -PI, -1.0, 0.0, 1.0, PI, 7.0, 20.0] {
            let wrapped = wrap_angle(raw);
            assert!(wrapped > -PI - 1e-5 && wrapped <= PI + 1e-5, "{} -> {}", raw, wrapped);
            assert!((direction_from_heading(raw) - direction_from_heading(wrapped)).length() < 1e-4);
        }
    }

    #[test]
    fn test_spread_headings_symmetric() {
        let aim = 0.3;
        let spread = 0.8;
        let headings = spread_headings(aim, 5, spread);
        assert_eq!(headings.len(), 5);
        assert!((headings[4] - headings[0] - spread).abs() < 1e-5);
        for i in 0..5 {
            let mirrored = headings[4 - i];
            assert!(((headings[i] - aim) + (mirrored - aim)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_steering_preserves_speed() {
        let mut velocity = Vec2::new(6.0, 0.0);
        for _ in 0..50 {
            velocity = steer_towards(velocity, PI * 0.75, 0.1);
            assert!((velocity.length() - 6.0).abs() < 1e-3);
        }
        // Converged on the desired heading instead of overshooting
        assert!((heading(velocity) - PI * 0.75).abs() < 1e-3);
    }

    #[test]
    fn test_steering_turns_at_fixed_rate() {
        let velocity = steer_towards(Vec2::new(1.0, 0.0), PI * 0.5, 0.1);
        assert!((heading(velocity) - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_jitter_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let aim = apply_jitter(1.0, 0.2, &mut rng);
            assert!((aim - 1.0).abs() <= 0.2 + 1e-6);
        }
        assert_eq!(apply_jitter(1.0, 0.0, &mut rng), 1.0);
    }

    #[test]
    fn test_cone_across_seam() {
        // Facing -X; a point slightly below -X sits at heading ~ -PI
        let apex = Vec2::ZERO;
        assert!(in_cone(apex, PI, 0.3, 10.0, Vec2::new(-5.0, -0.5)));
        assert!(in_cone(apex, PI, 0.3, 10.0, Vec2::new(-5.0, 0.5)));
        assert!(!in_cone(apex, PI, 0.3, 10.0, Vec2::new(5.0, 0.0)));
        assert!(!in_cone(apex, PI, 0.3, 4.0, Vec2::new(-5.0, 0.0)));
    }

    #[test]
    fn test_circle_rect() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(circle_hits_rect(Vec2::new(-1.0, 5.0), 2.0, rect));
        assert!(!circle_hits_rect(Vec2::new(-3.0, 5.0), 2.0, rect));
        assert!(circle_hits_rect(Vec2::new(5.0, 5.0), 0.5, rect));
    }
}
