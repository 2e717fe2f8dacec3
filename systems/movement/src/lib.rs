#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure movement solver that clamps dog travel to the road corridor.
//!
//! The solver computes the straight-line target for one tick of travel and
//! accepts it when it stays inside the drivable corridor. Otherwise it hunts
//! the corridor boundary along the travel segment — coarse sampling followed
//! by bisection — snaps the result onto the 0.1-unit grid against the
//! direction of motion, and reports the collision by zeroing the velocity.

use std::time::Duration;

use loot_hounds_core::{Map, Position, Velocity};

const SAMPLE_STEPS: u32 = 100;
const BISECTION_STEPS: u32 = 15;
const SNAP_CELLS_PER_UNIT: f64 = 10.0;

/// Outcome of resolving one dog's travel for a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    /// Position of the dog after the move.
    pub position: Position,
    /// Velocity after the move; zeroed when the corridor boundary was hit.
    pub velocity: Velocity,
}

/// Resolves one tick of travel from `position` at `velocity` against the
/// map's road corridor.
///
/// A zero velocity leaves the position untouched and never triggers the
/// boundary search. A move that exits the corridor ends on the boundary
/// (within one snap cell) with the velocity forced to zero.
#[must_use]
pub fn resolve(map: &Map, position: Position, velocity: Velocity, dt: Duration) -> Step {
    if velocity.is_zero() {
        return Step { position, velocity };
    }

    let target = position.advanced_by(velocity, dt.as_secs_f64());
    if map.is_on_road(target) {
        return Step {
            position: target,
            velocity,
        };
    }

    let boundary = find_boundary(map, position, target);
    Step {
        position: snap_against_motion(boundary, position, target, velocity),
        velocity: Velocity::zero(),
    }
}

/// Furthest point along `[start, target]` still inside the corridor.
///
/// Samples the segment at equal steps to bracket the exit, then bisects the
/// bracket. `target` must lie outside the corridor and `start` inside it.
fn find_boundary(map: &Map, start: Position, target: Position) -> Position {
    let mut last_valid = start;

    for step in 0..=SAMPLE_STEPS {
        let ratio = f64::from(step) / f64::from(SAMPLE_STEPS);
        let current = Position::new(
            start.x() + (target.x() - start.x()) * ratio,
            start.y() + (target.y() - start.y()) * ratio,
        );

        if map.is_on_road(current) {
            last_valid = current;
            continue;
        }

        let mut low = last_valid;
        let mut high = current;
        for _ in 0..BISECTION_STEPS {
            let mid = Position::new((low.x() + high.x()) / 2.0, (low.y() + high.y()) / 2.0);
            if map.is_on_road(mid) {
                low = mid;
            } else {
                high = mid;
            }
        }
        return low;
    }

    last_valid
}

/// Snaps the boundary onto the 0.1-unit grid along the axis of dominant
/// travel, rounding against the direction of motion so the result never
/// lands beyond the corridor edge.
fn snap_against_motion(
    boundary: Position,
    start: Position,
    target: Position,
    velocity: Velocity,
) -> Position {
    if (target.x() - start.x()).abs() > (target.y() - start.y()).abs() {
        let snapped = snap_axis(boundary.x(), velocity.dx());
        Position::new(snapped, boundary.y())
    } else {
        let snapped = snap_axis(boundary.y(), velocity.dy());
        Position::new(boundary.x(), snapped)
    }
}

fn snap_axis(value: f64, component: f64) -> f64 {
    let scaled = value * SNAP_CELLS_PER_UNIT;
    let snapped = if component > 0.0 {
        scaled.floor()
    } else {
        scaled.ceil()
    };
    snapped / SNAP_CELLS_PER_UNIT
}
