#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure collision detector matching moving gatherers against static items.
//!
//! Inputs are plain value slices; the detector owns no state and performs no
//! dispatch. Each gatherer contributes one travel segment per tick, each item
//! one point, and the result is the list of captures ordered by when they
//! occur along the capturing gatherer's own path.

use loot_hounds_core::Position;

/// Static point tested for capture, identified by a caller-chosen id.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Item {
    /// Location of the item.
    pub position: Position,
    /// Capture radius contributed by the item.
    pub width: f64,
    /// Caller-chosen identifier carried through to events.
    pub id: u64,
}

/// Travel segment of one moving entity during a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gatherer {
    /// Position before the move.
    pub start: Position,
    /// Position after the move.
    pub end: Position,
    /// Capture radius contributed by the gatherer.
    pub width: f64,
    /// Caller-chosen identifier carried through to events.
    pub id: u64,
}

/// Capture of one item by one gatherer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GatherEvent {
    /// Identifier of the captured item.
    pub item: u64,
    /// Identifier of the capturing gatherer.
    pub gatherer: u64,
    /// Squared perpendicular distance between item and travel line.
    pub sq_distance: f64,
    /// Fraction of the gatherer's segment at which the capture occurs.
    pub time: f64,
}

/// Orthogonal projection of a point onto a travel segment's line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Squared perpendicular distance from the point to the line.
    pub sq_distance: f64,
    /// Position of the foot of the perpendicular as a fraction of the
    /// segment; values outside `[0, 1]` fall beyond the endpoints.
    pub ratio: f64,
}

impl Projection {
    /// Reports whether the projected point lies on the segment and within
    /// the combined capture radius.
    #[must_use]
    pub fn captures(&self, radius: f64) -> bool {
        self.ratio >= 0.0 && self.ratio <= 1.0 && self.sq_distance <= radius * radius
    }
}

/// Projects `point` onto the line through `start` and `end`.
///
/// The segment must be non-degenerate; callers skip gatherers whose start
/// equals their end before projecting.
#[must_use]
pub fn project_point(start: Position, end: Position, point: Position) -> Projection {
    let u_x = point.x() - start.x();
    let u_y = point.y() - start.y();
    let v_x = end.x() - start.x();
    let v_y = end.y() - start.y();
    let u_dot_v = u_x * v_x + u_y * v_y;
    let u_len2 = u_x * u_x + u_y * u_y;
    let v_len2 = v_x * v_x + v_y * v_y;

    Projection {
        sq_distance: u_len2 - (u_dot_v * u_dot_v) / v_len2,
        ratio: u_dot_v / v_len2,
    }
}

/// Finds every (gatherer, item) capture this tick, ordered by capture time.
///
/// Gatherers whose segment is degenerate produce no events. An item captured
/// by several gatherers yields one event per gatherer; deduplication is the
/// caller's policy. Events with equal times carry no further ordering
/// guarantee.
#[must_use]
pub fn find_gather_events(items: &[Item], gatherers: &[Gatherer]) -> Vec<GatherEvent> {
    let mut events = Vec::new();

    for gatherer in gatherers {
        if gatherer.start == gatherer.end {
            continue;
        }

        for item in items {
            let projection = project_point(gatherer.start, gatherer.end, item.position);
            if projection.captures(gatherer.width + item.width) {
                events.push(GatherEvent {
                    item: item.id,
                    gatherer: gatherer.id,
                    sq_distance: projection.sq_distance,
                    time: projection.ratio,
                });
            }
        }
    }

    events.sort_by(|lhs, rhs| lhs.time.total_cmp(&rhs.time));
    events
}
