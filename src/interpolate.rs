//! Pure position interpolation along a resolved geometry.
//!
//! Intentionally a function of `(geometry, tick_index)` rather than stateful,
//! so progress is trivially testable and replayable from any tick count.

use crate::geometry::{RouteGeometry, RoutePoint};

/// Where the simulated vehicle is, and how far along the route it has come.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub position: RoutePoint,
    /// 0.0 at the first point, 100.0 at the last.
    pub progress_percent: f64,
}

/// Maps a tick count onto the geometry sequence.
///
/// The index is clamped to the final point, so advancing past the end holds
/// position and keeps reporting 100%. A single-point geometry reports 100%
/// immediately.
pub fn advance(geometry: &RouteGeometry, tick_index: usize) -> ProgressSample {
    let points = geometry.points();
    let last = points.len() - 1;
    let index = tick_index.min(last);
    let progress_percent = if last == 0 {
        100.0
    } else {
        (index as f64 / last as f64) * 100.0
    };

    ProgressSample {
        position: points[index],
        progress_percent,
    }
}
