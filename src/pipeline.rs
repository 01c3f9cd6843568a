//! The trackpoint reduction pipeline.
//!
//! Each stage consumes an ordered list of trackpoints and returns a new one.
//! Stages only filter points or adjust elevations; they never reorder.

use serde::Serialize;
use tracing::debug;

use crate::gpx_types::{GpxDocument, Trackpoint};
use crate::options::{AbsentElevation, CleanOptions, Stride};

/// Point counts observed while cleaning one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanStats {
    pub segment_found: bool,
    pub input_points: usize,
    pub after_dedup: usize,
    pub after_reduction: usize,
    pub output_points: usize,
    pub elevations_shifted: usize,
}

fn same_key(a: &Trackpoint, b: &Trackpoint, absent: AbsentElevation) -> bool {
    a.lat == b.lat && a.lon == b.lon && absent.matches(a.ele, b.ele)
}

/// Collapse runs of identical (lat, lon, ele) points to their first occurrence.
///
/// Each point is compared with the last point kept, not with its neighbour in
/// the input. Floats are compared exactly.
pub fn dedup(points: Vec<Trackpoint>, absent: AbsentElevation) -> Vec<Trackpoint> {
    let mut kept: Vec<Trackpoint> = Vec::with_capacity(points.len());

    for point in points {
        match kept.last() {
            Some(last) if same_key(last, &point, absent) => {}
            _ => kept.push(point),
        }
    }

    kept
}

/// Keep every point whose position is a multiple of `stride`.
pub fn reduce_density(points: Vec<Trackpoint>, stride: Stride) -> Vec<Trackpoint> {
    if stride.is_identity() {
        return points;
    }

    points.into_iter().step_by(stride.get()).collect()
}

/// Add `offset` meters to every present elevation. Absent elevations stay absent.
pub fn shift_elevation(mut points: Vec<Trackpoint>, offset: f64) -> Vec<Trackpoint> {
    for ele in points.iter_mut().filter_map(|p| p.ele.as_mut()) {
        *ele += offset;
    }
    points
}

/// Run all stages in order: dedup, density reduction, dedup again when points
/// were dropped by stride, elevation shift when an offset is configured.
pub fn clean_points(points: Vec<Trackpoint>, opts: &CleanOptions) -> (Vec<Trackpoint>, CleanStats) {
    let mut stats = CleanStats {
        segment_found: true,
        input_points: points.len(),
        ..Default::default()
    };

    let points = dedup(points, opts.absent_elevation);
    stats.after_dedup = points.len();
    debug!(before = stats.input_points, after = stats.after_dedup, "dedup");

    let mut points = reduce_density(points, opts.stride);
    stats.after_reduction = points.len();

    if !opts.stride.is_identity() {
        debug!(stride = %opts.stride, after = stats.after_reduction, "density reduction");
        points = dedup(points, opts.absent_elevation);
        debug!(after = points.len(), "re-dedup");
    }

    if opts.shifts_elevation() {
        stats.elevations_shifted = points.iter().filter(|p| p.ele.is_some()).count();
        points = shift_elevation(points, opts.elevation_offset);
        debug!(
            offset = opts.elevation_offset,
            shifted = stats.elevations_shifted,
            "elevation shift"
        );
    }

    stats.output_points = points.len();
    (points, stats)
}

/// Clean the first track segment of a document.
///
/// A document without a segment is returned as-is.
pub fn clean_document(mut doc: GpxDocument, opts: &CleanOptions) -> (GpxDocument, CleanStats) {
    let mut stats = CleanStats::default();

    match doc.segment_mut() {
        Some(segment) => {
            let points = std::mem::take(&mut segment.points);
            let (points, segment_stats) = clean_points(points, opts);
            segment.points = points;
            stats = segment_stats;
        }
        None => debug!("no track segment, passing document through"),
    }

    (doc, stats)
}
