//! Column gutter detection.
//!
//! The horizontal extent of the page's text is cut into thin slices and
//! each slice counts the runs covering it. An empty vertical band near the
//! middle, wide enough and with enough text on both sides, is a gutter.

use crate::interpret::TextRun;

/// Width of one occupancy slice, in points.
const SLICE_WIDTH: f64 = 3.0;

/// Upper bound on the number of slices; wider text gets wider slices.
const MAX_SLICES: usize = 4096;

/// Narrowest band accepted as a gutter.
const MIN_GUTTER_WIDTH: f64 = 10.0;

/// Narrowest column on either side of a gutter.
const MIN_COLUMN_WIDTH: f64 = 80.0;

/// Text narrower than this is never split.
const MIN_TEXT_WIDTH: f64 = 250.0;

/// Runs spanning more than this share of the text width are treated as
/// full-width (titles, headers) and do not block a gutter.
const SPANNING_RUN_RATIO: f64 = 0.6;

/// Find the x of a single column gutter, if the page has two columns.
pub fn find_gutter(runs: &[TextRun]) -> Option<f64> {
    if runs.len() < 4 {
        return None;
    }

    let min_x = runs.iter().map(|r| r.x).fold(f64::INFINITY, f64::min);
    let max_x = runs.iter().map(TextRun::right).fold(f64::NEG_INFINITY, f64::max);
    let width = max_x - min_x;
    if !width.is_finite() || width < MIN_TEXT_WIDTH {
        return None;
    }

    let narrow: Vec<&TextRun> = runs
        .iter()
        .filter(|r| r.width <= width * SPANNING_RUN_RATIO)
        .collect();
    if narrow.len() < 4 {
        return None;
    }

    let slice_width = SLICE_WIDTH.max(width / MAX_SLICES as f64);
    let slices = ((width / slice_width) as usize + 1).min(MAX_SLICES + 1);
    let mut occupancy = vec![0usize; slices];
    for run in &narrow {
        let start = ((run.x - min_x) / slice_width).max(0.0) as usize;
        let end = (((run.right() - min_x) / slice_width).max(0.0) as usize).min(slices - 1);
        for slot in occupancy.iter_mut().take(end + 1).skip(start) {
            *slot += 1;
        }
    }

    // Only the middle of the text can hold a gutter.
    let search_start = slices * 15 / 100;
    let search_end = slices * 85 / 100;
    let center = slices / 2;
    let distance = |start: usize, len: usize| (start + len / 2).abs_diff(center);

    let mut best: Option<(usize, usize)> = None;
    let mut i = search_start;
    while i < search_end {
        if occupancy[i] != 0 {
            i += 1;
            continue;
        }
        let start = i;
        while i < search_end && occupancy[i] == 0 {
            i += 1;
        }
        let len = i - start;
        if (len as f64) * slice_width < MIN_GUTTER_WIDTH {
            continue;
        }
        let better = match best {
            None => true,
            Some((best_start, best_len)) => {
                len as f64 > best_len as f64 * 1.5
                    || (len as f64 >= best_len as f64 * 0.7
                        && distance(start, len) < distance(best_start, best_len))
            }
        };
        if better {
            best = Some((start, len));
        }
    }

    let (start, len) = best?;
    let gutter = min_x + (start as f64 + len as f64 / 2.0) * slice_width;
    if gutter - min_x < MIN_COLUMN_WIDTH || max_x - gutter < MIN_COLUMN_WIDTH {
        return None;
    }

    let left = narrow.iter().filter(|r| r.x + r.width / 2.0 < gutter).count();
    let right = narrow.len() - left;
    let min_runs = (narrow.len() / 10).max(2);
    if left < min_runs || right < min_runs {
        return None;
    }

    log::debug!("column gutter at x={:.1} ({} left, {} right runs)", gutter, left, right);
    Some(gutter)
}

/// Split runs at `gutter` into left and right columns by run center.
pub fn split_at(runs: Vec<TextRun>, gutter: f64) -> (Vec<TextRun>, Vec<TextRun>) {
    runs.into_iter().partition(|r| r.x + r.width / 2.0 < gutter)
}
