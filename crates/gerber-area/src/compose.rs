//! Board-area compositor: folds the draw items of a [`BoardProgram`] into a
//! single area, in program order.
//!
//! Dark items are unioned in, clear items subtracted from what has
//! accumulated so far. The result depends on that order, so items are never
//! reordered or batched. Each step costs more as the accumulated area grows;
//! callers that must stay responsive run the pass through
//! [`CompositeWorker`] and watch its progress channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use log::{debug, info};
use serde::ser::Serializer;
use serde::Serialize;

use crate::board::BoardProgram;
use crate::error::ComposeError;
use crate::types::{round_point, BBox, Point, Polarity};

/// Progress values a worker can emit: one per percent plus a final 1.0.
const PROGRESS_CAPACITY: usize = 101;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Segments used to flatten a full turn of any curve.
    pub segments_per_turn: usize,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            segments_per_turn: 72,
        }
    }
}

/// The composed layer area: a set of polygons, each an outer contour
/// followed by its holes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompositeArea {
    #[serde(serialize_with = "serialize_shapes")]
    shapes: Vec<Vec<Vec<Point>>>,
}

impl CompositeArea {
    pub fn shapes(&self) -> &[Vec<Vec<Point>>] {
        &self.shapes
    }

    /// All contours, outer and hole, in one list.
    pub fn contours(&self) -> impl Iterator<Item = &Vec<Point>> {
        self.shapes.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Enclosed area in square inches, holes excluded.
    pub fn area(&self) -> f64 {
        self.shapes
            .iter()
            .map(|shape| {
                let mut contours = shape.iter().map(|c| polygon_area(c).abs());
                let outer = contours.next().unwrap_or(0.0);
                outer - contours.sum::<f64>()
            })
            .sum()
    }

    pub fn bounds(&self) -> BBox {
        let mut bbox = BBox::empty();
        for p in self.contours().flatten() {
            bbox.expand_point(p[0], p[1]);
        }
        bbox
    }
}

fn polygon_area(pts: &[Point]) -> f64 {
    let n = pts.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let (a, b) = (pts[i], pts[(i + 1) % n]);
            a[0] * b[1] - b[0] * a[1]
        })
        .sum();
    twice / 2.0
}

fn serialize_shapes<S: Serializer>(shapes: &[Vec<Vec<Point>>], s: S) -> Result<S::Ok, S::Error> {
    let rounded: Vec<Vec<Vec<Point>>> = shapes
        .iter()
        .map(|shape| {
            shape
                .iter()
                .map(|c| c.iter().map(round_point).collect())
                .collect()
        })
        .collect();
    rounded.serialize(s)
}

/// Compose every item of `program`, reporting `items_done / total` after
/// each one.
pub fn compose<F>(program: &BoardProgram, options: &ComposeOptions, on_progress: F) -> CompositeArea
where
    F: FnMut(f64),
{
    let never = AtomicBool::new(false);
    match compose_cancellable(program, options, on_progress, &never) {
        Ok(area) => area,
        // `never` is never set
        Err(_) => CompositeArea::default(),
    }
}

/// Like [`compose`], but checks `cancel` before every item.
pub fn compose_cancellable<F>(
    program: &BoardProgram,
    options: &ComposeOptions,
    mut on_progress: F,
    cancel: &AtomicBool,
) -> Result<CompositeArea, ComposeError>
where
    F: FnMut(f64),
{
    let total = program.len();
    let mut accumulated: Vec<Vec<Vec<Point>>> = Vec::new();

    for (done, item) in program.items().iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            debug!("Compose: cancelled after {done} of {total} items");
            return Err(ComposeError::Cancelled);
        }

        let contours = item.shape.to_contours(options.segments_per_turn);
        if !contours.is_empty() {
            let rule = match item.polarity {
                Polarity::Dark => OverlayRule::Union,
                Polarity::Clear => OverlayRule::Difference,
            };
            accumulated = accumulated.overlay(&vec![contours], rule, FillRule::NonZero);
        }

        on_progress((done + 1) as f64 / total as f64);
    }

    info!(
        "Compose: {total} items -> {} polygons",
        accumulated.len()
    );
    Ok(CompositeArea {
        shapes: accumulated,
    })
}

/// Runs composite passes for one board on a background thread.
///
/// At most one pass runs at a time; a second [`start`](Self::start) while one
/// is in flight is rejected with [`ComposeError::Busy`].
pub struct CompositeWorker {
    program: Arc<BoardProgram>,
    options: ComposeOptions,
    busy: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

/// A pass started by [`CompositeWorker::start`].
pub struct CompositeJob {
    /// Fractions in (0, 1], non-decreasing, at most one per percent. The
    /// last one is 1.0 unless the pass was cancelled.
    pub progress: Receiver<f64>,
    handle: JoinHandle<Result<CompositeArea, ComposeError>>,
}

impl CompositeJob {
    /// Block until the pass ends.
    pub fn wait(self) -> Result<CompositeArea, ComposeError> {
        self.handle
            .join()
            .map_err(|_| ComposeError::WorkerPanicked)?
    }
}

/// Clears the busy flag when the worker thread ends, panics included.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CompositeWorker {
    pub fn new(program: Arc<BoardProgram>, options: ComposeOptions) -> Self {
        Self {
            program,
            options,
            busy: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn start(&self) -> Result<CompositeJob, ComposeError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ComposeError::Busy);
        }
        self.cancel.store(false, Ordering::Release);

        let (tx, rx) = mpsc::sync_channel(PROGRESS_CAPACITY);
        let guard = BusyGuard(Arc::clone(&self.busy));
        let program = Arc::clone(&self.program);
        let cancel = Arc::clone(&self.cancel);
        let options = self.options;

        let handle = thread::spawn(move || {
            let _guard = guard;
            let mut last_percent = 0u32;
            let result = compose_cancellable(
                &program,
                &options,
                |fraction| {
                    let percent = (fraction * 100.0).floor() as u32;
                    if percent > last_percent {
                        last_percent = percent;
                        // A dropped receiver only means nobody is watching.
                        let _ = tx.send(fraction);
                    }
                },
                &cancel,
            );
            if result.is_ok() && last_percent < 100 {
                let _ = tx.send(1.0);
            }
            result
        });

        Ok(CompositeJob {
            progress: rx,
            handle,
        })
    }

    /// Ask the running pass to stop before its next item.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Shape;
    use approx::assert_abs_diff_eq;

    fn square(x: f64, y: f64, size: f64) -> Shape {
        Shape::Rect {
            center: [x, y],
            width: size,
            height: size,
        }
    }

    #[test]
    fn test_clear_subtracts_from_earlier_dark() {
        let mut board = BoardProgram::new();
        board.append(square(0.0, 0.0, 2.0), Polarity::Dark);
        board.append(square(1.0, 0.0, 2.0), Polarity::Clear);

        let area = compose(&board, &ComposeOptions::default(), |_| {});
        assert_abs_diff_eq!(area.area(), 2.0, epsilon = 1e-6);
        let b = area.bounds();
        assert_abs_diff_eq!(b.minx, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(b.maxx, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_order_changes_result() {
        let a = square(0.0, 0.0, 2.0);
        let b = square(1.0, 0.0, 2.0);

        let mut ab = BoardProgram::new();
        ab.append(a.clone(), Polarity::Dark);
        ab.append(b.clone(), Polarity::Clear);

        let mut ba = BoardProgram::new();
        ba.append(b, Polarity::Clear);
        ba.append(a, Polarity::Dark);

        let opts = ComposeOptions::default();
        let area_ab = compose(&ab, &opts, |_| {}).area();
        let area_ba = compose(&ba, &opts, |_| {}).area();
        assert!((area_ab - area_ba).abs() > 1e-6);
        assert_abs_diff_eq!(area_ba, 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_hole_in_pad() {
        let mut board = BoardProgram::new();
        board.append(square(0.0, 0.0, 2.0), Polarity::Dark);
        board.append(square(0.0, 0.0, 1.0), Polarity::Clear);
        let area = compose(&board, &ComposeOptions::default(), |_| {});
        assert_eq!(area.shapes().len(), 1);
        assert_eq!(area.contours().count(), 2);
        assert_abs_diff_eq!(area.area(), 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_progress_per_item() {
        let mut board = BoardProgram::new();
        for i in 0..4 {
            board.append(square(i as f64 * 3.0, 0.0, 1.0), Polarity::Dark);
        }
        let mut seen = Vec::new();
        let area = compose(&board, &ComposeOptions::default(), |f| seen.push(f));
        assert_eq!(seen, vec![0.25, 0.5, 0.75, 1.0]);
        assert_eq!(area.shapes().len(), 4);
    }

    #[test]
    fn test_cancelled_before_first_item() {
        let mut board = BoardProgram::new();
        board.append(square(0.0, 0.0, 1.0), Polarity::Dark);
        let cancel = AtomicBool::new(true);
        let result =
            compose_cancellable(&board, &ComposeOptions::default(), |_| {}, &cancel);
        assert_eq!(result, Err(ComposeError::Cancelled));
    }

    #[test]
    fn test_worker_streams_progress() {
        let mut board = BoardProgram::new();
        for i in 0..3 {
            board.append(square(i as f64 * 3.0, 0.0, 1.0), Polarity::Dark);
        }
        let worker = CompositeWorker::new(Arc::new(board), ComposeOptions::default());
        let job = worker.start().unwrap();
        let events: Vec<f64> = job.progress.iter().collect();
        let area = job.wait().unwrap();

        assert_eq!(events.len(), 3);
        assert!(events.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(events.last(), Some(&1.0));
        assert_abs_diff_eq!(area.area(), 3.0, epsilon = 1e-6);

        // Finished, so it can run again
        assert!(!worker.is_busy());
        assert!(worker.start().unwrap().wait().is_ok());
    }

    #[test]
    fn test_worker_empty_board_reports_done() {
        let worker = CompositeWorker::new(Arc::new(BoardProgram::new()), ComposeOptions::default());
        let job = worker.start().unwrap();
        let events: Vec<f64> = job.progress.iter().collect();
        assert_eq!(events, vec![1.0]);
        assert!(job.wait().unwrap().is_empty());
    }

    #[test]
    fn test_worker_rejects_second_start() {
        let mut board = BoardProgram::new();
        for i in 0..3000 {
            board.append(
                Shape::Circle {
                    center: [(i % 60) as f64 * 0.05, (i / 60) as f64 * 0.05],
                    diameter: 0.07,
                },
                if i % 7 == 0 { Polarity::Clear } else { Polarity::Dark },
            );
        }
        let worker = CompositeWorker::new(Arc::new(board), ComposeOptions::default());
        let job = worker.start().unwrap();
        assert_eq!(worker.start().err(), Some(ComposeError::Busy));
        worker.cancel();
        let _ = job.wait();
        assert!(!worker.is_busy());
    }
}
