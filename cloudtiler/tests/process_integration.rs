//! End-to-end tests for the tabular processing pipeline.

use std::sync::Arc;

use cloudtiler::aggregate::builtin::PointDensity;
use cloudtiler::aggregate::{AggregateError, AggregateFn, ArgBag};
use cloudtiler::memory::AbortPolicy;
use cloudtiler::partition::CellSizeSpec;
use cloudtiler::process::{CatalogProcessor, ProcessError, ProcessOptions, RunOutcome};
use cloudtiler::progress::{NullProgressSink, ProgressEvent, ProgressSink};
use cloudtiler::reader::{InMemoryReader, Point, PointSet};
use cloudtiler::mask::OccupancyMask;
use cloudtiler::table::MetricTable;

fn run_table(
    reader: InMemoryReader,
    options: ProcessOptions,
) -> Result<RunOutcome, ProcessError> {
    let catalog = reader.catalog().unwrap();
    CatalogProcessor::new(catalog, Arc::new(reader), options).run(
        Arc::new(PointDensity),
        ArgBag::new(),
        &AbortPolicy,
        Arc::new(NullProgressSink),
    )
}

/// Points only in the seam region between two adjacent tiles: every
/// physical location must appear exactly once in the merged output.
#[test]
fn test_seam_contributions_counted_exactly_once() {
    // Files spanning [0,2000]x[0,1000]; extra points packed around the
    // tile boundary at x=1000, well inside both tiles' buffers.
    let mut west = vec![Point::xyz(5.0, 5.0, 0.0), Point::xyz(995.0, 995.0, 0.0)];
    let mut east = vec![Point::xyz(1005.0, 5.0, 0.0), Point::xyz(1995.0, 995.0, 0.0)];
    for i in 0..20 {
        let y = 100.0 + i as f64 * 40.0;
        west.push(Point::xyz(985.0, y, 0.0));
        east.push(Point::xyz(1015.0, y, 0.0));
    }
    let reader = InMemoryReader::new()
        .add_source("west.las", west)
        .unwrap()
        .add_source("east.las", east)
        .unwrap();

    let outcome = run_table(
        reader,
        ProcessOptions::default()
            .with_cell_size(1000.0)
            .with_buffer(50.0)
            .with_resolution(10.0)
            .with_workers(2)
            .with_progress(false),
    )
    .unwrap();

    let RunOutcome::Table(table) = outcome else {
        panic!("expected tabular outcome");
    };

    // Each occupied cell must appear exactly once.
    let mut seen = std::collections::HashSet::new();
    for row in table.rows() {
        let key = (row[0].to_bits(), row[1].to_bits());
        assert!(
            seen.insert(key),
            "cell ({}, {}) appears more than once",
            row[0],
            row[1]
        );
    }

    // Seam cells at x=985 belong to the west tile, x=1015 to the east;
    // all 40 seam contributions survive.
    let seam_rows = table
        .rows()
        .iter()
        .filter(|r| r[0] == 985.0 || r[0] == 1015.0)
        .count();
    assert_eq!(seam_rows, 40);
}

#[test]
fn test_identical_runs_produce_identical_output() {
    let build_reader = || {
        let mut points = Vec::new();
        for i in 0..50 {
            points.push(Point::xyz(
                (i * 37 % 1900) as f64 + 10.0,
                (i * 53 % 900) as f64 + 10.0,
                i as f64,
            ));
        }
        InMemoryReader::new().add_source("a.las", points).unwrap()
    };
    let options = || {
        ProcessOptions::default()
            .with_cell_size(500.0)
            .with_buffer(20.0)
            .with_resolution(50.0)
            .with_workers(4)
            .with_progress(false)
    };

    let first = run_table(build_reader(), options()).unwrap();
    let second = run_table(build_reader(), options()).unwrap();

    let (RunOutcome::Table(a), RunOutcome::Table(b)) = (first, second) else {
        panic!("expected tabular outcomes");
    };
    assert_eq!(a, b);
}

#[test]
fn test_empty_tiles_skipped_run_succeeds() {
    // Two files at opposite ends of a 4-tile extent: the two tiles in
    // between read zero points. The (0,0) and (4000,1000) points pin the
    // extent onto tile edges.
    let reader = InMemoryReader::new()
        .add_source(
            "sw.las",
            vec![
                Point::xyz(0.0, 0.0, 1.0),
                Point::xyz(450.0, 450.0, 1.0),
                Point::xyz(460.0, 460.0, 1.0),
                Point::xyz(550.0, 550.0, 1.0),
            ],
        )
        .unwrap()
        .add_source(
            "ne.las",
            vec![
                Point::xyz(4000.0, 1000.0, 1.0),
                Point::xyz(3450.0, 450.0, 1.0),
                Point::xyz(3550.0, 550.0, 1.0),
            ],
        )
        .unwrap();

    let outcome = run_table(
        reader,
        ProcessOptions::default()
            .with_cell_size(1000.0)
            .with_buffer(0.0)
            .with_resolution(100.0)
            .with_progress(false),
    )
    .unwrap();

    let RunOutcome::Table(table) = outcome else {
        panic!("expected tabular outcome");
    };
    // Occupied cells: (50,50), (450,450) [two points], (550,550) in the
    // west tile; (3450,450), (3550,550) in the east tile. The corner
    // pins sit past the half-cell trim of the outermost tiles.
    assert_eq!(table.n_rows(), 5);
    assert_eq!(
        table
            .column("density")
            .unwrap()
            .iter()
            .filter(|&&d| d == 2.0 / 10_000.0)
            .count(),
        1
    );
}

#[test]
fn test_mask_restricts_run_to_occupied_quadrant() {
    let mut points = Vec::new();
    for x in 0..20 {
        for y in 0..10 {
            points.push(Point::xyz(x as f64 * 100.0 + 50.0, y as f64 * 100.0 + 50.0, 1.0));
        }
    }
    let reader = InMemoryReader::new().add_source("a.las", points).unwrap();

    // Mask occupies only the lower-left 1000x1000 quadrant.
    let mask = OccupancyMask::from_occupied_cells(0.0, 0.0, 1000.0, 2, 2, &[(0, 0)]).unwrap();

    let outcome = run_table(
        reader,
        ProcessOptions::default()
            .with_cell_spec(CellSizeSpec::FromMask(Arc::new(mask)))
            .with_buffer(0.0)
            .with_resolution(100.0)
            .with_progress(false),
    )
    .unwrap();

    let RunOutcome::Table(table) = outcome else {
        panic!("expected tabular outcome");
    };
    for row in table.rows() {
        assert!(row[0] < 1000.0, "row at x={} escaped the mask", row[0]);
        assert!(row[1] < 1000.0, "row at y={} escaped the mask", row[1]);
    }
    assert!(!table.is_empty());
}

/// An aggregation that fails on any tile whose points include x > 1000.
struct EastRejecting;

impl AggregateFn for EastRejecting {
    fn name(&self) -> &str {
        "east_rejecting"
    }

    fn apply(
        &self,
        points: &PointSet,
        resolution: f64,
        origin: (f64, f64),
        args: &ArgBag,
    ) -> Result<MetricTable, AggregateError> {
        if points.points().iter().any(|p| p.x > 1000.0) {
            return Err(AggregateError::Failed("refusing eastern points".into()));
        }
        PointDensity.apply(points, resolution, origin, args)
    }
}

#[test]
fn test_single_tile_failure_fails_run_but_names_tiles() {
    let reader = InMemoryReader::new()
        .add_source("west.las", vec![Point::xyz(500.0, 500.0, 1.0)])
        .unwrap()
        .add_source("east.las", vec![Point::xyz(1500.0, 500.0, 1.0)])
        .unwrap();
    let catalog = reader.catalog().unwrap();

    let result = CatalogProcessor::new(
        catalog,
        Arc::new(reader),
        ProcessOptions::default()
            .with_cell_size(1000.0)
            .with_buffer(0.0)
            .with_resolution(100.0)
            .with_workers(2)
            .with_progress(false),
    )
    .run(
        Arc::new(EastRejecting),
        ArgBag::new(),
        &AbortPolicy,
        Arc::new(NullProgressSink),
    );

    let Err(ProcessError::Dispatch(cloudtiler::dispatch::DispatchError::TilesFailed {
        failures,
        total,
    })) = result
    else {
        panic!("expected TilesFailed");
    };
    assert_eq!(total, 2);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].name, "ROI1");
    assert!(failures[0].message.contains("refusing eastern points"));
}

#[test]
fn test_progress_events_reach_caller_sink() {
    struct Recorder(std::sync::Mutex<Vec<ProgressEvent>>);
    impl ProgressSink for Recorder {
        fn emit(&self, event: ProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    let reader = InMemoryReader::new()
        .add_source("a.las", vec![Point::xyz(500.0, 500.0, 1.0)])
        .unwrap()
        .add_source("b.las", vec![Point::xyz(1500.0, 500.0, 1.0)])
        .unwrap();
    let catalog = reader.catalog().unwrap();
    let sink = Arc::new(Recorder(std::sync::Mutex::new(Vec::new())));

    CatalogProcessor::new(
        catalog,
        Arc::new(reader),
        ProcessOptions::default()
            .with_cell_size(1000.0)
            .with_buffer(0.0)
            .with_resolution(100.0)
            .with_progress(true),
    )
    .run(
        Arc::new(PointDensity),
        ArgBag::new(),
        &AbortPolicy,
        sink.clone(),
    )
    .unwrap();

    let events = sink.0.lock().unwrap();
    assert!(matches!(events.first(), Some(ProgressEvent::RunStarted { total_tiles: 2, .. })));
    assert!(matches!(events.last(), Some(ProgressEvent::RunCompleted { failed: 0, .. })));
    let completions = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::TileCompleted { .. }))
        .count();
    assert_eq!(completions, 2);
}
