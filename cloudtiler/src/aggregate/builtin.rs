//! Built-in aggregation functions.
//!
//! Standard per-cell metrics usable out of the box and exercised by the
//! CLI. Both grid points onto the shared grid defined by the run's
//! resolution and origin, and emit one row per occupied cell with the
//! cell-center coordinates the engine's trim step expects.

use std::collections::BTreeMap;

use super::{AggregateError, AggregateFn, ArgBag};
use crate::reader::PointSet;
use crate::table::MetricTable;

/// Cell index of a coordinate on the shared grid.
#[inline]
fn cell_index(value: f64, origin: f64, resolution: f64) -> i64 {
    ((value - origin) / resolution).floor() as i64
}

/// Cell center coordinate for a cell index.
#[inline]
fn cell_center(index: i64, origin: f64, resolution: f64) -> f64 {
    origin + (index as f64 + 0.5) * resolution
}

/// Points per square unit, per cell.
///
/// Emits columns `x`, `y`, `density`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PointDensity;

impl AggregateFn for PointDensity {
    fn name(&self) -> &str {
        "density"
    }

    fn apply(
        &self,
        points: &PointSet,
        resolution: f64,
        origin: (f64, f64),
        _args: &ArgBag,
    ) -> Result<MetricTable, AggregateError> {
        if resolution <= 0.0 {
            return Err(AggregateError::InvalidInput(format!(
                "resolution must be positive, got {}",
                resolution
            )));
        }

        let mut counts: BTreeMap<(i64, i64), u64> = BTreeMap::new();
        for p in points.points() {
            let key = (
                cell_index(p.y, origin.1, resolution),
                cell_index(p.x, origin.0, resolution),
            );
            *counts.entry(key).or_insert(0) += 1;
        }

        let mut table = MetricTable::new(
            vec!["x".into(), "y".into(), "density".into()],
            resolution,
        )?;
        let cell_area = resolution * resolution;
        for ((row, col), count) in counts {
            table.push_row(vec![
                cell_center(col, origin.0, resolution),
                cell_center(row, origin.1, resolution),
                count as f64 / cell_area,
            ])?;
        }
        Ok(table)
    }
}

/// Height summary per cell: mean, max and min of Z.
///
/// Emits columns `x`, `y`, `zmean`, `zmax`, `zmin`. The optional arg
/// `zmin_floor` (float) discards points below a height floor before
/// aggregating, the usual way to drop ground noise.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeightStats;

struct HeightAcc {
    sum: f64,
    max: f64,
    min: f64,
    count: u64,
}

impl AggregateFn for HeightStats {
    fn name(&self) -> &str {
        "height"
    }

    fn apply(
        &self,
        points: &PointSet,
        resolution: f64,
        origin: (f64, f64),
        args: &ArgBag,
    ) -> Result<MetricTable, AggregateError> {
        if resolution <= 0.0 {
            return Err(AggregateError::InvalidInput(format!(
                "resolution must be positive, got {}",
                resolution
            )));
        }
        let floor = args.get_float("zmin_floor");

        let mut cells: BTreeMap<(i64, i64), HeightAcc> = BTreeMap::new();
        for p in points.points() {
            if let Some(floor) = floor {
                if p.z < floor {
                    continue;
                }
            }
            let key = (
                cell_index(p.y, origin.1, resolution),
                cell_index(p.x, origin.0, resolution),
            );
            let acc = cells.entry(key).or_insert(HeightAcc {
                sum: 0.0,
                max: f64::NEG_INFINITY,
                min: f64::INFINITY,
                count: 0,
            });
            acc.sum += p.z;
            acc.max = acc.max.max(p.z);
            acc.min = acc.min.min(p.z);
            acc.count += 1;
        }

        let mut table = MetricTable::new(
            vec![
                "x".into(),
                "y".into(),
                "zmean".into(),
                "zmax".into(),
                "zmin".into(),
            ],
            resolution,
        )?;
        for ((row, col), acc) in cells {
            table.push_row(vec![
                cell_center(col, origin.0, resolution),
                cell_center(row, origin.1, resolution),
                acc.sum / acc.count as f64,
                acc.max,
                acc.min,
            ])?;
        }
        Ok(table)
    }
}
