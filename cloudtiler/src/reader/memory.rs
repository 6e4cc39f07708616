//! In-memory reader backend.
//!
//! Serves reads from point sets held in memory, one per simulated source
//! file. Used by the test suite and the CLI demo path; it behaves like a
//! real backend (bbox stitching across sources, pushed-down filtering,
//! column narrowing) without touching disk.

use std::path::PathBuf;

use super::{ColumnSelection, Point, PointReader, PointSet, ReadQuery, ReaderError};
use crate::catalog::{Catalog, CatalogEntry, CatalogError};
use crate::geom::BBox;

/// One simulated source file.
#[derive(Debug, Clone)]
struct MemorySource {
    path: PathBuf,
    bbox: BBox,
    points: Vec<Point>,
}

/// Reader over in-memory per-file point sets.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReader {
    sources: Vec<MemorySource>,
}

impl InMemoryReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a simulated source file.
    ///
    /// The source's bounding box is derived from its points; an empty
    /// point list is rejected the same way a real backend would reject a
    /// header-only file.
    pub fn add_source(
        mut self,
        path: impl Into<PathBuf>,
        points: Vec<Point>,
    ) -> Result<Self, ReaderError> {
        let path = path.into();
        let bbox = PointSet::new(points.clone()).bounds().ok_or_else(|| {
            ReaderError::SourceUnreadable {
                source_id: path.display().to_string(),
                message: "source holds no points".to_string(),
            }
        })?;
        self.sources.push(MemorySource { path, bbox, points });
        Ok(self)
    }

    /// Build the catalog index for the loaded sources.
    pub fn catalog(&self) -> Result<Catalog, CatalogError> {
        Catalog::from_entries(
            self.sources
                .iter()
                .map(|s| CatalogEntry::new(s.path.clone(), s.bbox, s.points.len() as u64))
                .collect(),
        )
    }

    fn matches_filter(point: &Point, filter: &str) -> Result<bool, ReaderError> {
        // Minimal expression language: `classification == N` and
        // `classification != N`. Real backends interpret richer grammars.
        let parts: Vec<&str> = filter.split_whitespace().collect();
        let invalid = || ReaderError::InvalidFilter {
            expression: filter.to_string(),
            message: "expected 'classification ==|!= <value>'".to_string(),
        };
        if parts.len() != 3 || parts[0] != "classification" {
            return Err(invalid());
        }
        let value: u8 = parts[2].parse().map_err(|_| invalid())?;
        let class = point.classification.unwrap_or(0);
        match parts[1] {
            "==" => Ok(class == value),
            "!=" => Ok(class != value),
            _ => Err(invalid()),
        }
    }

    fn narrow(point: &Point, columns: &ColumnSelection) -> Point {
        match columns {
            ColumnSelection::All => *point,
            ColumnSelection::Xyz => Point::xyz(point.x, point.y, point.z),
            ColumnSelection::Named(names) => {
                let mut narrowed = Point::xyz(point.x, point.y, point.z);
                for name in names {
                    match name.as_str() {
                        "intensity" => narrowed.intensity = point.intensity,
                        "classification" => narrowed.classification = point.classification,
                        _ => {}
                    }
                }
                narrowed
            }
        }
    }
}

impl PointReader for InMemoryReader {
    fn read(&self, query: &ReadQuery) -> Result<Option<PointSet>, ReaderError> {
        let mut out = Vec::new();
        for source in &self.sources {
            if !source.bbox.intersects(&query.bbox) {
                continue;
            }
            for point in &source.points {
                if !query.bbox.contains_point(point.x, point.y) {
                    continue;
                }
                if let Some(filter) = &query.filter {
                    if !Self::matches_filter(point, filter)? {
                        continue;
                    }
                }
                out.push(Self::narrow(point, &query.columns));
            }
        }
        if out.is_empty() {
            Ok(None)
        } else {
            Ok(Some(PointSet::new(out)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classified(x: f64, y: f64, class: u8) -> Point {
        Point {
            classification: Some(class),
            ..Point::xyz(x, y, 1.0)
        }
    }

    fn two_file_reader() -> InMemoryReader {
        InMemoryReader::new()
            .add_source(
                "west.las",
                vec![Point::xyz(10.0, 10.0, 1.0), Point::xyz(90.0, 90.0, 2.0)],
            )
            .unwrap()
            .add_source(
                "east.las",
                vec![Point::xyz(110.0, 10.0, 3.0), Point::xyz(190.0, 90.0, 4.0)],
            )
            .unwrap()
    }

    #[test]
    fn test_read_within_one_source() {
        let reader = two_file_reader();
        let query = ReadQuery::new(BBox::new(0.0, 0.0, 50.0, 50.0).unwrap());
        let set = reader.read(&query).unwrap().unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.points()[0].x, 10.0);
    }

    #[test]
    fn test_read_stitches_across_sources() {
        let reader = two_file_reader();
        // Buffered region straddling the file boundary at x=100.
        let query = ReadQuery::new(BBox::new(80.0, 0.0, 120.0, 100.0).unwrap());
        let set = reader.read(&query).unwrap().unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_read_empty_region_is_none() {
        let reader = two_file_reader();
        let query = ReadQuery::new(BBox::new(-500.0, -500.0, -400.0, -400.0).unwrap());
        assert!(reader.read(&query).unwrap().is_none());
    }

    #[test]
    fn test_filter_pushdown() {
        let reader = InMemoryReader::new()
            .add_source(
                "a.las",
                vec![classified(1.0, 1.0, 2), classified(2.0, 2.0, 7)],
            )
            .unwrap();
        let query = ReadQuery::new(BBox::new(0.0, 0.0, 10.0, 10.0).unwrap())
            .with_filter("classification != 7");
        let set = reader.read(&query).unwrap().unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.points()[0].classification, Some(2));
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let reader = two_file_reader();
        let query =
            ReadQuery::new(BBox::new(0.0, 0.0, 200.0, 100.0).unwrap()).with_filter("z above 5");
        assert!(matches!(
            reader.read(&query),
            Err(ReaderError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_column_narrowing() {
        let reader = InMemoryReader::new()
            .add_source(
                "a.las",
                vec![Point {
                    intensity: Some(42.0),
                    classification: Some(2),
                    ..Point::xyz(1.0, 1.0, 1.0)
                }],
            )
            .unwrap();

        let bbox = BBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let xyz = reader.read(&ReadQuery::new(bbox)).unwrap().unwrap();
        assert!(xyz.points()[0].intensity.is_none());

        let named = reader
            .read(
                &ReadQuery::new(bbox)
                    .with_columns(ColumnSelection::Named(vec!["intensity".into()])),
            )
            .unwrap()
            .unwrap();
        assert_eq!(named.points()[0].intensity, Some(42.0));
        assert!(named.points()[0].classification.is_none());
    }

    #[test]
    fn test_catalog_from_sources() {
        let reader = two_file_reader();
        let catalog = reader.catalog().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.extent(),
            BBox::new(10.0, 10.0, 190.0, 90.0).unwrap()
        );
        assert_eq!(catalog.total_points(), 4);
    }

    #[test]
    fn test_empty_source_rejected() {
        assert!(InMemoryReader::new().add_source("empty.las", vec![]).is_err());
    }
}
