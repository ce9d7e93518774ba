//! Property-Based Tests
//!
//! Tests using property-based testing (proptest) to verify invariants:
//! - Grid cells partition the lattice whatever dividers are missing
//! - Partly inked dividers are kept and reported, at any line coordinates
//! - Segments closer than the merge tolerance become one line
//! - Cell text assignment is idempotent
//! - Markdown and JSON output read back to the same typed values

use docling_grid::infer::normalize;
use docling_grid::pipeline::{
    GridOutcome, Stage01LineConsolidator, Stage03Config, Stage03GridBuilder, Stage04CellAssigner,
    TableRegion,
};
use docling_grid::{
    parse_json_tables, parse_markdown_tables, AmbiguityReason, BBox, Cell, CharFragment, ColumnType,
    ColumnTypeProfile, ExtractedTable, GridLine, JsonSerializer, Lattice, LineSegment,
    MarkdownSerializer, Orientation, Table, TableStatus, TypedValue, DEFAULT_DATE_FORMATS,
};
use proptest::prelude::*;

const UNIT: f64 = 10.0;

/// A ruling line made of one segment per lattice unit it passes, drawn where
/// `drawn` is true. At least one unit is always drawn.
fn line_with_gaps(orientation: Orientation, coordinate: f64, drawn: &[bool]) -> GridLine {
    let mut segments: Vec<LineSegment> = drawn
        .iter()
        .enumerate()
        .filter(|(_, on)| **on)
        .map(|(unit, _)| unit_segment(orientation, coordinate, unit))
        .collect();
    if segments.is_empty() {
        segments.push(unit_segment(orientation, coordinate, 0));
    }
    GridLine::from_segments(orientation, segments)
}

fn unit_segment(orientation: Orientation, coordinate: f64, unit: usize) -> LineSegment {
    let (start, end) = (unit as f64 * UNIT, (unit + 1) as f64 * UNIT);
    match orientation {
        Orientation::Horizontal => LineSegment::horizontal(coordinate, start, end),
        Orientation::Vertical => LineSegment::vertical(coordinate, start, end),
    }
}

/// Region of `n_rows x n_cols` units with full outer lines and interior
/// dividers drawn per the masks.
fn region(n_rows: usize, n_cols: usize, h_mask: &[bool], v_mask: &[bool]) -> TableRegion {
    let horizontal = (0..=n_rows)
        .map(|r| {
            let drawn: Vec<bool> = (0..n_cols)
                .map(|c| r == 0 || r == n_rows || h_mask[(r * n_cols + c) % h_mask.len()])
                .collect();
            line_with_gaps(Orientation::Horizontal, r as f64 * UNIT, &drawn)
        })
        .collect();
    let vertical = (0..=n_cols)
        .map(|c| {
            let drawn: Vec<bool> = (0..n_rows)
                .map(|r| c == 0 || c == n_cols || v_mask[(c * n_rows + r) % v_mask.len()])
                .collect();
            line_with_gaps(Orientation::Vertical, c as f64 * UNIT, &drawn)
        })
        .collect();
    TableRegion {
        index: 0,
        horizontal,
        vertical,
        bbox: BBox::new(0.0, 0.0, n_cols as f64 * UNIT, n_rows as f64 * UNIT),
    }
}

// ============================================================================
// Grid Builder Properties
// ============================================================================

/// Property: cells cover every lattice unit exactly once
#[test]
fn proptest_cells_partition_lattice() {
    proptest!(|(
        n_rows in 1usize..6,
        n_cols in 1usize..6,
        h_mask in prop::collection::vec(any::<bool>(), 36),
        v_mask in prop::collection::vec(any::<bool>(), 36),
    )| {
        let region = region(n_rows, n_cols, &h_mask, &v_mask);
        let GridOutcome::Built(grid) = Stage03GridBuilder::new().process(&region) else {
            return Err(TestCaseError::fail("grid rejected"));
        };

        prop_assert_eq!(grid.lattice.unit_rows(), n_rows);
        prop_assert_eq!(grid.lattice.unit_cols(), n_cols);
        prop_assert!(grid.lattice.is_partitioned_by(&grid.cells));
        for cell in &grid.cells {
            prop_assert!(cell.row + cell.row_span <= n_rows);
            prop_assert!(cell.col + cell.col_span <= n_cols);
        }
    });
}

/// Property: a fully drawn grid has one cell per unit and no ambiguity
#[test]
fn proptest_full_grid_has_no_spans() {
    proptest!(|(n_rows in 1usize..8, n_cols in 1usize..8)| {
        let region = region(n_rows, n_cols, &[true], &[true]);
        let GridOutcome::Built(grid) = Stage03GridBuilder::new().process(&region) else {
            return Err(TestCaseError::fail("grid rejected"));
        };
        prop_assert_eq!(grid.cells.len(), n_rows * n_cols);
        prop_assert!(grid.cells.iter().all(|c| !c.is_spanning()));
        prop_assert!(grid.ambiguities.is_empty());
    });
}

/// Lattice boundaries: a random origin followed by random positive gaps.
fn boundaries(start: f64, gaps: &[f64]) -> Vec<f64> {
    std::iter::once(start)
        .chain(gaps.iter().scan(start, |at, gap| {
            *at += gap;
            Some(*at)
        }))
        .collect()
}

/// Inked fraction of one divider: clearly absent, partial or present.
fn ink_fraction(kind: u8, t: f64) -> f64 {
    match kind {
        0 => 0.05 * t,
        1 => 0.2 + 0.6 * t,
        _ => 0.95 + 0.05 * t,
    }
}

/// Line at `coordinate` inked over the first `fractions[i]` of each unit
/// `[stops[i], stops[i + 1]]`.
fn partly_inked_line(
    orientation: Orientation,
    coordinate: f64,
    stops: &[f64],
    fractions: &[f64],
) -> GridLine {
    let segments = stops
        .windows(2)
        .zip(fractions)
        .filter(|(_, fraction)| **fraction > 0.0)
        .map(|(unit, &fraction)| {
            let end = unit[0] + fraction * (unit[1] - unit[0]);
            match orientation {
                Orientation::Horizontal => LineSegment::horizontal(coordinate, unit[0], end),
                Orientation::Vertical => LineSegment::vertical(coordinate, unit[0], end),
            }
        })
        .collect();
    GridLine {
        orientation,
        coordinate,
        segments,
    }
}

/// Property: partial dividers never merge units and each one is reported
#[test]
fn proptest_partial_dividers_are_reported() {
    proptest!(|(
        origin in (0.0f64..300.0, 0.0f64..300.0),
        row_gaps in prop::collection::vec(4.0f64..25.0, 1..6),
        col_gaps in prop::collection::vec(4.0f64..25.0, 1..6),
        ink in prop::collection::vec((0u8..3, 0.0f64..1.0), 64),
    )| {
        let ys = boundaries(origin.1, &row_gaps);
        let xs = boundaries(origin.0, &col_gaps);
        let (n_rows, n_cols) = (row_gaps.len(), col_gaps.len());

        // fraction for unit `unit` of interior line `line`
        let h_frac = |line: usize, unit: usize| {
            let (kind, t) = ink[(line * 7 + unit) % ink.len()];
            ink_fraction(kind, t)
        };
        let v_frac = |line: usize, unit: usize| {
            let (kind, t) = ink[(line * 7 + unit + 31) % ink.len()];
            ink_fraction(kind, t)
        };

        let horizontal: Vec<GridLine> = ys
            .iter()
            .enumerate()
            .map(|(r, &y)| {
                let fractions: Vec<f64> = (0..n_cols)
                    .map(|c| if r == 0 || r == n_rows { 1.0 } else { h_frac(r, c) })
                    .collect();
                partly_inked_line(Orientation::Horizontal, y, &xs, &fractions)
            })
            .collect();
        let vertical: Vec<GridLine> = xs
            .iter()
            .enumerate()
            .map(|(c, &x)| {
                let fractions: Vec<f64> = (0..n_rows)
                    .map(|r| if c == 0 || c == n_cols { 1.0 } else { v_frac(c, r) })
                    .collect();
                partly_inked_line(Orientation::Vertical, x, &ys, &fractions)
            })
            .collect();
        let region = TableRegion {
            index: 0,
            horizontal,
            vertical,
            bbox: BBox::new(xs[0], ys[0], xs[n_cols], ys[n_rows]),
        };

        let builder = Stage03GridBuilder::with_config(Stage03Config {
            join_tolerance: 0.0,
            ..Stage03Config::default()
        });
        let GridOutcome::Built(grid) = builder.process(&region) else {
            return Err(TestCaseError::fail("grid rejected"));
        };
        prop_assert!(grid.lattice.is_partitioned_by(&grid.cells));

        let is_partial = |fraction: f64| fraction > 0.1 && fraction < 0.9;
        let expected_partial = (1..n_rows)
            .map(|r| (0..n_cols).filter(|&c| is_partial(h_frac(r, c))).count())
            .sum::<usize>()
            + (1..n_cols)
                .map(|c| (0..n_rows).filter(|&r| is_partial(v_frac(c, r))).count())
                .sum::<usize>();

        let cell_of = |row: usize, col: usize| {
            grid.cells.iter().position(|cell| {
                (cell.row..cell.row + cell.row_span).contains(&row)
                    && (cell.col..cell.col + cell.col_span).contains(&col)
            })
        };

        let mut reported = 0;
        for boundary in &grid.ambiguities {
            if boundary.reason != AmbiguityReason::PartialEvidence {
                continue;
            }
            reported += 1;
            let (fraction, neighbour) = match boundary.divider {
                Orientation::Vertical => (
                    v_frac(boundary.col + 1, boundary.row),
                    (boundary.row, boundary.col + 1),
                ),
                Orientation::Horizontal => (
                    h_frac(boundary.row + 1, boundary.col),
                    (boundary.row + 1, boundary.col),
                ),
            };
            prop_assert!((boundary.coverage - fraction).abs() < 1e-9);
            prop_assert!(is_partial(boundary.coverage));
            prop_assert_ne!(
                cell_of(boundary.row, boundary.col),
                cell_of(neighbour.0, neighbour.1)
            );
        }
        prop_assert_eq!(reported, expected_partial);
    });
}

// ============================================================================
// Line Consolidator Properties
// ============================================================================

/// Property: segments closer than the tolerance merge, farther ones do not
#[test]
fn proptest_merge_tolerance() {
    let consolidator = Stage01LineConsolidator::new();
    proptest!(|(
        y in 0.0f64..500.0,
        close in 0.0f64..2.7,
        far in 3.3f64..50.0,
    )| {
        let merged = [
            LineSegment::horizontal(y, 0.0, 100.0),
            LineSegment::horizontal(y + close, 0.0, 100.0),
        ];
        let (lines, _) = consolidator.consolidate(Orientation::Horizontal, &merged);
        prop_assert_eq!(lines.len(), 1);
        prop_assert!((lines[0].coordinate - (y + close / 2.0)).abs() < 1e-9);

        let apart = [
            LineSegment::horizontal(y, 0.0, 100.0),
            LineSegment::horizontal(y + far, 0.0, 100.0),
        ];
        let (lines, _) = consolidator.consolidate(Orientation::Horizontal, &apart);
        prop_assert_eq!(lines.len(), 2);
    });
}

// ============================================================================
// Cell Assigner Properties
// ============================================================================

/// Property: assigning the same fragments twice gives the same cells
#[test]
fn proptest_assignment_idempotent() {
    proptest!(|(
        fragments in prop::collection::vec(
            ("[a-z0-9]{1,6}", 0.0f64..40.0, 0.0f64..30.0),
            0..20,
        )
    )| {
        let lattice = Lattice::new(vec![0.0, 10.0, 20.0, 30.0], vec![0.0, 20.0, 40.0]);
        let cells: Vec<Cell> = (0..3)
            .flat_map(|r| (0..2).map(move |c| (r, c)))
            .map(|(r, c)| Cell::new(r, c, 1, 1, lattice.unit_bbox(r, c)))
            .collect();
        let fragments: Vec<CharFragment> = fragments
            .into_iter()
            .map(|(text, x, y)| CharFragment::new(text, x, y, x + 4.0, y + 3.0))
            .collect();

        let assigner = Stage04CellAssigner::new();
        let once = assigner.process(cells, &fragments);
        let twice = assigner.process(once.cells.clone(), &fragments);
        prop_assert_eq!(&once.cells, &twice.cells);
        prop_assert_eq!(&once.assigned_fragments, &twice.assigned_fragments);
    });
}

// ============================================================================
// Serializer Properties
// ============================================================================

fn value_strategy(column_type: ColumnType) -> BoxedStrategy<TypedValue> {
    let typed = match column_type {
        ColumnType::Integer => (-1_000_000_000i64..1_000_000_000)
            .prop_map(TypedValue::Integer)
            .boxed(),
        ColumnType::Decimal => (-1.0e6f64..1.0e6).prop_map(TypedValue::Decimal).boxed(),
        ColumnType::Percentage => (-5.0f64..5.0).prop_map(TypedValue::Percentage).boxed(),
        ColumnType::Currency => (
            0.0f64..1.0e6,
            prop::sample::select(vec![Some("$"), Some("€"), Some("EUR"), None]),
        )
            .prop_map(|(amount, symbol)| TypedValue::Currency {
                amount,
                symbol: symbol.map(String::from),
            })
            .boxed(),
        ColumnType::Date => (1900i32..2100, 1u32..13, 1u32..29)
            .prop_map(|(y, m, d)| {
                TypedValue::Date(chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap())
            })
            .boxed(),
        ColumnType::String => "[A-Za-z|][A-Za-z |]{0,10}[A-Za-z]"
            .prop_map(|s| TypedValue::Text(s.split_whitespace().collect::<Vec<_>>().join(" ")))
            .boxed(),
    };
    prop_oneof![4 => typed, 1 => Just(TypedValue::Empty)].boxed()
}

fn table_strategy() -> impl Strategy<Value = ExtractedTable> {
    prop::collection::vec(prop::sample::select(ColumnType::ALL.to_vec()), 1..5)
        .prop_flat_map(|types| {
            let row = types
                .iter()
                .map(|&t| value_strategy(t))
                .collect::<Vec<_>>();
            (Just(types), prop::collection::vec(row, 1..6))
        })
        .prop_map(|(types, rows)| ExtractedTable {
            page_number: 1,
            table_index: 1,
            bbox: BBox::new(0.0, 0.0, 100.0, 100.0),
            status: TableStatus::Complete,
            table: Table {
                headers: (0..types.len()).map(|c| format!("col{c}")).collect(),
                header_detected: true,
                profiles: types
                    .iter()
                    .map(|&t| ColumnTypeProfile::new(t, 1, 1))
                    .collect(),
                rows,
                cells: Vec::new(),
            },
        })
}

fn values_match(read: &[Vec<TypedValue>], original: &[Vec<TypedValue>]) -> bool {
    read.len() == original.len()
        && read.iter().zip(original).all(|(a, b)| {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.approx_eq(y, 1e-6))
        })
}

/// Property: Markdown read back and re-normalized gives the same values
#[test]
fn proptest_markdown_round_trip() {
    let date_formats: Vec<String> = DEFAULT_DATE_FORMATS.iter().map(ToString::to_string).collect();
    proptest!(|(extracted in table_strategy())| {
        let markdown = MarkdownSerializer::new().serialize_tables(std::slice::from_ref(&extracted));
        let parsed = parse_markdown_tables(&markdown);
        prop_assert_eq!(parsed.len(), 1);
        prop_assert_eq!(&parsed[0].headers, &extracted.table.headers);

        let types = extracted.table.column_types();
        let read: Vec<Vec<TypedValue>> = parsed[0]
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&types)
                    .map(|(text, &t)| normalize(text, t, &date_formats))
                    .collect()
            })
            .collect();
        prop_assert!(values_match(&read, &extracted.table.rows), "{}", markdown);
    });
}

/// Property: JSON read back gives the same headers, types and values
#[test]
fn proptest_json_round_trip() {
    proptest!(|(extracted in table_strategy())| {
        let json = JsonSerializer::new()
            .serialize_tables(std::slice::from_ref(&extracted))
            .unwrap();
        let parsed = parse_json_tables(&json).unwrap();
        prop_assert_eq!(parsed.len(), 1);
        prop_assert_eq!(&parsed[0].headers, &extracted.table.headers);
        prop_assert_eq!(&parsed[0].types, &extracted.table.column_types());
        prop_assert!(values_match(&parsed[0].rows, &extracted.table.rows), "{}", json);
    });
}
