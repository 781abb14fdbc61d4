//! Export header parsing.
//!
//! The exporting tool writes a fixed block of header lines before the
//! numeric body.  Two conventions exist and are selected explicitly through
//! [`ExportLayout`]; a file is never parsed with a mix of both.
//!
//! | Layout | Lines | Marker names | Axis labels |
//! |---|---|---|---|
//! | [`ExportLayout::Grouped`] | 4 | line 2, every third non-empty token | implied `X, Y, Z` per marker (optional `ITEM` row after the header is checked) |
//! | [`ExportLayout::Tagged`]  | 5 | line 2, one per column | line 5, one per column (`ITEM` dropped) |
//!
//! In the tagged layout line 1 carries a per-column origin tag naming the
//! recording each column was exported from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use trcbridge_types::{Axis, MarkerName};

/// Label of the frame column in the exporter's axis row.
pub const ITEM_LABEL: &str = "ITEM";

// ────────────────────────────────────────────────────────────────────────────
// Layout
// ────────────────────────────────────────────────────────────────────────────

/// Header convention of an export file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportLayout {
    /// Four header lines; each marker owns three consecutive X, Y, Z columns.
    #[default]
    Grouped,
    /// Five header lines with per-column origin, marker and axis labels.
    Tagged,
}

impl ExportLayout {
    /// Number of header lines preceding the data (or the `ITEM` row).
    pub fn header_lines(self) -> usize {
        match self {
            ExportLayout::Grouped => 4,
            ExportLayout::Tagged => 5,
        }
    }
}

impl fmt::Display for ExportLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportLayout::Grouped => write!(f, "grouped"),
            ExportLayout::Tagged => write!(f, "tagged"),
        }
    }
}

impl FromStr for ExportLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grouped" => Ok(ExportLayout::Grouped),
            "tagged" => Ok(ExportLayout::Tagged),
            other => Err(format!("unknown export layout {other:?} (expected grouped or tagged)")),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Malformed header block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("found {found} marker label tokens; expected a multiple of three (one per X, Y, Z column)")]
    MarkerLabels { found: usize },

    #[error("{markers} marker label tokens do not match {axes} axis labels")]
    LabelCountMismatch { markers: usize, axes: usize },

    #[error("column {column} has axis label {label:?}; expected {expected}")]
    UnexpectedAxisLabel {
        column: usize,
        label: String,
        expected: String,
    },

    #[error("marker {marker} has no {axis} column")]
    IncompleteMarker { marker: MarkerName, axis: Axis },

    #[error("column {column} appears more than once")]
    DuplicateColumn { column: String },

    #[error("no column was exported from origin {origin:?} (available: {available:?})")]
    UnknownOrigin {
        origin: String,
        available: Vec<String>,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// ExportHeader
// ────────────────────────────────────────────────────────────────────────────

/// Where one marker's X, Y and Z values sit inside a data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerColumns {
    pub name: MarkerName,
    pub origin: Option<String>,
    /// Field index of the X, Y and Z value (field 0 is the frame).
    pub fields: [usize; 3],
}

/// Parsed header: the expected row width and the placement of every marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportHeader {
    pub layout: ExportLayout,
    width: usize,
    markers: Vec<MarkerColumns>,
}

/// One labelled data column before grouping into markers.
#[derive(Debug, Clone)]
struct ColumnLabel {
    field: usize,
    marker: String,
    axis: Axis,
    origin: Option<String>,
}

impl ExportHeader {
    /// Parse the header block of `layout` from `lines`.
    ///
    /// `origin` selects the columns of one recording in a tagged export; it
    /// is ignored when no column carries an origin tag.
    pub fn parse(
        layout: ExportLayout,
        lines: &[String],
        origin: Option<&str>,
    ) -> Result<Self, HeaderError> {
        let (width, mut labels) = match layout {
            ExportLayout::Grouped => grouped_labels(lines)?,
            ExportLayout::Tagged => tagged_labels(lines)?,
        };

        if let Some(wanted) = origin {
            let mut available: Vec<String> =
                labels.iter().filter_map(|c| c.origin.clone()).collect();
            available.sort();
            available.dedup();
            if available.is_empty() {
                debug!(origin = wanted, "export carries no origin tags; origin filter ignored");
            } else {
                labels.retain(|c| c.origin.as_deref() == Some(wanted));
                if labels.is_empty() {
                    return Err(HeaderError::UnknownOrigin {
                        origin: wanted.to_string(),
                        available,
                    });
                }
            }
        }

        let markers = group_columns(labels)?;
        debug!(
            layout = %layout,
            markers = markers.len(),
            width,
            "parsed export header"
        );
        Ok(Self {
            layout,
            width,
            markers,
        })
    }

    /// Number of fields in every data row, frame column included.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn markers(&self) -> &[MarkerColumns] {
        &self.markers
    }

    /// Name of the column stored at `field`, for error messages.
    pub fn field_name(&self, field: usize) -> String {
        if field == 0 {
            return "Frame".to_string();
        }
        self.markers
            .iter()
            .find_map(|m| {
                Axis::ALL
                    .iter()
                    .find(|axis| m.fields[axis.index()] == field)
                    .map(|axis| m.name.column_name(*axis))
            })
            .unwrap_or_else(|| format!("column {}", field + 1))
    }

    /// Validate the `ITEM  X  Y  Z …` row some grouped exports emit after
    /// the header block.
    pub fn check_axis_row(&self, line: &str) -> Result<(), HeaderError> {
        let labels: Vec<&str> = split_fields(line)
            .into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty() && *t != ITEM_LABEL)
            .collect();

        let expected = self.width.saturating_sub(1);
        if labels.len() != expected {
            return Err(HeaderError::LabelCountMismatch {
                markers: expected,
                axes: labels.len(),
            });
        }
        for (i, label) in labels.iter().enumerate() {
            let want = Axis::ALL[i % 3];
            if label.parse::<Axis>().ok() != Some(want) {
                return Err(HeaderError::UnexpectedAxisLabel {
                    column: i + 2,
                    label: label.to_string(),
                    expected: want.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// True when `line` is the exporter's axis label row.
pub fn is_axis_row(line: &str) -> bool {
    split_fields(line)
        .first()
        .is_some_and(|first| first.trim() == ITEM_LABEL)
}

pub(crate) fn split_fields(line: &str) -> Vec<&str> {
    line.trim_end_matches(['\r', '\n']).split('\t').collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Layout-specific label extraction
// ────────────────────────────────────────────────────────────────────────────

fn grouped_labels(lines: &[String]) -> Result<(usize, Vec<ColumnLabel>), HeaderError> {
    let tokens: Vec<&str> = lines
        .get(1)
        .map(|l| split_fields(l))
        .unwrap_or_default()
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.len() % 3 != 0 {
        return Err(HeaderError::MarkerLabels { found: tokens.len() });
    }

    let mut labels = Vec::with_capacity(tokens.len());
    for (i, group) in tokens.chunks(3).enumerate() {
        let name = group[0];
        if group.iter().any(|t| *t != name) {
            warn!(
                marker = name,
                labels = ?group,
                "marker label differs across its three columns; using the first"
            );
        }
        for axis in Axis::ALL {
            labels.push(ColumnLabel {
                field: 1 + 3 * i + axis.index(),
                marker: name.to_string(),
                axis,
                origin: None,
            });
        }
    }
    Ok((1 + tokens.len(), labels))
}

fn tagged_labels(lines: &[String]) -> Result<(usize, Vec<ColumnLabel>), HeaderError> {
    let field_line = |i: usize| lines.get(i).map(|l| split_fields(l)).unwrap_or_default();
    let origins = field_line(0);
    let names = field_line(1);
    let axes = field_line(4);

    let positions: Vec<usize> = axes
        .iter()
        .enumerate()
        .filter(|(_, t)| {
            let t = t.trim();
            !t.is_empty() && t != ITEM_LABEL
        })
        .map(|(j, _)| j)
        .collect();
    let name_count = names.iter().filter(|t| !t.trim().is_empty()).count();
    let axis_count = positions.len();
    let width = positions.last().map_or(1, |j| j + 1);

    if name_count != axis_count {
        return Err(HeaderError::LabelCountMismatch {
            markers: name_count,
            axes: positions.len(),
        });
    }

    let mut labels = Vec::with_capacity(positions.len());
    for j in positions {
        let marker = names.get(j).map(|t| t.trim()).unwrap_or_default();
        if marker.is_empty() {
            // Counts agree but the labels are shifted against each other.
            return Err(HeaderError::LabelCountMismatch {
                markers: name_count,
                axes: axis_count,
            });
        }
        let raw_axis = axes[j].trim();
        let axis = raw_axis
            .parse::<Axis>()
            .map_err(|_| HeaderError::UnexpectedAxisLabel {
                column: j + 1,
                label: raw_axis.to_string(),
                expected: "X, Y or Z".to_string(),
            })?;
        let origin = origins
            .get(j)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        labels.push(ColumnLabel {
            field: j,
            marker: marker.to_string(),
            axis,
            origin,
        });
    }

    Ok((width, labels))
}

/// Group labelled columns into markers, in order of first appearance.
fn group_columns(labels: Vec<ColumnLabel>) -> Result<Vec<MarkerColumns>, HeaderError> {
    let mut groups: Vec<(MarkerName, Option<String>, [Option<usize>; 3])> = Vec::new();

    for label in labels {
        let name = MarkerName::new(label.marker);
        let idx = match groups.iter().position(|(n, _, _)| *n == name) {
            Some(idx) => idx,
            None => {
                groups.push((name.clone(), label.origin.clone(), [None; 3]));
                groups.len() - 1
            }
        };
        let slot = &mut groups[idx].2[label.axis.index()];
        if slot.is_some() {
            return Err(HeaderError::DuplicateColumn {
                column: name.column_name(label.axis),
            });
        }
        *slot = Some(label.field);
    }

    groups
        .into_iter()
        .map(|(name, origin, fields)| {
            let mut resolved = [0usize; 3];
            for axis in Axis::ALL {
                resolved[axis.index()] =
                    fields[axis.index()].ok_or_else(|| HeaderError::IncompleteMarker {
                        marker: name.clone(),
                        axis,
                    })?;
            }
            Ok(MarkerColumns {
                name,
                origin,
                fields: resolved,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn grouped_block(names: &str) -> Vec<String> {
        lines(&["\ts1.c3d\ts1.c3d\ts1.c3d", names, "\tLANDMARK\tLANDMARK\tLANDMARK", "\tPROCESSED\tPROCESSED\tPROCESSED"])
    }

    #[test]
    fn layout_header_line_counts() {
        assert_eq!(ExportLayout::Grouped.header_lines(), 4);
        assert_eq!(ExportLayout::Tagged.header_lines(), 5);
    }

    #[test]
    fn layout_parses_from_str() {
        assert_eq!("Tagged".parse::<ExportLayout>().unwrap(), ExportLayout::Tagged);
        assert!("wide".parse::<ExportLayout>().is_err());
    }

    #[test]
    fn grouped_takes_every_third_token() {
        let block = grouped_block("\tLASIS\tLASIS\tLASIS\tRASIS\tRASIS\tRASIS");
        let header = ExportHeader::parse(ExportLayout::Grouped, &block, None).unwrap();
        assert_eq!(header.width(), 7);
        let names: Vec<&str> = header.markers().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["LASIS", "RASIS"]);
        assert_eq!(header.markers()[0].fields, [1, 2, 3]);
        assert_eq!(header.markers()[1].fields, [4, 5, 6]);
        assert_eq!(header.field_name(5), "RASIS_Y");
    }

    #[test]
    fn grouped_rejects_partial_marker_labels() {
        let block = grouped_block("\tLASIS\tLASIS\tLASIS\tRASIS");
        let err = ExportHeader::parse(ExportLayout::Grouped, &block, None).unwrap_err();
        assert_eq!(err, HeaderError::MarkerLabels { found: 4 });
    }

    #[test]
    fn grouped_rejects_repeated_marker() {
        let block = grouped_block("\tLASIS\tLASIS\tLASIS\tLASIS\tLASIS\tLASIS");
        let err = ExportHeader::parse(ExportLayout::Grouped, &block, None).unwrap_err();
        assert_eq!(err, HeaderError::DuplicateColumn { column: "LASIS_X".to_string() });
    }

    #[test]
    fn axis_row_is_checked_against_markers() {
        let block = grouped_block("\tLASIS\tLASIS\tLASIS");
        let header = ExportHeader::parse(ExportLayout::Grouped, &block, None).unwrap();

        assert!(is_axis_row("ITEM\tX\tY\tZ"));
        assert!(!is_axis_row("1\t0.1\t0.2\t0.3"));
        assert!(header.check_axis_row("ITEM\tX\tY\tZ\r\n").is_ok());
        assert_eq!(
            header.check_axis_row("ITEM\tX\tY").unwrap_err(),
            HeaderError::LabelCountMismatch { markers: 3, axes: 2 }
        );
        assert!(matches!(
            header.check_axis_row("ITEM\tX\tZ\tY").unwrap_err(),
            HeaderError::UnexpectedAxisLabel { column: 3, .. }
        ));
    }

    fn tagged_block() -> Vec<String> {
        lines(&[
            "\twalk.c3d\twalk.c3d\twalk.c3d\twalk.c3d\twalk.c3d\twalk.c3d",
            "\tLASIS\tLASIS\tLASIS\tRHEE\tRHEE\tRHEE",
            "\tTARGET\tTARGET\tTARGET\tTARGET\tTARGET\tTARGET",
            "\tPROCESSED\tPROCESSED\tPROCESSED\tPROCESSED\tPROCESSED\tPROCESSED",
            "ITEM\tX\tY\tZ\tZ\tX\tY",
        ])
    }

    #[test]
    fn tagged_locates_axes_by_label() {
        let header = ExportHeader::parse(ExportLayout::Tagged, &tagged_block(), None).unwrap();
        assert_eq!(header.width(), 7);
        let rhee = &header.markers()[1];
        assert_eq!(rhee.name.as_str(), "RHEE");
        assert_eq!(rhee.origin.as_deref(), Some("walk.c3d"));
        // X is column 5, Y column 6, Z column 4.
        assert_eq!(rhee.fields, [5, 6, 4]);
        assert_eq!(header.field_name(4), "RHEE_Z");
        assert_eq!(header.field_name(0), "Frame");
    }

    #[test]
    fn tagged_rejects_count_mismatch() {
        let mut block = tagged_block();
        block[4] = "ITEM\tX\tY\tZ\tZ\tX".to_string();
        let err = ExportHeader::parse(ExportLayout::Tagged, &block, None).unwrap_err();
        assert_eq!(err, HeaderError::LabelCountMismatch { markers: 6, axes: 5 });
    }

    #[test]
    fn tagged_rejects_repeated_axis() {
        let mut block = tagged_block();
        block[4] = "ITEM\tX\tY\tZ\tZ\tX\tX".to_string();
        let err = ExportHeader::parse(ExportLayout::Tagged, &block, None).unwrap_err();
        assert_eq!(err, HeaderError::DuplicateColumn { column: "RHEE_X".to_string() });
    }

    #[test]
    fn tagged_rejects_marker_without_all_axes() {
        let mut block = tagged_block();
        block[1] = "\tLASIS\tLASIS\tLASIS\tRHEE\tRHEE".to_string();
        block[4] = "ITEM\tX\tY\tZ\tX\tY".to_string();
        let err = ExportHeader::parse(ExportLayout::Tagged, &block, None).unwrap_err();
        assert_eq!(
            err,
            HeaderError::IncompleteMarker { marker: MarkerName::from("RHEE"), axis: Axis::Z }
        );
    }

    #[test]
    fn tagged_width_ignores_trailing_tab() {
        let mut block = tagged_block();
        block[4].push('\t');
        let header = ExportHeader::parse(ExportLayout::Tagged, &block, None).unwrap();
        assert_eq!(header.width(), 7);
    }

    #[test]
    fn tagged_origin_filter_selects_one_recording() {
        let block = lines(&[
            "\ta.c3d\ta.c3d\ta.c3d\tb.c3d\tb.c3d\tb.c3d",
            "\tLASIS\tLASIS\tLASIS\tLASIS\tLASIS\tLASIS",
            "",
            "",
            "ITEM\tX\tY\tZ\tX\tY\tZ",
        ]);
        // Without a filter the same marker appears twice.
        assert!(ExportHeader::parse(ExportLayout::Tagged, &block, None).is_err());

        let header = ExportHeader::parse(ExportLayout::Tagged, &block, Some("b.c3d")).unwrap();
        assert_eq!(header.markers().len(), 1);
        assert_eq!(header.markers()[0].fields, [4, 5, 6]);
        // Row width still covers every column in the file.
        assert_eq!(header.width(), 7);

        let err = ExportHeader::parse(ExportLayout::Tagged, &block, Some("c.c3d")).unwrap_err();
        assert!(matches!(err, HeaderError::UnknownOrigin { .. }));
    }

    #[test]
    fn origin_filter_is_ignored_without_tags() {
        let block = grouped_block("\tLASIS\tLASIS\tLASIS");
        let header = ExportHeader::parse(ExportLayout::Grouped, &block, Some("walk.c3d")).unwrap();
        assert_eq!(header.markers().len(), 1);
    }
}
