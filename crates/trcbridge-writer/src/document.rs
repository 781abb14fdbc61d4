//! In-memory TRC layout.
//!
//! ```text
//! PathFileType  4  (X/Y/Z)  {path}
//! DataRate  CameraRate  NumFrames  NumMarkers  Units  OrigDataRate  OrigDataStartFrame  OrigNumFrames
//! {rate}  {rate}  {frames}  {markers}  {units}  {rate}  {start}  {frames}
//! Frame#  Time  {m1}        {m2} …
//!         X1  Y1  Z1  X2  Y2  Z2 …
//! {frame}  {time}  {x}  {y}  {z} …
//! ```
//!
//! Fields are tab-separated.  The two marker header rows drop trailing tabs;
//! data rows keep every field so blank markers stay aligned.

use std::fmt;
use std::io::{self, Write};

use trcbridge_transform::InterpolationError;
use trcbridge_transform::gap_fill::ensure_complete;
use trcbridge_types::{Frame, MarkerName, TrajectoryTable};

use crate::options::{AxisLabelStyle, TrcOptions};

/// Coordinates of one output marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerColumn {
    pub name: MarkerName,
    /// One `[x, y, z]` per frame, or `None` for a blank marker.
    pub values: Option<Vec<[f64; 3]>>,
}

/// A fully conditioned TRC file, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct TrcDocument {
    /// Path written on the `PathFileType` line.
    pub path_label: String,
    pub frame_rate: f64,
    pub units: String,
    pub frames: Vec<Frame>,
    pub markers: Vec<MarkerColumn>,
    pub axis_labels: AxisLabelStyle,
    pub time_precision: usize,
    pub coordinate_precision: usize,
}

impl TrcDocument {
    /// Lay out an already conditioned table.
    ///
    /// Tracks without any value become blank markers; every other track must
    /// be complete.
    pub fn build(
        table: &TrajectoryTable,
        options: &TrcOptions,
        path_label: impl Into<String>,
    ) -> Result<Self, InterpolationError> {
        let frames = table.frames().to_vec();
        let mut markers = Vec::with_capacity(table.markers().len());
        for track in table.markers() {
            let values = if track.has_any_value() {
                ensure_complete(&frames, track)?;
                Some(
                    (0..track.len())
                        .filter_map(|row| track.sample(row).complete())
                        .collect(),
                )
            } else {
                None
            };
            markers.push(MarkerColumn {
                name: track.name.clone(),
                values,
            });
        }

        Ok(Self {
            path_label: path_label.into(),
            frame_rate: options.frame_rate,
            units: options.output_unit.symbol().to_string(),
            frames,
            markers,
            axis_labels: options.axis_labels,
            time_precision: options.time_precision,
            coordinate_precision: options.coordinate_precision,
        })
    }

    /// Markers written with blank coordinate fields.
    pub fn blank_markers(&self) -> Vec<MarkerName> {
        self.markers
            .iter()
            .filter(|m| m.values.is_none())
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn start_frame(&self) -> Frame {
        self.frames.first().copied().unwrap_or_default()
    }

    /// Render the whole file as a string.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Stream the file to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "{self}")
    }
}

impl fmt::Display for TrcDocument {
    fn fmt(&self, w: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rate = self.frame_rate;
        let n_frames = self.frames.len();

        writeln!(w, "PathFileType\t4\t(X/Y/Z)\t{}", self.path_label)?;
        writeln!(
            w,
            "DataRate\tCameraRate\tNumFrames\tNumMarkers\tUnits\tOrigDataRate\tOrigDataStartFrame\tOrigNumFrames"
        )?;
        writeln!(
            w,
            "{rate}\t{rate}\t{n_frames}\t{}\t{}\t{rate}\t{}\t{n_frames}",
            self.markers.len(),
            self.units,
            self.start_frame(),
        )?;

        let mut names = vec!["Frame#".to_string(), "Time".to_string()];
        let mut labels = vec![String::new(), String::new()];
        for (position, marker) in self.markers.iter().enumerate() {
            names.extend([marker.name.to_string(), String::new(), String::new()]);
            labels.extend(self.axis_labels.labels(position, marker.name.as_str()));
        }
        writeln!(w, "{}", names.join("\t").trim_end_matches('\t'))?;
        writeln!(w, "{}", labels.join("\t").trim_end_matches('\t'))?;

        let time_prec = self.time_precision;
        let coord_prec = self.coordinate_precision;
        for (row, frame) in self.frames.iter().enumerate() {
            let time = f64::from(*frame) / rate;
            let mut line = format!("{frame}\t{time:.time_prec$}");
            for marker in &self.markers {
                match marker.values.as_ref().and_then(|v| v.get(row)) {
                    Some(xyz) => {
                        for v in xyz {
                            line.push('\t');
                            line.push_str(&fixed(*v, coord_prec));
                        }
                    }
                    None => line.push_str("\t\t\t"),
                }
            }
            writeln!(w, "{line}")?;
        }
        Ok(())
    }
}

/// `v` with `precision` decimals; anything that rounds to zero prints
/// unsigned (`-0.0` and `-1e-9` both become `0.000`).
fn fixed(v: f64, precision: usize) -> String {
    let text = format!("{v:.precision$}");
    match text.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trcbridge_types::MarkerTrack;

    fn doc(markers: Vec<MarkerColumn>) -> TrcDocument {
        TrcDocument {
            path_label: "out/s1.trc".to_string(),
            frame_rate: 100.0,
            units: "mm".to_string(),
            frames: vec![1, 2],
            markers,
            axis_labels: AxisLabelStyle::Indexed,
            time_precision: 4,
            coordinate_precision: 6,
        }
    }

    #[test]
    fn renders_fixed_header() {
        let text = doc(vec![MarkerColumn {
            name: MarkerName::from("LASIS"),
            values: Some(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]),
        }])
        .render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "PathFileType\t4\t(X/Y/Z)\tout/s1.trc");
        assert_eq!(
            lines[1],
            "DataRate\tCameraRate\tNumFrames\tNumMarkers\tUnits\tOrigDataRate\tOrigDataStartFrame\tOrigNumFrames"
        );
        assert_eq!(lines[2], "100\t100\t2\t1\tmm\t100\t1\t2");
        assert_eq!(lines[3], "Frame#\tTime\tLASIS");
        assert_eq!(lines[4], "\t\tX1\tY1\tZ1");
        assert_eq!(lines[5], "1\t0.0100\t1.000000\t2.000000\t3.000000");
        assert_eq!(lines[6], "2\t0.0200\t4.000000\t5.000000\t6.000000");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn marker_names_span_three_slots() {
        let text = doc(vec![
            MarkerColumn { name: MarkerName::from("A"), values: Some(vec![[0.0; 3]; 2]) },
            MarkerColumn { name: MarkerName::from("B"), values: Some(vec![[0.0; 3]; 2]) },
        ])
        .render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[3], "Frame#\tTime\tA\t\t\tB");
        assert_eq!(lines[4], "\t\tX1\tY1\tZ1\tX2\tY2\tZ2");
    }

    #[test]
    fn blank_marker_keeps_empty_fields() {
        let text = doc(vec![
            MarkerColumn { name: MarkerName::from("GHOST"), values: None },
            MarkerColumn { name: MarkerName::from("B"), values: Some(vec![[1.0; 3]; 2]) },
        ])
        .render();
        let row = text.lines().nth(5).unwrap();
        assert_eq!(row, "1\t0.0100\t\t\t\t1.000000\t1.000000\t1.000000");
        assert!(!row.contains("0.000000"));
    }

    #[test]
    fn fixed_drops_sign_only_for_rounded_zero() {
        assert_eq!(fixed(-1e-7, 6), "0.000000");
        assert_eq!(fixed(-0.0, 2), "0.00");
        assert_eq!(fixed(-0.000002, 6), "-0.000002");
        assert_eq!(fixed(-3000.0, 1), "-3000.0");
        assert_eq!(fixed(-0.4, 0), "0");
    }

    #[test]
    fn tiny_negative_prints_unsigned() {
        let text = doc(vec![MarkerColumn {
            name: MarkerName::from("A"),
            values: Some(vec![[-1e-7, 2.0, -4e-9]; 2]),
        }])
        .render();
        assert_eq!(text.lines().nth(5), Some("1\t0.0100\t0.000000\t2.000000\t0.000000"));
    }

    #[test]
    fn write_to_matches_render() {
        let d = doc(vec![MarkerColumn {
            name: MarkerName::from("A"),
            values: Some(vec![[1.0, 2.0, 3.0]; 2]),
        }]);
        let mut bytes = Vec::new();
        d.write_to(&mut bytes).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), d.render());
    }

    #[test]
    fn negative_zero_prints_unsigned() {
        let text = doc(vec![MarkerColumn {
            name: MarkerName::from("A"),
            values: Some(vec![[-0.0, 0.0, -0.0]; 2]),
        }])
        .render();
        assert!(!text.contains("-0.000000"));
    }

    #[test]
    fn build_rejects_incomplete_track() {
        let track = MarkerTrack::new(
            MarkerName::from("LASIS"),
            None,
            [vec![Some(1.0), None], vec![Some(1.0), Some(1.0)], vec![Some(1.0), Some(1.0)]],
        );
        let table = TrajectoryTable::new(vec![0, 1], vec![track]).unwrap();
        let err = TrcDocument::build(&table, &TrcOptions::default(), "x.trc").unwrap_err();
        assert!(matches!(err, InterpolationError::Unresolved { frame: 1, .. }));
    }

    #[test]
    fn build_marks_empty_tracks_blank() {
        let lasis = MarkerTrack::new(
            MarkerName::from("LASIS"),
            None,
            [vec![Some(1.0)], vec![Some(2.0)], vec![Some(3.0)]],
        );
        let ghost = MarkerTrack::empty(MarkerName::from("GHOST"), None, 1);
        let table = TrajectoryTable::new(vec![7], vec![lasis, ghost]).unwrap();
        let options = TrcOptions {
            axis_labels: AxisLabelStyle::Plain,
            ..TrcOptions::default()
        };

        let doc = TrcDocument::build(&table, &options, "x.trc").unwrap();
        assert_eq!(doc.blank_markers(), [MarkerName::from("GHOST")]);
        assert_eq!(doc.start_frame(), 7);
        assert_eq!(doc.units, "mm");
        let text = doc.render();
        assert_eq!(text.lines().nth(4), Some("\t\tX\tY\tZ\tX\tY\tZ"));
        assert_eq!(text.lines().nth(5), Some("7\t0.0700\t1.000000\t2.000000\t3.000000\t\t\t"));
    }

    #[test]
    fn fractional_rate_and_precision() {
        let mut d = doc(vec![]);
        d.frame_rate = 120.0;
        d.frames = vec![3];
        d.time_precision = 6;
        let text = d.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[2], "120\t120\t1\t0\tmm\t120\t3\t1");
        assert_eq!(lines[5], "3\t0.025000");
    }
}
