//! Output monitor: draws the latest telemetry frame as a line trace

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// One frame of the monitored signal, values normalised to [-1, 1].
/// Replaced wholesale on every pull; no history is kept.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TelemetrySample(Vec<f32>);

impl TelemetrySample {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode a JSON array of numbers
    pub fn decode(value: &Value) -> Result<TelemetrySample, String> {
        let items = value
            .as_array()
            .ok_or_else(|| "Telemetry update must be an array".to_string())?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_f64()
                    .map(|v| v as f32)
                    .ok_or_else(|| format!("Telemetry value {} is not a number: {}", i, item))
            })
            .collect::<Result<Vec<_>, String>>()
            .map(TelemetrySample)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const BACKGROUND: Rgb = Rgb(0, 0, 0);
pub const CENTERLINE: Rgb = Rgb(255, 255, 255);
pub const TRACE: Rgb = Rgb(0, 255, 0);

/// Minimal 2D drawing target. Coordinates are pixels with y growing down.
pub trait Surface {
    fn size(&self) -> (f32, f32);
    fn clear(&mut self);
    fn fill(&mut self, color: Rgb);
    fn line(&mut self, from: Point, to: Point, color: Rgb);
    fn polyline(&mut self, points: &[Point], color: Rgb);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Clear,
    Fill { color: Rgb },
    Line { from: Point, to: Point, color: Rgb },
    Polyline { points: Vec<Point>, color: Rgb },
}

/// Surface that records one frame of draw operations for whoever paints them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayList {
    width: f32,
    height: f32,
    ops: Vec<DrawOp>,
}

impl DisplayList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }
}

impl Surface for DisplayList {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear);
    }

    fn fill(&mut self, color: Rgb) {
        self.ops.push(DrawOp::Fill { color });
    }

    fn line(&mut self, from: Point, to: Point, color: Rgb) {
        self.ops.push(DrawOp::Line { from, to, color });
    }

    fn polyline(&mut self, points: &[Point], color: Rgb) {
        self.ops.push(DrawOp::Polyline {
            points: points.to_vec(),
            color,
        });
    }
}

/// Map sample index to x and value to y. +1 lands on the top edge, -1 on
/// the bottom edge.
pub fn trace_points(sample: &TelemetrySample, width: f32, height: f32) -> Vec<Point> {
    if sample.is_empty() {
        return Vec::new();
    }

    let step = width / sample.len() as f32;
    sample
        .values()
        .iter()
        .enumerate()
        .map(|(i, &v)| Point {
            x: i as f32 * step,
            y: (((-v + 1.0) / 2.0) * height).floor(),
        })
        .collect()
}

/// Redraws the trace whenever a different sample is handed in
#[derive(Default)]
pub struct Monitor {
    last: Option<Arc<TelemetrySample>>,
    redraws: u64,
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw one full frame: background, centerline, then the trace
    pub fn draw(sample: &TelemetrySample, surface: &mut impl Surface) {
        let (width, height) = surface.size();

        surface.clear();
        surface.fill(BACKGROUND);
        surface.line(
            Point { x: 0.0, y: height / 2.0 },
            Point { x: width, y: height / 2.0 },
            CENTERLINE,
        );

        let points = trace_points(sample, width, height);
        if !points.is_empty() {
            surface.polyline(&points, TRACE);
        }
    }

    /// Redraw if `sample` is not the one drawn last. Returns whether it drew.
    pub fn sync(&mut self, sample: &Arc<TelemetrySample>, surface: &mut impl Surface) -> bool {
        if let Some(last) = &self.last {
            if Arc::ptr_eq(last, sample) {
                return false;
            }
        }

        Self::draw(sample, surface);
        self.last = Some(sample.clone());
        self.redraws += 1;
        true
    }

    pub fn redraw_count(&self) -> u64 {
        self.redraws
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_sample_draws_background_and_centerline() {
        let mut surface = DisplayList::new(400.0, 100.0);
        Monitor::draw(&TelemetrySample::default(), &mut surface);
        assert_eq!(
            surface.ops(),
            &[
                DrawOp::Clear,
                DrawOp::Fill { color: BACKGROUND },
                DrawOp::Line {
                    from: Point { x: 0.0, y: 50.0 },
                    to: Point { x: 400.0, y: 50.0 },
                    color: CENTERLINE,
                },
            ]
        );
    }

    #[test]
    fn test_value_mapping() {
        let sample = TelemetrySample::new(vec![1.0, 0.0, -1.0]);
        let points = trace_points(&sample, 300.0, 100.0);
        let ys: Vec<f32> = points.iter().map(|p| p.y).collect();
        let xs: Vec<f32> = points.iter().map(|p| p.x).collect();
        assert_eq!(ys, vec![0.0, 50.0, 100.0]);
        assert_eq!(xs, vec![0.0, 100.0, 200.0]);
    }

    #[test]
    fn test_polyline_has_one_point_per_value() {
        let values: Vec<f32> = (0..400).map(|i| ((i as f32) * 0.05).sin()).collect();
        let sample = TelemetrySample::new(values.clone());
        let mut surface = DisplayList::new(640.0, 120.0);
        Monitor::draw(&sample, &mut surface);

        let points = match surface.ops().last() {
            Some(DrawOp::Polyline { points, color }) => {
                assert_eq!(*color, TRACE);
                points.clone()
            }
            other => panic!("Expected polyline, got {:?}", other),
        };
        assert_eq!(points.len(), 400);
        assert!(points.windows(2).all(|w| w[1].x > w[0].x));
        for (point, v) in points.iter().zip(&values) {
            assert_eq!(point.y, (((-v + 1.0) / 2.0) * 120.0).floor());
        }
    }

    #[test]
    fn test_redraw_only_on_new_sample() {
        let mut monitor = Monitor::new();
        let mut surface = DisplayList::new(100.0, 100.0);
        let first = Arc::new(TelemetrySample::new(vec![0.5]));

        assert!(monitor.sync(&first, &mut surface));
        assert!(!monitor.sync(&first, &mut surface));

        // Equal contents, different delivery: still a new frame
        let second = Arc::new(TelemetrySample::new(vec![0.5]));
        assert!(monitor.sync(&second, &mut surface));
        assert_eq!(monitor.redraw_count(), 2);
    }

    #[test]
    fn test_frame_replaces_previous_ops() {
        let mut surface = DisplayList::new(100.0, 100.0);
        Monitor::draw(&TelemetrySample::new(vec![0.0, 0.1]), &mut surface);
        Monitor::draw(&TelemetrySample::default(), &mut surface);
        assert_eq!(surface.ops().len(), 3);
    }

    #[test]
    fn test_decode() {
        let sample = TelemetrySample::decode(&json!([0.5, -1, 0])).unwrap();
        assert_eq!(sample.values(), &[0.5, -1.0, 0.0]);
        assert!(TelemetrySample::decode(&json!([0.5, "x"])).is_err());
        assert!(TelemetrySample::decode(&json!({"data": []})).is_err());
        assert!(TelemetrySample::decode(&json!([])).unwrap().is_empty());
    }
}
