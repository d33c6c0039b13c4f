//! Chart dataset and chart-instance lifecycle.
//!
//! The renderer owns one `ChartSlot`. Every report view destroys the previous
//! instance before a new one is created; reset destroys it outright.

use serde::Serialize;
use tracing::{debug, warn};

use crate::report::RenderError;
use crate::survey::models::ChartData;

/// Canvas target the report view reserves for the chart.
pub const CHART_TARGET: &str = "report-chart";

const SVG_WIDTH: f32 = 640.0;
const SVG_HEIGHT: f32 = 320.0;
const SVG_MARGIN: f32 = 40.0;
pub const BAR_FILL: &str = "rgba(75, 192, 192, 0.6)";
pub const BAR_STROKE: &str = "rgba(75, 192, 192, 1)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
}

/// A single bar series keyed by the chart title, y-axis pinned at zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub target: String,
    pub kind: ChartKind,
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub y_min: f64,
}

impl ChartSpec {
    /// `None` when there is nothing to plot.
    pub fn from_chart_data(data: &ChartData) -> Option<Self> {
        if !data.has_data() {
            return None;
        }
        Some(Self {
            target: CHART_TARGET.to_string(),
            kind: ChartKind::Bar,
            title: data.title.clone(),
            labels: data.labels.clone(),
            values: data.values.clone(),
            y_min: 0.0,
        })
    }

    /// Label/value pairs; extra entries on either side are ignored.
    pub fn bars(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Top of the y-axis: the largest value, at least 1 so an all-zero chart
    /// still has a scale.
    pub fn y_max(&self) -> f64 {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(1.0_f64, f64::max)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Backend contract
// ────────────────────────────────────────────────────────────────────────────

/// A live chart instance. Must be destroyed before its slot is reused.
pub trait ChartHandle: Send {
    fn markup(&self) -> &str;
    fn destroy(&mut self);
}

pub trait ChartBackend: Send {
    fn create(&mut self, target: &str, spec: &ChartSpec) -> Result<Box<dyn ChartHandle>, RenderError>;
}

/// Holds at most one chart instance.
pub struct ChartSlot {
    backend: Box<dyn ChartBackend>,
    current: Option<Box<dyn ChartHandle>>,
}

impl ChartSlot {
    pub fn new(backend: Box<dyn ChartBackend>) -> Self {
        Self {
            backend,
            current: None,
        }
    }

    /// Destroys the current chart, then creates one for `spec` if given.
    /// A backend failure leaves the slot empty.
    pub fn replace(&mut self, spec: Option<&ChartSpec>) {
        self.clear();
        let Some(spec) = spec else {
            debug!("No chart data, skipping chart");
            return;
        };
        match self.backend.create(&spec.target, spec) {
            Ok(handle) => self.current = Some(handle),
            Err(e) => warn!("Chart creation failed: {e}"),
        }
    }

    pub fn clear(&mut self) {
        if let Some(mut handle) = self.current.take() {
            handle.destroy();
        }
    }

    pub fn markup(&self) -> Option<&str> {
        self.current.as_deref().map(|h| h.markup())
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SVG backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct SvgChartBackend {
    created: u64,
}

struct SvgChart {
    id: u64,
    svg: String,
}

impl ChartHandle for SvgChart {
    fn markup(&self) -> &str {
        &self.svg
    }

    fn destroy(&mut self) {
        debug!("Destroying chart #{}", self.id);
        self.svg.clear();
    }
}

impl ChartBackend for SvgChartBackend {
    fn create(&mut self, target: &str, spec: &ChartSpec) -> Result<Box<dyn ChartHandle>, RenderError> {
        self.created += 1;
        Ok(Box::new(SvgChart {
            id: self.created,
            svg: render_svg(target, spec),
        }))
    }
}

fn render_svg(target: &str, spec: &ChartSpec) -> String {
    let plot_w = SVG_WIDTH - 2.0 * SVG_MARGIN;
    let plot_h = SVG_HEIGHT - 2.0 * SVG_MARGIN;
    let baseline = SVG_HEIGHT - SVG_MARGIN;
    let count = spec.bars().count().max(1) as f32;
    let slot = plot_w / count;
    let bar_w = slot * 0.6;
    let y_max = spec.y_max();

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" id="{}" viewBox="0 0 {SVG_WIDTH} {SVG_HEIGHT}" role="img">"#,
        escape_xml(target)
    );
    svg.push_str(&format!(
        r#"<text x="{}" y="24" text-anchor="middle" font-size="16">{}</text>"#,
        SVG_WIDTH / 2.0,
        escape_xml(&spec.title)
    ));
    svg.push_str(&format!(
        r#"<line x1="{SVG_MARGIN}" y1="{baseline}" x2="{}" y2="{baseline}" stroke="currentColor"/>"#,
        SVG_WIDTH - SVG_MARGIN
    ));

    for (i, (label, value)) in spec.bars().enumerate() {
        let clamped = value.max(spec.y_min);
        let h = (clamped / y_max) as f32 * plot_h;
        let x = SVG_MARGIN + slot * i as f32 + (slot - bar_w) / 2.0;
        svg.push_str(&format!(
            r#"<rect x="{x:.1}" y="{:.1}" width="{bar_w:.1}" height="{h:.1}" fill="{BAR_FILL}" stroke="{BAR_STROKE}" stroke-width="1"><title>{}: {value}</title></rect>"#,
            baseline - h,
            escape_xml(label)
        ));
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12">{}</text>"#,
            x + bar_w / 2.0,
            baseline + 16.0,
            escape_xml(label)
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records create/destroy calls in order.
    #[derive(Clone, Default)]
    pub struct RecordingBackend {
        pub events: Arc<Mutex<Vec<String>>>,
    }

    struct RecordingHandle {
        id: usize,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl ChartHandle for RecordingHandle {
        fn markup(&self) -> &str {
            "<svg/>"
        }

        fn destroy(&mut self) {
            self.events.lock().unwrap().push(format!("destroy {}", self.id));
        }
    }

    impl ChartBackend for RecordingBackend {
        fn create(&mut self, _target: &str, spec: &ChartSpec) -> Result<Box<dyn ChartHandle>, RenderError> {
            let mut events = self.events.lock().unwrap();
            let id = events.iter().filter(|e| e.starts_with("create")).count() + 1;
            events.push(format!("create {id} {}", spec.title));
            Ok(Box::new(RecordingHandle {
                id,
                events: self.events.clone(),
            }))
        }
    }

    fn chart_data(labels: &[&str], values: &[f64]) -> ChartData {
        ChartData {
            title: "Priority".to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn test_empty_labels_yield_no_spec() {
        assert!(ChartSpec::from_chart_data(&chart_data(&[], &[])).is_none());
        assert!(ChartSpec::from_chart_data(&chart_data(&[], &[1.0])).is_none());
    }

    #[test]
    fn test_spec_is_single_bar_series_from_zero() {
        let spec = ChartSpec::from_chart_data(&chart_data(&["Health", "Work"], &[8.0, 3.0])).unwrap();
        assert_eq!(spec.kind, ChartKind::Bar);
        assert_eq!(spec.title, "Priority");
        assert_eq!(spec.y_min, 0.0);
        assert_eq!(spec.target, CHART_TARGET);
        assert_eq!(spec.y_max(), 8.0);
    }

    #[test]
    fn test_slot_destroys_before_recreate() {
        let backend = RecordingBackend::default();
        let events = backend.events.clone();
        let mut slot = ChartSlot::new(Box::new(backend));
        let spec = ChartSpec::from_chart_data(&chart_data(&["A"], &[1.0])).unwrap();

        slot.replace(Some(&spec));
        slot.replace(Some(&spec));
        slot.clear();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "create 1 Priority".to_string(),
                "destroy 1".to_string(),
                "create 2 Priority".to_string(),
                "destroy 2".to_string(),
            ]
        );
        assert!(!slot.is_active());
    }

    #[test]
    fn test_slot_replace_with_none_leaves_empty() {
        let mut slot = ChartSlot::new(Box::new(SvgChartBackend::default()));
        let spec = ChartSpec::from_chart_data(&chart_data(&["A"], &[1.0])).unwrap();
        slot.replace(Some(&spec));
        assert!(slot.is_active());
        slot.replace(None);
        assert!(slot.markup().is_none());
    }

    #[test]
    fn test_svg_escapes_labels() {
        let spec =
            ChartSpec::from_chart_data(&chart_data(&["Time & <money>"], &[2.5])).unwrap();
        let svg = render_svg(CHART_TARGET, &spec);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Time &amp; &lt;money&gt;"));
        assert!(!svg.contains("<money>"));
        assert_eq!(svg.matches("<rect").count(), 1);
    }

    #[test]
    fn test_negative_values_clamp_to_axis() {
        let spec = ChartSpec::from_chart_data(&chart_data(&["A", "B"], &[-3.0, 4.0])).unwrap();
        let svg = render_svg(CHART_TARGET, &spec);
        assert!(svg.contains("height=\"0.0\""));
    }
}
