pub mod chart;
pub mod csv;
pub mod document;
pub mod handlers;
pub mod pdf;
pub mod raster;

use thiserror::Error;
use tracing::debug;

use crate::report::chart::{ChartBackend, ChartSlot};
use crate::report::document::ReportDocument;
use crate::survey::models::ReportData;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to allocate a {width}x{height} pixmap")]
    PixmapCreationFailed { width: u32, height: u32 },

    #[error("Rasterized image is empty")]
    EmptyImage,

    #[error("Image buffer has {actual} bytes, expected {expected}")]
    ImageSize { expected: usize, actual: usize },

    #[error("Render task failed: {0}")]
    Task(String),
}

/// Owns the chart instance shown alongside the report view.
pub struct ReportRenderer {
    chart: ChartSlot,
}

impl ReportRenderer {
    pub fn new(backend: Box<dyn ChartBackend>) -> Self {
        Self {
            chart: ChartSlot::new(backend),
        }
    }

    /// (Re)creates the chart for `report`. The display document itself is
    /// rebuilt per view, so nothing is returned.
    pub fn show(&mut self, report: &ReportData) {
        let document = ReportDocument::build(report);
        self.chart.replace(document.chart.as_ref());
        debug!(
            "Report rendered (chart: {})",
            if self.chart.is_active() { "yes" } else { "no" }
        );
    }

    pub fn clear(&mut self) {
        self.chart.clear();
    }

    pub fn chart_markup(&self) -> Option<&str> {
        self.chart.markup()
    }
}
