//! PDF export: rasterize the report document and embed the image in a
//! single-page PDF whose height follows the image's aspect ratio.

use std::sync::Arc;

use tracing::debug;

use crate::report::document::ReportDocument;
use crate::report::raster::{Rasterizer, RgbImage};
use crate::report::RenderError;

pub const PDF_FILENAME: &str = "survey_report.pdf";
/// Background forced onto the document while it is captured.
pub const CAPTURE_BACKGROUND: &str = "#1e1e1e";
/// A4 width in points.
const PAGE_WIDTH_PT: f64 = 595.28;

#[derive(Clone)]
pub struct PdfExporter {
    rasterizer: Arc<dyn Rasterizer>,
}

impl PdfExporter {
    pub fn new(rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self { rasterizer }
    }

    /// Captures `document` with the forced background, restores its previous
    /// background (also on failure) and returns the PDF bytes.
    pub fn export(&self, document: &mut ReportDocument) -> Result<Vec<u8>, RenderError> {
        let original = document.background.replace(CAPTURE_BACKGROUND.to_string());
        let captured = self.rasterizer.rasterize(document);
        document.background = original;

        let image = captured?;
        debug!("Captured report at {}x{}", image.width, image.height);
        encode_single_page(&image, &creation_date())
    }
}

fn creation_date() -> String {
    chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()
}

/// Writes a minimal PDF 1.4 file: one page, one uncompressed RGB image
/// XObject stretched over the full page.
pub fn encode_single_page(image: &RgbImage, creation_date: &str) -> Result<Vec<u8>, RenderError> {
    if image.width == 0 || image.height == 0 {
        return Err(RenderError::EmptyImage);
    }
    let expected = image.width as usize * image.height as usize * 3;
    if image.data.len() != expected {
        return Err(RenderError::ImageSize {
            expected,
            actual: image.data.len(),
        });
    }

    let page_w = PAGE_WIDTH_PT;
    let page_h = image.height as f64 * page_w / image.width as f64;

    let mut pdf = PdfWriter::new();
    pdf.object(1, b"<< /Type /Catalog /Pages 2 0 R >>");
    pdf.object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    pdf.object(
        3,
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {page_w:.2} {page_h:.2}] \
             /Resources << /XObject << /Im0 4 0 R >> >> /Contents 5 0 R >>"
        )
        .as_bytes(),
    );
    pdf.stream(
        4,
        &format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} \
             /ColorSpace /DeviceRGB /BitsPerComponent 8",
            image.width, image.height
        ),
        &image.data,
    );
    let content = format!("q {page_w:.2} 0 0 {page_h:.2} 0 0 cm /Im0 Do Q");
    pdf.stream(5, "", content.as_bytes());
    pdf.object(
        6,
        format!("<< /Producer (survey-api) /CreationDate ({creation_date}) >>").as_bytes(),
    );
    Ok(pdf.finish(1, 6))
}

/// Tracks byte offsets for the cross-reference table.
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    fn begin(&mut self, id: usize) {
        debug_assert_eq!(id, self.offsets.len() + 1, "objects are written in order");
        self.offsets.push(self.buf.len());
        self.buf.extend_from_slice(format!("{id} 0 obj\n").as_bytes());
    }

    fn object(&mut self, id: usize, body: &[u8]) {
        self.begin(id);
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, dict_entries: &str, data: &[u8]) {
        self.begin(id);
        let sep = if dict_entries.is_empty() { "" } else { " " };
        self.buf.extend_from_slice(
            format!("<< {dict_entries}{sep}/Length {} >>\nstream\n", data.len()).as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self, root: usize, info: usize) -> Vec<u8> {
        let xref_at = self.buf.len();
        let size = self.offsets.len() + 1;
        let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
        for offset in &self.offsets {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {size} /Root {root} 0 R /Info {info} 0 R >>\nstartxref\n{xref_at}\n%%EOF\n"
        ));
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::persistence::tests::sample_report;
    use std::sync::Mutex;

    /// Records the background seen at capture time.
    struct CapturingRasterizer {
        seen: Mutex<Vec<Option<String>>>,
        fail: bool,
    }

    impl CapturingRasterizer {
        fn new(fail: bool) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl Rasterizer for CapturingRasterizer {
        fn rasterize(&self, document: &ReportDocument) -> Result<RgbImage, RenderError> {
            self.seen.lock().unwrap().push(document.background.clone());
            if self.fail {
                return Err(RenderError::EmptyImage);
            }
            Ok(RgbImage {
                width: 2,
                height: 4,
                data: vec![0x1e; 2 * 4 * 3],
            })
        }
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn test_export_forces_and_restores_background() {
        let rasterizer = Arc::new(CapturingRasterizer::new(false));
        let exporter = PdfExporter::new(rasterizer.clone());
        let mut doc = ReportDocument::build(&sample_report());
        doc.background = Some("#ffffff".to_string());

        let pdf = exporter.export(&mut doc).unwrap();

        assert!(pdf.starts_with(b"%PDF-1.4"));
        assert_eq!(
            *rasterizer.seen.lock().unwrap(),
            vec![Some(CAPTURE_BACKGROUND.to_string())]
        );
        assert_eq!(doc.background.as_deref(), Some("#ffffff"));
    }

    #[test]
    fn test_export_restores_background_on_failure() {
        let exporter = PdfExporter::new(Arc::new(CapturingRasterizer::new(true)));
        let mut doc = ReportDocument::build(&sample_report());

        assert!(exporter.export(&mut doc).is_err());
        assert!(doc.background.is_none());
    }

    #[test]
    fn test_page_height_follows_aspect_ratio() {
        let image = RgbImage {
            width: 2,
            height: 4,
            data: vec![0; 24],
        };
        let pdf = encode_single_page(&image, "D:20260101000000Z").unwrap();
        assert!(find(&pdf, b"/MediaBox [0 0 595.28 1190.56]").is_some());
        assert!(find(&pdf, b"/Width 2 /Height 4").is_some());
        assert!(pdf.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let image = RgbImage {
            width: 1,
            height: 1,
            data: vec![1, 2, 3],
        };
        let pdf = encode_single_page(&image, "D:20260101000000Z").unwrap();
        let xref_at = find(&pdf, b"xref\n").unwrap();
        let table = String::from_utf8_lossy(&pdf[xref_at..]).to_string();
        let offsets: Vec<usize> = table
            .lines()
            .filter(|l| l.ends_with(" n "))
            .map(|l| l[..10].parse().unwrap())
            .collect();
        assert_eq!(offsets.len(), 6);
        for (i, offset) in offsets.iter().enumerate() {
            let expected = format!("{} 0 obj", i + 1);
            assert!(pdf[*offset..].starts_with(expected.as_bytes()));
        }
        assert!(table.contains(&format!("startxref\n{xref_at}\n")));
    }

    #[test]
    fn test_rejects_mismatched_image() {
        let image = RgbImage {
            width: 2,
            height: 2,
            data: vec![0; 5],
        };
        assert!(matches!(
            encode_single_page(&image, "D:0"),
            Err(RenderError::ImageSize { expected: 12, actual: 5 })
        ));
        let empty = RgbImage {
            width: 0,
            height: 0,
            data: vec![],
        };
        assert!(matches!(encode_single_page(&empty, "D:0"), Err(RenderError::EmptyImage)));
    }
}
