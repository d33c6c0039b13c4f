use serde::Serialize;

use crate::report::chart::ChartSpec;
use crate::survey::models::ReportData;

pub const SUMMARY_HEADING: &str = "Summary";
pub const ANALYSIS_HEADING: &str = "Detailed Analysis";
pub const CHART_HEADING: &str = "Data Visualization";
pub const CONCLUSION_HEADING: &str = "Conclusion";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisEntry {
    /// `Q{n}: {question}`, 1-indexed.
    pub label: String,
    pub answer: String,
    pub insight: String,
}

/// What the report view shows, and what the PDF export rasterizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub summary: String,
    pub analysis: Vec<AnalysisEntry>,
    pub chart: Option<ChartSpec>,
    pub conclusion: String,
    /// Background color override (`#rrggbb`). Unset means transparent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

/// Flattened, top-to-bottom content used by the rasterizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Block<'a> {
    Title(&'a str),
    Heading(&'a str),
    Paragraph(&'a str),
    Label(&'a str),
    Insight(&'a str),
    Chart(&'a ChartSpec),
}

impl ReportDocument {
    pub fn build(report: &ReportData) -> Self {
        let analysis = report
            .detailed_analysis
            .iter()
            .enumerate()
            .map(|(i, item)| AnalysisEntry {
                label: format!("Q{}: {}", i + 1, item.question),
                answer: format!("A: {}", item.answer),
                insight: format!("Insight: {}", item.insight),
            })
            .collect();

        Self {
            title: report.title.clone(),
            summary: report.summary.clone(),
            analysis,
            chart: ChartSpec::from_chart_data(&report.chart_data),
            conclusion: report.conclusion.clone(),
            background: None,
        }
    }

    pub fn blocks(&self) -> Vec<Block<'_>> {
        let mut blocks = vec![
            Block::Title(&self.title),
            Block::Heading(SUMMARY_HEADING),
            Block::Paragraph(&self.summary),
        ];

        if !self.analysis.is_empty() {
            blocks.push(Block::Heading(ANALYSIS_HEADING));
            for entry in &self.analysis {
                blocks.push(Block::Label(&entry.label));
                blocks.push(Block::Paragraph(&entry.answer));
                blocks.push(Block::Insight(&entry.insight));
            }
        }

        if let Some(chart) = &self.chart {
            blocks.push(Block::Heading(CHART_HEADING));
            blocks.push(Block::Chart(chart));
        }

        blocks.push(Block::Heading(CONCLUSION_HEADING));
        blocks.push(Block::Paragraph(&self.conclusion));
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::persistence::tests::sample_report;

    #[test]
    fn test_analysis_labels_are_one_indexed() {
        let mut report = sample_report();
        report.detailed_analysis.push(report.detailed_analysis[0].clone());
        let doc = ReportDocument::build(&report);
        assert_eq!(doc.analysis[0].label, "Q1: Quel est votre objectif ?");
        assert!(doc.analysis[1].label.starts_with("Q2: "));
        assert!(doc.analysis[0].answer.starts_with("A: "));
    }

    #[test]
    fn test_chart_section_only_with_labels() {
        let mut report = sample_report();
        let doc = ReportDocument::build(&report);
        assert!(doc.chart.is_some());
        assert!(doc.blocks().contains(&Block::Heading(CHART_HEADING)));

        report.chart_data.labels.clear();
        report.chart_data.values.clear();
        let doc = ReportDocument::build(&report);
        assert!(doc.chart.is_none());
        assert!(!doc.blocks().contains(&Block::Heading(CHART_HEADING)));
    }

    #[test]
    fn test_block_order() {
        let doc = ReportDocument::build(&sample_report());
        let blocks = doc.blocks();
        assert_eq!(blocks.first(), Some(&Block::Title("Votre plan d'action")));
        assert_eq!(blocks[1], Block::Heading(SUMMARY_HEADING));
        assert_eq!(blocks[blocks.len() - 2], Block::Heading(CONCLUSION_HEADING));
    }

    #[test]
    fn test_background_unset_by_default() {
        let doc = ReportDocument::build(&sample_report());
        assert!(doc.background.is_none());
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("background").is_none());
    }
}
