//! CSV export of the raw survey answers.

use crate::survey::models::SurveyResponse;

pub const CSV_FILENAME: &str = "survey_responses.csv";
pub const CSV_CONTENT_TYPE: &str = "text/csv;charset=utf-8";
const CSV_HEADER: &str = "Question,Answer\n";

/// Header line plus one row per response. Every field is quoted and embedded
/// quotes are doubled.
pub fn to_csv(responses: &[SurveyResponse]) -> String {
    let mut csv = String::from(CSV_HEADER);
    for row in responses {
        csv.push_str(&quote(&row.question));
        csv.push(',');
        csv.push_str(&quote(&row.answer));
        csv.push('\n');
    }
    csv
}

/// `data:` URI form for clients that trigger the download themselves.
pub fn to_data_uri(csv: &str) -> String {
    format!("data:{CSV_CONTENT_TYPE},{}", urlencoding::encode(csv))
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
