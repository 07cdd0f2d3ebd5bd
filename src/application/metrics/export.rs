//! Tab-separated export
//!
//! Tags are written as a JSON string with every `,` replaced by `;` so
//! spreadsheet tools that split on commas keep the column intact. The
//! replacement is lossy: a comma inside a tag value cannot be recovered.
//! Tabs and line breaks in an operation name are likewise written as
//! spaces so every record stays on one row.

use tracing::warn;

use crate::domain::Metric;
use crate::shared::time::format_timestamp;

pub const TSV_HEADER: &str = "Operation\tStart Time\tEnd Time\tDuration\tTags";

const LINE_SEPARATOR: &str = "\r\n";

fn tags_column(metric: &Metric) -> String {
    match serde_json::to_string(&metric.tags) {
        Ok(json) => json.replace(',', ";"),
        Err(e) => {
            warn!(metric_id = %metric.id, error = %e, "Failed to encode tags for export");
            String::new()
        }
    }
}

fn single_line(text: &str) -> String {
    text.replace(['\t', '\r', '\n'], " ")
}

fn row(metric: &Metric) -> String {
    [
        single_line(&metric.operation),
        format_timestamp(&metric.start_time),
        format_timestamp(&metric.end_time),
        metric.duration.to_string(),
        tags_column(metric),
    ]
    .join("\t")
}

/// Header row followed by one row per metric, CRLF separated.
pub fn to_tsv(metrics: &[Metric]) -> String {
    std::iter::once(TSV_HEADER.to_string())
        .chain(metrics.iter().map(row))
        .collect::<Vec<_>>()
        .join(LINE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TagValue, Tags};
    use chrono::{TimeZone, Utc};

    fn metric(tags: Tags) -> Metric {
        Metric {
            id: "m-1".into(),
            project_id: "p-1".into(),
            operation: "pay".into(),
            start_time: Utc.with_ymd_and_hms(2024, 8, 1, 10, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 8, 1, 10, 0, 1).unwrap(),
            duration: 1000.0,
            tags,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn commas_in_tags_become_semicolons() {
        let tags = Tags::from([
            ("a".to_string(), TagValue::from(1)),
            ("b".to_string(), TagValue::from(2)),
        ]);
        let tsv = to_tsv(&[metric(tags)]);
        let row = tsv.split("\r\n").nth(1).unwrap();
        assert_eq!(row.split('\t').last().unwrap(), r#"{"a":1;"b":2}"#);
    }

    #[test]
    fn layout() {
        let tsv = to_tsv(&[metric(Tags::new()), metric(Tags::new())]);
        let lines: Vec<_> = tsv.split("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], TSV_HEADER);
        assert_eq!(
            lines[1],
            "pay\t2024-08-01T10:00:00.000Z\t2024-08-01T10:00:01.000Z\t1000\t{}"
        );
    }

    #[test]
    fn empty_export_is_just_the_header() {
        assert_eq!(to_tsv(&[]), TSV_HEADER);
    }

    #[test]
    fn tag_values_with_commas_are_not_recoverable() {
        let tags = Tags::from([("list".to_string(), TagValue::from("x,y"))]);
        let tsv = to_tsv(&[metric(tags)]);
        assert!(tsv.ends_with(r#"{"list":"x;y"}"#));
    }

    #[test]
    fn control_characters_in_operation_stay_on_one_row() {
        let mut m = metric(Tags::new());
        m.operation = "pay\tcard\r\nretry".into();
        let tsv = to_tsv(&[m]);
        let lines: Vec<_> = tsv.split("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].split('\t').count(), 5);
        assert!(lines[1].starts_with("pay card  retry\t"));
    }
}
