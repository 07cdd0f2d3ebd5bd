//! Chart shaping
//!
//! Maps rows onto line/bar/doughnut/pie series. Colors are spread evenly
//! around the hue wheel so `n` series (or slices) get `n` distinct hues.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::aggregation::{FieldValue, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Bar,
    Doughnut,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSettings {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub x_axis: String,
    pub y_axis: String,
    /// Line charts only: split points into one series per value
    #[serde(default)]
    pub group_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
    /// Index of the row this point was drawn from
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub chart_type: ChartType,
    pub series: Vec<Series>,
}

/// Hue of item `i` out of `n`, evenly spaced over 360 degrees.
pub fn hue(i: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    i as f64 * 360.0 / n as f64
}

pub fn color(i: usize, n: usize) -> String {
    format!("hsl({}, 70%, 50%)", hue(i, n))
}

/// Order for x values: times chronologically, numbers numerically, the
/// rest by text. Values of different kinds never interleave: missing x
/// values come first, then times, numbers, booleans and text.
fn compare_x(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    fn rank(value: Option<&FieldValue>) -> u8 {
        match value {
            None => 0,
            Some(FieldValue::Time(_)) => 1,
            Some(FieldValue::Number(_)) => 2,
            Some(FieldValue::Bool(_)) => 3,
            Some(FieldValue::Text(_)) => 4,
        }
    }

    match (a, b) {
        (Some(FieldValue::Time(x)), Some(FieldValue::Time(y))) => x.cmp(y),
        (Some(FieldValue::Number(x)), Some(FieldValue::Number(y))) => x
            .as_f64()
            .unwrap_or(f64::NAN)
            .total_cmp(&y.as_f64().unwrap_or(f64::NAN)),
        (Some(FieldValue::Bool(x)), Some(FieldValue::Bool(y))) => x.cmp(y),
        (Some(FieldValue::Text(x)), Some(FieldValue::Text(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn label(value: Option<&FieldValue>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

fn point(row_index: usize, row: &Row, settings: &GraphSettings) -> Option<ChartPoint> {
    let value = row.get(&settings.y_axis)?.as_f64()?;
    Some(ChartPoint {
        label: label(row.get(&settings.x_axis)),
        value,
        row: row_index,
        color: None,
    })
}

/// Rows without a numeric y value are left out.
pub fn render(rows: &[Row], settings: &GraphSettings) -> ChartData {
    let mut points: Vec<ChartPoint> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| point(i, row, settings))
        .collect();

    let series = match settings.chart_type {
        ChartType::Line => {
            points.sort_by(|a, b| {
                compare_x(
                    rows[a.row].get(&settings.x_axis),
                    rows[b.row].get(&settings.x_axis),
                )
            });
            line_series(rows, points, settings)
        }
        ChartType::Bar => vec![Series {
            name: settings.y_axis.clone(),
            color: Some(color(0, 1)),
            points,
        }],
        ChartType::Doughnut | ChartType::Pie => {
            let n = points.len();
            for (i, p) in points.iter_mut().enumerate() {
                p.color = Some(color(i, n));
            }
            vec![Series {
                name: settings.y_axis.clone(),
                color: None,
                points,
            }]
        }
    };

    ChartData {
        chart_type: settings.chart_type,
        series,
    }
}

fn line_series(rows: &[Row], points: Vec<ChartPoint>, settings: &GraphSettings) -> Vec<Series> {
    let Some(group_by) = &settings.group_by else {
        return vec![Series {
            name: settings.y_axis.clone(),
            color: Some(color(0, 1)),
            points,
        }];
    };

    // Series named by group value, in first-appearance order over rows
    let mut names: Vec<String> = Vec::new();
    for row in rows {
        if row.get(&settings.y_axis).and_then(FieldValue::as_f64).is_none() {
            continue;
        }
        let name = label(row.get(group_by));
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let n = names.len();
    let mut series: Vec<Series> = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| Series {
            name,
            color: Some(color(i, n)),
            points: Vec::new(),
        })
        .collect();

    for p in points {
        let name = label(rows[p.row].get(group_by));
        if let Some(s) = series.iter_mut().find(|s| s.name == name) {
            s.points.push(p);
        }
    }
    series
}

/// The row behind a clicked point.
pub fn resolve_point<'a>(
    chart: &ChartData,
    rows: &'a [Row],
    series: usize,
    point: usize,
) -> Option<&'a Row> {
    let p = chart.series.get(series)?.points.get(point)?;
    rows.get(p.row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::analytics::aggregation::{aggregate, AggregationSettings};
    use crate::domain::{Metric, TagValue, Tags};
    use chrono::{TimeZone, Utc};

    fn metric(day: u32, operation: &str, duration: f64, region: &str) -> Metric {
        Metric {
            id: format!("m-{}-{}", day, operation),
            project_id: "p".into(),
            operation: operation.into(),
            start_time: Utc.with_ymd_and_hms(2024, 8, day, 0, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 8, day, 1, 0, 0).unwrap(),
            duration,
            tags: Tags::from([("region".to_string(), TagValue::from(region))]),
            created_at: Utc::now(),
        }
    }

    fn rows() -> (Vec<Metric>, Vec<Row>) {
        let records = vec![
            metric(3, "pay", 30.0, "eu"),
            metric(1, "refund", 10.0, "us"),
            metric(2, "pay", 20.0, "ap"),
            metric(4, "audit", 40.0, "eu"),
        ];
        let rows = aggregate(&records, &AggregationSettings::default());
        (records, rows)
    }

    fn graph(chart_type: ChartType, group_by: Option<&str>) -> GraphSettings {
        GraphSettings {
            chart_type,
            x_axis: "startTime".into(),
            y_axis: "duration".into(),
            group_by: group_by.map(String::from),
        }
    }

    #[test]
    fn hues_are_evenly_spaced_and_distinct() {
        for n in 1..=12 {
            let hues: Vec<f64> = (0..n).map(|i| hue(i, n)).collect();
            for i in 1..n {
                assert!((hues[i] - hues[i - 1] - 360.0 / n as f64).abs() < 1e-9);
            }
            assert!(hues.iter().all(|h| (0.0..360.0).contains(h)));
        }
        assert_eq!(color(1, 3), "hsl(120, 70%, 50%)");
    }

    #[test]
    fn line_points_are_sorted_by_time() {
        let (_, rows) = rows();
        let chart = render(&rows, &graph(ChartType::Line, None));
        assert_eq!(chart.series.len(), 1);
        let values: Vec<f64> = chart.series[0].points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(chart.series[0].points[0].label, "2024-08-01T00:00:00.000Z");
    }

    #[test]
    fn line_group_by_splits_series_with_distinct_colors() {
        let (_, rows) = rows();
        let chart = render(&rows, &graph(ChartType::Line, Some("operation")));
        let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["pay", "refund", "audit"]);

        let colors: Vec<&str> = chart
            .series
            .iter()
            .map(|s| s.color.as_deref().unwrap())
            .collect();
        assert_eq!(
            colors,
            vec!["hsl(0, 70%, 50%)", "hsl(120, 70%, 50%)", "hsl(240, 70%, 50%)"]
        );

        let pay: Vec<f64> = chart.series[0].points.iter().map(|p| p.value).collect();
        assert_eq!(pay, vec![20.0, 30.0]);
    }

    #[test]
    fn bar_keeps_row_order() {
        let (_, rows) = rows();
        let chart = render(&rows, &graph(ChartType::Bar, None));
        let values: Vec<f64> = chart.series[0].points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![30.0, 10.0, 20.0, 40.0]);
    }

    #[test]
    fn pie_slices_get_their_own_colors() {
        let (_, rows) = rows();
        let chart = render(&rows, &graph(ChartType::Pie, None));
        let colors: Vec<String> = chart.series[0]
            .points
            .iter()
            .map(|p| p.color.clone().unwrap())
            .collect();
        assert_eq!(colors.len(), 4);
        assert_eq!(colors[1], "hsl(90, 70%, 50%)");
        let mut unique = colors.clone();
        unique.dedup();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn non_numeric_y_values_are_skipped() {
        let (_, rows) = rows();
        let mut settings = graph(ChartType::Bar, None);
        settings.y_axis = "region".into();
        let chart = render(&rows, &settings);
        assert!(chart.series[0].points.is_empty());
    }

    #[test]
    fn clicked_point_resolves_to_its_row_and_records() {
        let (records, rows) = rows();
        let chart = render(&rows, &graph(ChartType::Line, None));

        // First point on a time-sorted line is the 1 August record
        let row = resolve_point(&chart, &rows, 0, 0).unwrap();
        assert_eq!(records[row.sources[0]].operation, "refund");
        assert!(resolve_point(&chart, &rows, 0, 99).is_none());
        assert!(resolve_point(&chart, &rows, 5, 0).is_none());
    }

    #[test]
    fn aggregated_rows_chart_their_statistics() {
        let (records, _) = rows();
        let settings: AggregationSettings = serde_json::from_str(
            r#"{"groupBy":["operation"],"aggregatedFields":{"duration":["avg"]}}"#,
        )
        .unwrap();
        let rows = aggregate(&records, &settings);
        let chart = render(
            &rows,
            &GraphSettings {
                chart_type: ChartType::Doughnut,
                x_axis: "operation".into(),
                y_axis: "durationAvg".into(),
                group_by: None,
            },
        );
        let pay = &chart.series[0].points[0];
        assert_eq!(pay.label, "pay");
        assert_eq!(pay.value, 25.0);
        let row = resolve_point(&chart, &rows, 0, 0).unwrap();
        assert_eq!(row.sources, vec![0, 2]);
    }

    #[test]
    fn mixed_kind_x_values_sort_without_cycles() {
        // 9 < 10 numerically while "10" > "5" and "5" > "9" as text
        let xs = [
            TagValue::from(10i64),
            TagValue::from("5"),
            TagValue::from(9i64),
            TagValue::from(true),
            TagValue::from("a"),
            TagValue::Number(serde_json::Number::from_f64(2.5).unwrap()),
        ];
        let records: Vec<Metric> = (0..200)
            .map(|i| {
                let mut m = metric(1 + (i % 28) as u32, "op", i as f64, "eu");
                m.tags
                    .insert("v".to_string(), xs[(i * 7 + i / 3) % xs.len()].clone());
                if i % 11 == 0 {
                    m.tags.remove("v");
                }
                m
            })
            .collect();
        let rows = aggregate(&records, &AggregationSettings::default());
        let settings = GraphSettings {
            chart_type: ChartType::Line,
            x_axis: "v".into(),
            y_axis: "duration".into(),
            group_by: None,
        };

        let chart = render(&rows, &settings);
        let labels: Vec<&str> = chart.series[0]
            .points
            .iter()
            .map(|p| p.label.as_str())
            .collect();
        assert_eq!(labels.len(), 200);

        let mut kinds: Vec<&str> = labels.clone();
        kinds.dedup();
        assert_eq!(kinds, vec!["", "2.5", "9", "10", "true", "5", "a"]);
    }

    #[test]
    fn graph_settings_deserialize() {
        let parsed: GraphSettings = serde_json::from_str(
            r#"{"type":"line","xAxis":"datetime","yAxis":"duration","groupBy":"operation"}"#,
        )
        .unwrap();
        assert_eq!(parsed.chart_type, ChartType::Line);
        assert_eq!(parsed.group_by.as_deref(), Some("operation"));
    }
}
