// fhir2omop-core/src/infrastructure/render.rs

// Artifacts written for humans: SVG charts (analytics) and the HTML profiling
// report (QA). Geometry is computed here, templates only lay it out.

use chrono::Utc;
use minijinja::{AutoEscape, Environment, context};
use serde::Serialize;
use std::path::Path;

use crate::domain::profile::DatasetProfile;
use crate::infrastructure::error::InfrastructureError;

const CHART_WIDTH: f64 = 640.0;
const CHART_HEIGHT: f64 = 400.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 70.0;

const BAR_CHART_TEMPLATE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="{{ g.width }}" height="{{ g.height }}" viewBox="0 0 {{ g.width }} {{ g.height }}" font-family="sans-serif">
  <rect width="100%" height="100%" fill="#ffffff"/>
  <text x="{{ g.mid_x }}" y="28" text-anchor="middle" font-size="18">{{ title }}</text>
  <line x1="{{ g.left }}" y1="{{ g.baseline }}" x2="{{ g.right }}" y2="{{ g.baseline }}" stroke="#333"/>
  <line x1="{{ g.left }}" y1="{{ g.top }}" x2="{{ g.left }}" y2="{{ g.baseline }}" stroke="#333"/>
  <text x="{{ g.tick_x }}" y="{{ g.top }}" text-anchor="end" font-size="11">{{ max_label }}</text>
  <text x="{{ g.tick_x }}" y="{{ g.baseline }}" text-anchor="end" font-size="11">0</text>
{%- for bar in bars %}
  <rect x="{{ bar.x }}" y="{{ bar.y }}" width="{{ bar.width }}" height="{{ bar.height }}" fill="#4c72b0"><title>{{ bar.label }}: {{ bar.value }}</title></rect>
  <text x="{{ bar.label_x }}" y="{{ g.label_y }}" text-anchor="middle" font-size="11">{{ bar.label }}</text>
{%- endfor %}
{%- if not bars %}
  <text x="{{ g.mid_x }}" y="{{ g.mid_y }}" text-anchor="middle" font-size="14" fill="#888">no data</text>
{%- endif %}
  <text x="{{ g.mid_x }}" y="{{ g.x_label_y }}" text-anchor="middle" font-size="13">{{ x_label }}</text>
  <text x="16" y="{{ g.mid_y }}" text-anchor="middle" font-size="13" transform="rotate(-90 16 {{ g.mid_y }})">{{ y_label }}</text>
</svg>
"##;

const QA_REPORT_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Profiling report: {{ source }}</title>
<style>
body { font-family: sans-serif; margin: 2em; color: #222; }
table { border-collapse: collapse; margin-bottom: 1.5em; }
th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: left; }
th { background: #f0f0f0; }
.warn { color: #b00; }
</style>
</head>
<body>
<h1>Profiling report</h1>
<p>Source: <code>{{ source }}</code> &middot; generated {{ generated_at }}</p>

<h2>Overview</h2>
<table>
<tr><th>Rows</th><td>{{ profile.rows }}</td></tr>
<tr><th>Columns</th><td>{{ profile.columns }}</td></tr>
<tr><th>Missing cells</th><td{% if profile.missing_cells %} class="warn"{% endif %}>{{ profile.missing_cells }} ({{ profile.missing_percent|round(1) }}%)</td></tr>
<tr><th>Duplicate rows</th><td{% if profile.duplicate_rows %} class="warn"{% endif %}>{{ profile.duplicate_rows }}</td></tr>
</table>

<h2>Columns</h2>
{%- for col in profile.column_profiles %}
<h3>{{ col.name }} <small>({{ col.kind }})</small></h3>
<table>
<tr><th>Missing</th><td>{{ col.missing }} ({{ col.missing_percent|round(1) }}%)</td></tr>
<tr><th>Distinct</th><td>{{ col.distinct }}</td></tr>
{%- if col.numeric %}
<tr><th>Min / Max</th><td>{{ col.numeric.min|round(3) }} / {{ col.numeric.max|round(3) }}</td></tr>
<tr><th>Mean &plusmn; std</th><td>{{ col.numeric.mean|round(3) }} &plusmn; {{ col.numeric.std|round(3) }}</td></tr>
<tr><th>Quartiles</th><td>{{ col.numeric.q1|round(3) }} / {{ col.numeric.median|round(3) }} / {{ col.numeric.q3|round(3) }}</td></tr>
{%- endif %}
{%- if col.length_range %}
<tr><th>Length</th><td>{{ col.length_range[0] }} to {{ col.length_range[1] }} chars</td></tr>
{%- endif %}
{%- if col.top_values %}
<tr><th>Top values</th><td>{% for v in col.top_values %}{{ v[0] }} ({{ v[1] }}){% if not loop.last %}, {% endif %}{% endfor %}</td></tr>
{%- endif %}
</table>
{%- endfor %}
</body>
</html>
"##;

/// One bar of a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

impl Bar {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bars: Vec<Bar>,
}

// Coordinates are preformatted so the SVG never shows float noise.
#[derive(Serialize)]
struct BarGeometry<'a> {
    label: &'a str,
    value: String,
    x: String,
    y: String,
    width: String,
    height: String,
    label_x: String,
}

#[derive(Serialize)]
struct FrameGeometry {
    width: String,
    height: String,
    left: String,
    right: String,
    top: String,
    baseline: String,
    tick_x: String,
    label_y: String,
    x_label_y: String,
    mid_x: String,
    mid_y: String,
}

impl FrameGeometry {
    fn new() -> Self {
        let baseline = CHART_HEIGHT - MARGIN_BOTTOM;
        Self {
            width: coord(CHART_WIDTH),
            height: coord(CHART_HEIGHT),
            left: coord(MARGIN_LEFT),
            right: coord(CHART_WIDTH - MARGIN_RIGHT),
            top: coord(MARGIN_TOP),
            baseline: coord(baseline),
            tick_x: coord(MARGIN_LEFT - 8.0),
            label_y: coord(baseline + 16.0),
            x_label_y: coord(CHART_HEIGHT - 16.0),
            mid_x: coord(CHART_WIDTH / 2.0),
            mid_y: coord(CHART_HEIGHT / 2.0),
        }
    }
}

pub struct ReportRenderer {
    env: Environment<'static>,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // Labels come from data files and API payloads
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_template("bar_chart.svg", BAR_CHART_TEMPLATE)
            .unwrap_or_else(|e| unreachable!("built-in chart template: {e}"));
        env.add_template("qa_report.html", QA_REPORT_TEMPLATE)
            .unwrap_or_else(|e| unreachable!("built-in report template: {e}"));
        Self { env }
    }

    pub fn bar_chart(&self, chart: &BarChart) -> Result<String, InfrastructureError> {
        let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let baseline = CHART_HEIGHT - MARGIN_BOTTOM;

        let max = chart.bars.iter().map(|b| b.value).fold(0.0_f64, f64::max);
        let slot = plot_width / chart.bars.len().max(1) as f64;

        let bars: Vec<BarGeometry> = chart
            .bars
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let height = if max > 0.0 {
                    bar.value.max(0.0) / max * plot_height
                } else {
                    0.0
                };
                let x = MARGIN_LEFT + i as f64 * slot + slot * 0.1;
                BarGeometry {
                    label: &bar.label,
                    value: format_number(bar.value),
                    x: coord(x),
                    y: coord(baseline - height),
                    width: coord(slot * 0.8),
                    height: coord(height),
                    label_x: coord(x + slot * 0.4),
                }
            })
            .collect();

        let tmpl = self.env.get_template("bar_chart.svg")?;
        Ok(tmpl.render(context! {
            g => FrameGeometry::new(),
            max_label => format_number(max),
            title => &chart.title,
            x_label => &chart.x_label,
            y_label => &chart.y_label,
            bars => bars,
        })?)
    }

    pub fn qa_report(
        &self,
        source: &Path,
        profile: &DatasetProfile,
    ) -> Result<String, InfrastructureError> {
        let tmpl = self.env.get_template("qa_report.html")?;
        Ok(tmpl.render(context! {
            source => source.display().to_string(),
            generated_at => Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
            profile => profile,
        })?)
    }
}

fn coord(v: f64) -> String {
    let text = format!("{:.2}", v);
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => "0".to_string(),
        t => t.to_string(),
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::profile::profile_table;
    use crate::domain::table::DataTable;

    #[test]
    fn test_bar_chart_geometry() -> anyhow::Result<()> {
        let chart = BarChart {
            title: "Persons by gender".into(),
            x_label: "gender_concept_id".into(),
            y_label: "persons".into(),
            bars: vec![Bar::new("8507", 4.0), Bar::new("8532", 2.0)],
        };
        let svg = ReportRenderer::new().bar_chart(&chart)?;

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Persons by gender"));
        // Tallest bar spans the full plot height (400 - 50 - 70)
        assert!(svg.contains(r#"height="280""#));
        assert!(svg.contains(r#"height="140""#));
        assert!(svg.contains("<title>8507: 4</title>"));
        Ok(())
    }

    #[test]
    fn test_empty_chart_and_escaping() -> anyhow::Result<()> {
        let chart = BarChart {
            title: "A < B & C".into(),
            x_label: String::new(),
            y_label: String::new(),
            bars: Vec::new(),
        };
        let svg = ReportRenderer::new().bar_chart(&chart)?;
        assert!(svg.contains("no data"));
        assert!(svg.contains("A &lt; B &amp; C"));
        Ok(())
    }

    #[test]
    fn test_qa_report_lists_columns() -> anyhow::Result<()> {
        let table = DataTable::new(
            vec!["age".into(), "gender".into()],
            vec![
                vec!["42".into(), "female".into()],
                vec!["".into(), "male".into()],
            ],
        );
        let html = ReportRenderer::new().qa_report(Path::new("person.csv"), &profile_table(&table))?;

        assert!(html.contains("<code>person.csv</code>"));
        assert!(html.contains("<h3>age <small>(integer)</small></h3>"));
        assert!(html.contains("<h3>gender <small>(text)</small></h3>"));
        assert!(html.contains("female (1)"));
        Ok(())
    }
}
