use crate::models::ReportFormat;
use chrono::{DateTime, Local, TimeZone};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn render_report(insights: &str, query: &str, format: ReportFormat) -> String {
    render_report_at(insights, query, format, &Local::now())
}

pub fn render_report_at<Tz>(
    insights: &str,
    query: &str,
    format: ReportFormat,
    generated_at: &DateTime<Tz>,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let timestamp = generated_at.format(TIMESTAMP_FORMAT).to_string();
    match format {
        ReportFormat::Markdown => format!(
            "# Report\n\n**Generated:** {timestamp}\n\n**Query:** {query}\n\n**Insights:**\n{insights}"
        ),
        ReportFormat::Csv => format!(
            "Query,Insights,Timestamp\n{},{},{}\n",
            csv_field(query),
            csv_field(insights),
            csv_field(&timestamp)
        ),
        ReportFormat::Plain => insights.to_string(),
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
