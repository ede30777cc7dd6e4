use unicode_width::UnicodeWidthStr;

use crate::acquire::RunOutcome;
use crate::records::{live_count, StreamerRecord};

const HEADERS: [&str; 6] = ["#", "Channel", "Live", "Viewers", "Followers", "Category"];

/// Plain-text table of the listing. Columns are padded by display width so
/// Persian and wide glyphs line up.
pub fn render_table(records: &[StreamerRecord]) -> String {
    let rows: Vec<[String; 6]> = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            [
                (index + 1).to_string(),
                record.label().to_string(),
                match record.is_live {
                    Some(true) => "LIVE".to_string(),
                    Some(false) => "off".to_string(),
                    None => "-".to_string(),
                },
                optional_number(record.viewers),
                optional_number(record.followers),
                record
                    .category
                    .clone()
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(UnicodeWidthStr::width);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(UnicodeWidthStr::width(cell.as_str()));
        }
    }

    let mut out = String::new();
    push_row(&mut out, &HEADERS.map(str::to_string), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(rule.join("  ").as_str());
    out.push('\n');
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

/// One-line summary printed after the table.
pub fn summary_line(outcome: &RunOutcome) -> String {
    let elapsed = (outcome.finished_at - outcome.started_at).num_milliseconds() as f64 / 1000.0;
    let mut line = format!(
        "Loaded {}/{} channels ({} live) in {:.1}s",
        outcome.records.len(),
        outcome.total_planned,
        live_count(&outcome.records),
        elapsed
    );
    if !outcome.abandoned.is_empty() {
        line.push_str(&format!("; unreachable: {}", outcome.abandoned.join(", ")));
    }
    line
}

fn optional_number(value: Option<u64>) -> String {
    value
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn push_row(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| {
            let pad = width.saturating_sub(UnicodeWidthStr::width(cell.as_str()));
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect();
    out.push_str(padded.join("  ").trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::RunId;
    use chrono::{Duration, Local};

    #[test]
    fn pads_columns_by_display_width() {
        let mut live = StreamerRecord::new("Seenacrash");
        live.is_live = Some(true);
        live.viewers = Some(1200);
        live.category = Some("GTA V".to_string());
        let mut wide = StreamerRecord::new("Erph");
        wide.display_name = Some("ارف".to_string());

        let table = render_table(&[live, wide]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("#  Channel     Live"));
        assert!(lines[2].contains("LIVE"));
        assert!(lines[3].contains("ارف"));
        // the followers column is blank for both rows
        assert!(lines[3].contains(" -  "));
    }

    #[test]
    fn summary_lists_unreachable_channels() {
        let started_at = Local::now();
        let mut live = StreamerRecord::new("Keoxer");
        live.is_live = Some(true);
        let outcome = RunOutcome {
            run: RunId(1),
            records: vec![live, StreamerRecord::new("Erph")],
            abandoned: vec!["Fox_3pi".to_string()],
            total_planned: 3,
            retry_rounds: 3,
            started_at,
            finished_at: started_at + Duration::milliseconds(1500),
        };

        assert_eq!(
            summary_line(&outcome),
            "Loaded 2/3 channels (1 live) in 1.5s; unreachable: Fox_3pi"
        );
    }
}
