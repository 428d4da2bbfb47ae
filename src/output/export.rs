use anyhow::{Context, Result};
use std::io::Write;

use crate::aggregate::TeamSummary;
use crate::scoring::ScoreModel;

/// Write summaries as CSV with a header row. One column per averaged field
/// and per boolean field of `model`, in model order.
pub fn write_summaries_csv<W: Write>(
    writer: W,
    summaries: &[TeamSummary],
    model: &ScoreModel,
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = ["rank", "team_id", "team", "location", "evaluations"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    header.extend(model.averaged_fields().map(|f| format!("{}_average", f.name)));
    header.push("overall_average".to_string());
    header.push("total_score_average".to_string());
    header.extend(model.boolean_fields().map(|f| format!("{}_percent", f.name)));
    header.push("tier".to_string());
    csv_writer
        .write_record(&header)
        .context("Failed to write CSV header")?;

    for (idx, summary) in summaries.iter().enumerate() {
        let mut row = vec![
            (idx + 1).to_string(),
            summary.team_id.to_string(),
            summary.display_name.clone(),
            summary.location.clone().unwrap_or_default(),
            summary.evaluation_count.to_string(),
        ];
        row.extend(
            summary
                .criterion_averages
                .iter()
                .map(|c| format!("{:.2}", c.average)),
        );
        row.push(format!("{:.2}", summary.overall_average));
        row.push(format!("{:.1}", summary.total_score_average));
        row.extend(
            summary
                .boolean_percentages
                .iter()
                .map(|b| format!("{:.1}", b.percentage)),
        );
        row.push(summary.tier.name().to_string());
        csv_writer
            .write_record(&row)
            .with_context(|| format!("Failed to write CSV row for team {}", summary.team_id))?;
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}
