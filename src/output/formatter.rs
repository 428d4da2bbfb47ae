use std::io::IsTerminal;
use owo_colors::OwoColorize;
use terminal_size::{Width, terminal_size};

use crate::aggregate::{LocationGroup, TeamSummary, TierGroup};
use crate::evaluations::Evaluation;
use crate::scoring::{ScoreModel, Tier};
use crate::teams::{display_name, ImportReport, Team};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate a name to fit available width, accounting for Unicode
fn truncate_name(name: &str, max_width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Total-score average against the model's maximum, e.g. "15.0/20"
pub fn format_total(average: f64, max: i64) -> String {
    format!("{:.1}/{}", average, max)
}

/// Tier name, colored by rank when colors are on
pub fn format_tier(tier: Tier, use_colors: bool) -> String {
    if !use_colors {
        return tier.name().to_string();
    }
    match tier {
        Tier::AgenticAce => tier.name().green().bold().to_string(),
        Tier::CognitiveCrafter => tier.name().cyan().to_string(),
        Tier::NeuralNovice => tier.name().yellow().to_string(),
        Tier::BootingBot => tier.name().red().to_string(),
    }
}

/// Format summaries as a ranked table with columns: Index, Total, Team,
/// Evaluations, Tier. No headers.
pub fn format_leaderboard(summaries: &[TeamSummary], model: &ScoreModel, use_colors: bool) -> String {
    if summaries.is_empty() {
        return "No evaluations found.".to_string();
    }

    let max = model.total_max();
    let total_width = format_total(max as f64, max).len();
    let count_width = 9; // fits "99 evals"
    let tier_width = 17;
    let separator = "  ";

    // Name column: widest name, narrowed to what the terminal leaves over
    let widest = summaries
        .iter()
        .map(|s| s.display_name.chars().count())
        .max()
        .unwrap_or(0);
    let fixed_width = 4 + total_width + count_width + tier_width + separator.len() * 3;
    let name_width = match get_terminal_width() {
        Some(width) if width > fixed_width + 10 => widest.min(width - fixed_width),
        Some(_) => widest.min(20),
        None => widest,
    };

    summaries
        .iter()
        .enumerate()
        .map(|(idx, summary)| {
            let index_str = format!("{:>2}.", idx + 1);
            let total = format!(
                "{:>width$}",
                format_total(summary.total_score_average, max),
                width = total_width
            );
            let name = format!(
                "{:<width$}",
                truncate_name(&summary.display_name, name_width),
                width = name_width
            );
            let count = format!(
                "{:>width$}",
                format!("{} eval{}", summary.evaluation_count, if summary.evaluation_count == 1 { "" } else { "s" }),
                width = count_width
            );
            let tier = format_tier(summary.tier, use_colors);

            if use_colors {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    index_str.dimmed(),
                    total.bold(),
                    separator,
                    name,
                    separator,
                    count.dimmed(),
                    separator,
                    tier
                )
            } else {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    index_str, total, separator, name, separator, count, separator, tier
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_heading(title: &str, use_colors: bool) -> String {
    if use_colors {
        title.bold().underline().to_string()
    } else {
        title.to_string()
    }
}

/// Leaderboard split per location, one headed block per location
pub fn format_location_groups(groups: &[LocationGroup], model: &ScoreModel, use_colors: bool) -> String {
    if groups.is_empty() {
        return "No evaluations found.".to_string();
    }

    groups
        .iter()
        .map(|group| {
            format!(
                "{}\n{}",
                format_heading(&group.location, use_colors),
                format_leaderboard(&group.summaries, model, use_colors)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Tiered view, highest tier first, each headed with its lower bound
pub fn format_tier_groups(groups: &[TierGroup], model: &ScoreModel, use_colors: bool) -> String {
    if groups.is_empty() {
        return "No evaluations found.".to_string();
    }

    groups
        .iter()
        .map(|group| {
            let bound = match model.tiers().lower_bound(group.tier) {
                Some(bound) => format!(
                    "{} (>= {:.1})",
                    group.tier.name(),
                    bound
                ),
                None => group.tier.name().to_string(),
            };
            format!(
                "{}\n{}",
                format_heading(&bound, use_colors),
                format_leaderboard(&group.summaries, model, use_colors)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One line per tier with its team count
pub fn format_tier_distribution(distribution: &[(Tier, usize)]) -> String {
    distribution
        .iter()
        .map(|(tier, count)| format!("{:<17}  {}", tier.name(), count))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a team summary with per-criterion detail (for `summary`)
pub fn format_team_detail(summary: &TeamSummary, model: &ScoreModel, use_colors: bool) -> String {
    let mut lines = Vec::new();

    let title = match summary.location {
        Some(ref location) => format!("{} ({})", summary.display_name, location),
        None => summary.display_name.clone(),
    };
    lines.push(if use_colors { title.bold().to_string() } else { title });
    lines.push(format!("  Evaluations: {}", summary.evaluation_count));
    lines.push(format!(
        "  Total: {}  {}",
        format_total(summary.total_score_average, model.total_max()),
        format_tier(summary.tier, use_colors)
    ));
    lines.push(format!("  Overall average: {:.2}", summary.overall_average));

    let name_width = summary
        .criterion_averages
        .iter()
        .map(|c| c.field.len())
        .max()
        .unwrap_or(0);
    lines.push("  Criteria:".to_string());
    for criterion in &summary.criterion_averages {
        let (min, max) = model.range_for(&criterion.field).unwrap_or((0, 0));
        // Label of the nearest level
        let label = model
            .label_for(&criterion.field, criterion.average.round() as i64)
            .unwrap_or_default();
        lines.push(format!(
            "    {:<width$}  {:>5.2}  ({}-{})  {}",
            criterion.field,
            criterion.average,
            min,
            max,
            label,
            width = name_width
        ));
    }

    for boolean in &summary.boolean_percentages {
        lines.push(format!("  {}: {:.1}%", boolean.field, boolean.percentage));
    }

    lines.join("\n")
}

/// Format summaries as tab-separated values for scripting
/// Columns: rank, team_id, team, location, evaluations, total_average,
/// overall_average, tier (no headers, no colors)
pub fn format_tsv(summaries: &[TeamSummary]) -> String {
    if summaries.is_empty() {
        return String::new();
    }

    summaries
        .iter()
        .enumerate()
        .map(|(idx, summary)| {
            format!(
                "{}\t{}\t{}\t{}\t{}\t{:.1}\t{:.2}\t{}",
                idx + 1,
                summary.team_id,
                tsv_field(&summary.display_name),
                tsv_field(summary.location.as_deref().unwrap_or("")),
                summary.evaluation_count,
                summary.total_score_average,
                summary.overall_average,
                summary.tier.name()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tabs and line breaks would split a TSV row, so they become spaces.
fn tsv_field(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

/// Format teams one per line: id, number, display name, location, status
pub fn format_team_list(teams: &[Team], use_colors: bool) -> String {
    if teams.is_empty() {
        return "No teams registered.".to_string();
    }

    let name_width = teams
        .iter()
        .map(|t| t.display_name().chars().count())
        .max()
        .unwrap_or(0);

    teams
        .iter()
        .map(|team| {
            let id = format!("{:>4}", team.id);
            let number = team
                .number
                .map(|n| format!("#{}", n))
                .unwrap_or_else(|| "-".to_string());
            let line = format!(
                "{}  {:>5}  {:<width$}  {}",
                id,
                number,
                team.display_name(),
                team.location.as_deref().unwrap_or("-"),
                width = name_width
            );
            match (team.active, use_colors) {
                (true, _) => line,
                (false, true) => format!("{}  {}", line.dimmed(), "inactive".dimmed()),
                (false, false) => format!("{}  inactive", line),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format raw evaluations: id, team, judge, total, last update
pub fn format_evaluation_list(
    evaluations: &[&Evaluation],
    teams: &[Team],
    model: &ScoreModel,
    use_colors: bool,
) -> String {
    if evaluations.is_empty() {
        return "No evaluations found.".to_string();
    }

    let team_name = |id: u64| {
        teams
            .iter()
            .find(|t| t.id == id)
            .map(Team::display_name)
            .unwrap_or_else(|| display_name(id, None, None))
    };

    evaluations
        .iter()
        .map(|evaluation| {
            let total = format!(
                "{}/{}",
                model.total_score(&evaluation.scores),
                model.total_max()
            );
            let updated = evaluation.updated_at.format("%Y-%m-%d %H:%M").to_string();
            let edited = if evaluation.updated_at != evaluation.created_at {
                " (edited)"
            } else {
                ""
            };
            if use_colors {
                format!(
                    "{:>4}  {:>7}  {}  {}  {}{}",
                    evaluation.id.dimmed(),
                    total.bold(),
                    team_name(evaluation.team_id).cyan(),
                    evaluation.participant_name.yellow(),
                    updated.dimmed(),
                    edited
                )
            } else {
                format!(
                    "{:>4}  {:>7}  {}  {}  {}{}",
                    evaluation.id,
                    total,
                    team_name(evaluation.team_id),
                    evaluation.participant_name,
                    updated,
                    edited
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Describe the active score model: fields, ranges, labels and tier bounds
pub fn format_model(model: &ScoreModel) -> String {
    let mut lines = vec![format!(
        "Score model: {} (total out of {})",
        model.name(),
        model.total_max()
    )];

    for field in model.fields() {
        let mut line = format!("  {} [{}-{}]", field.name, field.min, field.max);
        if !field.counts_toward_total() {
            line.push_str(" (not totalled)");
        }
        if !field.question.is_empty() {
            line.push_str(&format!("  {}", field.question));
        }
        lines.push(line);
        if !field.labels.is_empty() {
            let labels = field
                .labels
                .iter()
                .enumerate()
                .map(|(i, label)| format!("{}={}", field.min + i as i64, label))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("      {}", labels));
        }
    }

    lines.push("Tiers:".to_string());
    for tier in Tier::DESCENDING {
        let bound = match model.tiers().lower_bound(tier) {
            Some(bound) => format!(">= {:.1}", bound),
            None => "below".to_string(),
        };
        lines.push(format!("  {:<17}  {}", tier.name(), bound));
    }

    lines.join("\n")
}

/// Summarize a bulk import: success count, then one line per skipped row
pub fn format_import_report(report: &ImportReport) -> String {
    let mut lines = vec![format!(
        "Imported {} team{}, skipped {} row{}.",
        report.success_count,
        if report.success_count == 1 { "" } else { "s" },
        report.errors.len(),
        if report.errors.len() == 1 { "" } else { "s" }
    )];
    for error in &report.errors {
        lines.push(format!(
            "  row {}: {} ({})",
            error.row_index, error.reason, error.message
        ));
    }
    lines.join("\n")
}
