pub mod export;
pub mod formatter;

pub use export::write_summaries_csv;
pub use formatter::{
    format_evaluation_list, format_import_report, format_leaderboard, format_location_groups,
    format_model, format_team_detail, format_team_list, format_tier, format_tier_distribution,
    format_tier_groups, format_total, format_tsv, should_use_colors,
};
