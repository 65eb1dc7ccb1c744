use std::path::PathBuf;

use clap::Parser;

use crate::chart::ViewOptions;
use crate::state::Page;

/// Salary insights and statistics for French towns.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Town table loaded at startup (.csv, .parquet or .json)
    #[arg(short, long, value_name = "FILE", default_value = "datasets/final_data.csv")]
    pub data: PathBuf,

    /// Page shown first
    #[arg(short, long, value_enum, default_value_t = Page::Overview)]
    pub page: Page,

    /// Start with a logarithmic salary axis
    #[arg(long)]
    pub log_axis: bool,

    /// Start with the salary axis cut at the outlier fences
    #[arg(long)]
    pub hide_outliers: bool,
}

impl Cli {
    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            log_axis: self.log_axis,
            hide_outliers: self.hide_outliers,
            ..ViewOptions::default()
        }
    }
}
