use std::fmt::Display;

use console::{style, StyledObject};

use crate::job::JobReport;

pub fn title<D: Display>(text: D) -> StyledObject<D> {
    style(text).magenta().bold()
}

pub fn stage_name(stage: &str) -> StyledObject<&str> {
    style(stage).cyan()
}

pub fn detail<D: Display>(text: D) -> StyledObject<D> {
    style(text).dim()
}

/// Check mark for a success report, cross for a failure.
pub fn report_mark(report: &JobReport) -> StyledObject<&'static str> {
    if report.is_success() {
        style("✔").green().bright()
    } else {
        style("✘").red().bright()
    }
}
