mod styling;

use std::fmt::Write;

use crate::job::JobReport;

use styling::{detail, report_mark, stage_name, title};

/// Prints the `bluegreen` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        title("bluegreen"),
        detail(env!("CARGO_PKG_VERSION")),
        detail("Blue/green deployment stages")
    );
}

/// Prints the report sent for a stage to stderr.
pub fn print_report(stage: &str, report: &JobReport) {
    eprintln!("{}", render_report(stage, report));
}

fn render_report(stage: &str, report: &JobReport) -> String {
    let mut output = String::new();
    let _ = write!(output, "{} {}", report_mark(report), stage_name(stage));
    match report {
        JobReport::Success { output_variables } => {
            let _ = writeln!(output);
            for (name, value) in output_variables {
                let _ = writeln!(output, "  {} {value}", detail(format!("{name}:")));
            }
        }
        JobReport::Failure {
            message,
            failure_type,
        } => {
            let _ = writeln!(output, " {}", detail(failure_type.as_str()));
            let _ = writeln!(output, "  {message}");
        }
    }
    output
}
