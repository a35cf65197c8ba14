use colored::Colorize;
use std::io::{self, Write};

use crate::config::Site;
use crate::models::EvaluationOutcome;

const HEADER_RULE: &str = "------------------------------------------------------------------------------------------";
const SITE_RULE: &str = "---------------------------------------------";

/// Print one tick's outcomes grouped under their site, in site order.
pub fn render<W: Write>(out: &mut W, sites: &[Site], results: &[EvaluationOutcome]) -> io::Result<()> {
    writeln!(out, "{}", HEADER_RULE.white())?;
    for site in sites {
        for result in results.iter().filter(|r| r.title == site.title) {
            let marker = if result.pass { "[ OK ]" } else { "[ ERROR ]" };
            let line = format!("{} {} - {} ({})", marker, result.title, result.target_title, result.url);
            if result.pass {
                writeln!(out, "{}", line.green())?;
                continue;
            }
            writeln!(out, "{}", line.red())?;
            writeln!(out, "{}", "ERRORS:".cyan().on_black())?;
            for err in &result.errors {
                let detail = format!("{} > {}", err.kind.describe(), err.failed_assertion);
                writeln!(out, "{}", detail.cyan().on_black())?;
            }
        }
        writeln!(out, "{}", SITE_RULE.bright_black())?;
    }
    out.flush()
}
