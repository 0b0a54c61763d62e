use colored::Colorize;
use musaic_core::Summary;
use std::time::Instant;

/// Print a snapshot summary with colored labels.
pub(crate) fn print_summary(summary: &Summary) {
    let line = "-".repeat(60);
    println!(
        "{}",
        format!("*** {} SUMMARY ***", summary.kind.to_uppercase())
            .cyan()
            .bold()
    );
    println!("{}", line.dimmed());
    for (label, value) in &summary.fields {
        println!("{} {}", format!("{}:", label.to_uppercase()).magenta(), value);
    }
    println!("{}", line.dimmed());
}

/// Format the time since `start` for status lines.
pub(crate) fn elapsed(start: Instant) -> String {
    format!("{:.2}s", start.elapsed().as_secs_f64())
}
