//! Terminal rendering of pipeline output

use colored::Colorize;

use crate::cli::Verbosity;
use crate::types::{ChatOutcome, Evaluation, RagResponse};

/// Print a boundary outcome, pretty or as JSON
pub fn print_outcome(outcome: &ChatOutcome, verbosity: Verbosity, json: bool) -> serde_json::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    match outcome {
        ChatOutcome::Response(response) => print_response(response, verbosity),
        ChatOutcome::Failure { error } => eprintln!("{} {}", "❌ Error:".red().bold(), error),
    }
    Ok(())
}

/// Pretty-print a response
pub fn print_response(response: &RagResponse, verbosity: Verbosity) {
    println!("\n{}\n", response.answer);

    if !verbosity.show_details() {
        return;
    }

    if !response.sources.is_empty() {
        println!("{}", "📚 Sources".bold());
        for (i, source) in response.sources.iter().enumerate() {
            println!("  {}. {} {}", i + 1, source.title.cyan(), source.url.dimmed());
        }
        println!();
    }

    if !response.recommendations.is_empty() {
        println!("{}", "🔎 Related".bold());
        for rec in &response.recommendations {
            println!("  • {} ({:.2})", rec.title.cyan(), rec.score);
            println!("    {}", rec.snippet.dimmed());
        }
        println!();
    }

    print_evaluation(&response.evaluation);

    if verbosity.show_timings() && !response.context.is_empty() {
        println!("{}", "🧾 Context".bold());
        println!("{}\n", response.context.dimmed());
    }
}

/// One-paragraph summary of the forensic evaluation
pub fn print_evaluation(evaluation: &Evaluation) {
    println!("{}", "🧪 Evaluation".bold());
    match evaluation {
        Evaluation::Report(report) => {
            let verdict = if report.is_factually_correct() {
                "factually correct".green()
            } else {
                "not factually correct".red()
            };
            println!(
                "  {} · effectiveness: {} · confidence: {}",
                verdict, report.response_effectiveness, report.confidence_in_evaluation
            );
            let unsupported = report.unsupported_claims();
            if unsupported > 0 {
                println!(
                    "  {}",
                    format!("{} of {} claims not found in context", unsupported, report.context_matches.len())
                        .yellow()
                );
            }
            if !report.is_consistent() {
                println!("  {}", "verdict contradicts the claim matches".yellow());
            }
            for issue in &report.issues_identified {
                println!("  - {}", issue);
            }
        }
        Evaluation::Unparsed { error, .. } | Evaluation::Failed { error } => {
            println!("  {}", error.yellow());
        }
        Evaluation::Unavailable { raw_text } => println!("  {}", raw_text.dimmed()),
    }
    println!();
}
