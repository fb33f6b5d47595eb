use std::process;

use replan_core::{parse_weekday, resolve_week_day, weekday_name, Resolution, ResolvedTarget};
use time::Date;

use crate::{print_json, report_error, Editor, OutputFormat};

/// Exit code when at least one phrase needs clarification.
const EXIT_AMBIGUOUS: i32 = 2;

pub(crate) async fn cmd_resolve(
    editor: &Editor,
    phrases: &[String],
    anchor: Option<Date>,
    schedule_id: Option<&str>,
    output: OutputFormat,
    quiet: bool,
) {
    let anchor = match anchor {
        Some(a) => Some(a),
        None => match editor.anchor_of(schedule_id).await {
            Ok(a) => a,
            Err(e) => {
                report_error(&format!("error: {}", e), output, quiet);
                process::exit(1);
            }
        },
    };
    let today = editor.today();

    let mut failed = false;
    let mut ambiguous = false;
    let mut json_results = Vec::new();

    for phrase in phrases {
        match editor.resolve_on(phrase, today, anchor) {
            Ok(resolution) => {
                if resolution.ambiguity().is_some() {
                    ambiguous = true;
                }
                match output {
                    OutputFormat::Json => {
                        let mut value = serde_json::to_value(&resolution)
                            .unwrap_or(serde_json::Value::Null);
                        if let Some(obj) = value.as_object_mut() {
                            obj.insert("phrase".to_string(), serde_json::json!(phrase));
                        }
                        json_results.push(value);
                    }
                    OutputFormat::Text => {
                        if !quiet {
                            print_resolution(phrase, &resolution);
                        }
                    }
                }
            }
            Err(e) => {
                failed = true;
                match output {
                    OutputFormat::Json => json_results.push(serde_json::json!({
                        "phrase": phrase,
                        "status": "unrecognized",
                        "error": e.to_string(),
                    })),
                    OutputFormat::Text => report_error(&format!("error: {}", e), output, quiet),
                }
            }
        }
    }

    if output == OutputFormat::Json && !quiet {
        print_json(&serde_json::json!({
            "today": today,
            "anchor": anchor,
            "results": json_results,
        }));
    }

    if failed {
        process::exit(1);
    }
    if ambiguous {
        process::exit(EXIT_AMBIGUOUS);
    }
}

fn print_resolution(phrase: &str, resolution: &Resolution) {
    match resolution {
        Resolution::Resolved(target) => {
            println!("{}: {}", phrase, describe(target));
        }
        Resolution::Ambiguous(ambiguity) => {
            println!("{}: {}", phrase, ambiguity.question);
            for (i, candidate) in ambiguity.candidates.iter().enumerate() {
                println!("  {}) {}", i + 1, describe(candidate));
            }
        }
    }
}

fn describe(target: &ResolvedTarget) -> String {
    match target.week {
        Some(week) => format!("{} -> {} (week {})", target.display_label, target.date, week),
        None => format!("{} -> {}", target.display_label, target.date),
    }
}

pub(crate) fn cmd_week_day(
    anchor: Date,
    week: u32,
    weekday: &str,
    output: OutputFormat,
    quiet: bool,
) {
    let Some(day) = parse_weekday(weekday) else {
        report_error(
            &format!("error: unknown weekday '{}'", weekday),
            output,
            quiet,
        );
        process::exit(1);
    };

    let Some(date) = resolve_week_day(week, day, anchor) else {
        report_error(
            &format!("error: week {} has no date window (weeks start at 1)", week),
            output,
            quiet,
        );
        process::exit(1);
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "anchor": anchor,
            "week": week,
            "weekday": weekday_name(day),
            "date": date,
        })),
        OutputFormat::Text => println!("{}", date),
    }
}
