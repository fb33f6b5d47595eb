use std::path::Path;
use std::process;

use replan_core::{weekday_name, CanonicalSchedule};
use replan_storage::ScheduleStorage;

use crate::{print_json, report_error, Editor, OutputFormat};

pub(crate) async fn cmd_init(
    editor: &Editor,
    schedule_id: &str,
    file: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let text = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(_) => {
            let msg = format!("error: schedule file not found: {}", file.display());
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let schedule: CanonicalSchedule = match serde_json::from_str(&text) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error: invalid schedule in {}: {}", file.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    match editor
        .storage()
        .initialize_schedule(schedule_id, schedule)
        .await
    {
        Ok(record) => {
            if quiet {
                return;
            }
            match output {
                OutputFormat::Json => print_json(&record),
                OutputFormat::Text => println!(
                    "Initialized schedule {} ({} days, version {})",
                    record.schedule_id,
                    record.schedule.len(),
                    record.version()
                ),
            }
        }
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) async fn cmd_show(editor: &Editor, schedule_id: &str, output: OutputFormat, quiet: bool) {
    let record = match editor.schedule(schedule_id).await {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => print_json(&record),
        OutputFormat::Text => {
            let schedule = &record.schedule;
            println!(
                "Schedule {} (version {}, anchor {})",
                record.schedule_id,
                schedule.version(),
                schedule.anchor_date()
            );
            for day in schedule.days() {
                let week = schedule
                    .week_of(day.date)
                    .map(|w| format!("W{:<2}", w))
                    .unwrap_or_else(|| "   ".to_string());
                let weekday = weekday_name(day.date.weekday());
                let mut line = format!(
                    "  {} {} {:<3} {:<6} {}",
                    week,
                    day.date,
                    weekday.get(..3).unwrap_or(weekday),
                    day.category.as_str(),
                    day.label
                );
                if let Some(tag) = &day.tag {
                    line.push_str(&format!(" [{}]", tag));
                }
                if day.completed {
                    line.push_str(" (completed)");
                }
                println!("{}", line);
                for note in &day.annotations {
                    println!("        - {}", note);
                }
            }
        }
    }
}

pub(crate) async fn cmd_list(editor: &Editor, output: OutputFormat, quiet: bool) {
    let ids = match editor.storage().list_schedules().await {
        Ok(ids) => ids,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => print_json(&serde_json::json!({ "schedules": ids })),
        OutputFormat::Text => {
            for id in ids {
                println!("{}", id);
            }
        }
    }
}
