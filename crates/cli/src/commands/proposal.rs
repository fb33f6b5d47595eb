use std::path::Path;
use std::process;

use replan_core::{PatchProposal, ProposalId, ProposedPatch};
use replan_engine::{CommitError, CommitResult, ProposeError};

use crate::{print_json, report_error, Editor, OutputFormat};

pub(crate) async fn cmd_propose(
    editor: &Editor,
    schedule_id: &str,
    file: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let text = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(_) => {
            let msg = format!("error: patch file not found: {}", file.display());
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let drafts: Vec<ProposedPatch> = match serde_json::from_str(&text) {
        Ok(d) => d,
        Err(e) => {
            let msg = format!("error: invalid patches in {}: {}", file.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    match editor.propose(schedule_id, &drafts).await {
        Ok(proposal) => {
            if quiet {
                return;
            }
            match output {
                OutputFormat::Json => print_json(&proposal),
                OutputFormat::Text => print_proposal(&proposal),
            }
        }
        Err(ProposeError::Rejected(report)) => {
            match output {
                OutputFormat::Json => {
                    if !quiet {
                        print_json(&serde_json::json!({
                            "status": "rejected",
                            "report": report,
                        }));
                    }
                }
                OutputFormat::Text => {
                    report_error(&format!("rejected: {}", report), output, quiet);
                }
            }
            process::exit(1);
        }
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) async fn cmd_proposal(editor: &Editor, id: &str, output: OutputFormat, quiet: bool) {
    match editor.proposal(&ProposalId::from(id)).await {
        Ok(proposal) => {
            if quiet {
                return;
            }
            match output {
                OutputFormat::Json => print_json(&proposal),
                OutputFormat::Text => print_proposal(&proposal),
            }
        }
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) async fn cmd_discard(editor: &Editor, id: &str, output: OutputFormat, quiet: bool) {
    let id = ProposalId::from(id);
    match editor.discard(&id).await {
        Ok(()) => {
            if quiet {
                return;
            }
            match output {
                OutputFormat::Json => {
                    print_json(&serde_json::json!({ "discarded": id }));
                }
                OutputFormat::Text => println!("Discarded proposal {}", id),
            }
        }
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) async fn cmd_commit(
    editor: &Editor,
    id: &str,
    version: u64,
    output: OutputFormat,
    quiet: bool,
) {
    match editor.commit(&ProposalId::from(id), version).await {
        Ok(result) => {
            if quiet {
                return;
            }
            match output {
                OutputFormat::Json => print_json(&result),
                OutputFormat::Text => print_commit(&result),
            }
        }
        Err(CommitError::Rejected(report)) => {
            report_error(&format!("rejected: {}", report), output, quiet);
            process::exit(1);
        }
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) async fn cmd_purge(editor: &Editor, output: OutputFormat, quiet: bool) {
    match editor.purge_expired().await {
        Ok(removed) => {
            if quiet {
                return;
            }
            match output {
                OutputFormat::Json => print_json(&serde_json::json!({ "removed": removed })),
                OutputFormat::Text => println!("Removed {} expired proposal(s)", removed),
            }
        }
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn print_proposal(proposal: &PatchProposal) {
    println!("Proposal {}", proposal.id);
    println!(
        "  schedule {} at version {}, expires {}",
        proposal.schedule_id, proposal.schedule_version_at_creation, proposal.expires_at
    );
    for patch in proposal.patches.patches() {
        println!("  {} {:<7} {}", patch.date, patch.action.to_string(), patch.label);
    }
}

fn print_commit(result: &CommitResult) {
    println!(
        "Committed proposal {} to {} (version {} -> {})",
        result.proposal_id, result.schedule_id, result.previous_version, result.new_version
    );
    for change in &result.changes {
        println!(
            "  {}: {} -> {}",
            change.date, change.before.label, change.after.label
        );
    }
}
