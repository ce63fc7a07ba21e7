//! Plain-text renderings of registry results.
//!
//! Everything here is pure formatting; nothing touches a registry.

use quire_core::address::ItemAddress;
use quire_core::history::{HistorySnapshot, HistoryStep};
use quire_core::item::{Item, ItemOutput, OutputRecord};
use quire_core::session::{ExecutionReport, ItemPreview, OperationReport, SessionSummary};
use std::fmt::Write;

const FOCUS_MARK: &str = ">";
const PREVIEW_CHARS: usize = 60;

/// Confirmation for an applied operation, with the items around its focus.
///
/// ```text
/// insert code at 1 (_3f2a9c01)
/// notebook: 3 items
///      0 [markdown] # Title
/// >    1 [code] x = 1
///      2 [code] print(x)
/// ```
pub fn render_operation(report: &OperationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", report.description);
    let _ = writeln!(out, "{}: {} items", report.session, report.item_count);

    if !report.removed.is_empty() {
        let _ = writeln!(out, "removed:");
        for item in &report.removed {
            let _ = writeln!(
                out,
                "  {} [{}] {}",
                item.id(),
                item.kind,
                item.first_line(PREVIEW_CHARS)
            );
        }
    }

    for preview in &report.context {
        out.push_str(&preview_line(preview));
        out.push('\n');
    }

    if report.evicted > 0 {
        let _ = writeln!(
            out,
            "history full: {} oldest operation(s) can no longer be undone",
            report.evicted
        );
    }
    out
}

fn preview_line(preview: &ItemPreview) -> String {
    let mark = if preview.focus { FOCUS_MARK } else { " " };
    format!(
        "{} {:>4} [{}] {}",
        mark, preview.index, preview.kind, preview.first_line
    )
}

/// Tab-separated listing with a header row.
pub fn render_listing(previews: &[ItemPreview]) -> String {
    let mut out = String::from("index\tid\tkind\tfirst_line\n");
    for preview in previews {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}",
            preview.index,
            preview.id,
            preview.kind,
            preview.first_line.replace('\t', " ")
        );
    }
    out
}

/// Full view of one item: header, content, then its output.
pub fn render_item(address: &ItemAddress, item: &Item) -> String {
    let mut out = format!("{} [{}]", address, item.kind);
    if let Some(count) = item.execution_count {
        let _ = write!(out, " run #{}", count);
    }
    if let Some(time) = &item.time_run {
        let _ = write!(out, " at {}", time);
    }
    out.push('\n');
    out.push_str(&item.content);
    if !item.content.ends_with('\n') {
        out.push('\n');
    }
    if !item.output.is_empty() {
        out.push_str("--- output ---\n");
        out.push_str(&render_output(&item.output));
    }
    out
}

/// Both history stacks, most recent first.
pub fn render_history(snapshot: &HistorySnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "undo ({}):", snapshot.undo.len());
    for (n, description) in snapshot.undo.iter().rev().enumerate() {
        let _ = writeln!(out, "  {}. {}", n + 1, description);
    }
    let _ = writeln!(out, "redo ({}):", snapshot.redo.len());
    for (n, description) in snapshot.redo.iter().rev().enumerate() {
        let _ = writeln!(out, "  {}. {}", n + 1, description);
    }
    out
}

/// Result of an undo or redo request; `action` is `"undo"` or `"redo"`.
pub fn render_history_step(action: &str, step: &HistoryStep) -> String {
    if step.performed == 0 {
        return format!("nothing to {}\n", action);
    }
    let mut out = if step.is_exhausted() {
        format!(
            "{}: {} of {} requested step(s), history exhausted\n",
            action, step.performed, step.requested
        )
    } else {
        format!("{}: {} step(s)\n", action, step.performed)
    };
    for description in &step.descriptions {
        let _ = writeln!(out, "  {}", description);
    }
    out
}

/// One line per session; the active one is marked.
pub fn render_sessions(summaries: &[SessionSummary]) -> String {
    if summaries.is_empty() {
        return "no sessions\n".to_string();
    }
    let mut out = String::new();
    for summary in summaries {
        let mark = if summary.is_active { "*" } else { " " };
        let kinds = summary
            .kind_counts
            .iter()
            .map(|(kind, count)| format!("{}: {}", kind, count))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(
            out,
            "{} {}  {} items",
            mark, summary.name, summary.item_count
        );
        if !kinds.is_empty() {
            let _ = write!(out, " ({})", kinds);
        }
        let _ = write!(
            out,
            "  undo {} / redo {}",
            summary.undo_depth, summary.redo_depth
        );
        if let Some(path) = &summary.backing_path {
            let _ = write!(out, "  {}", path.display());
        }
        if summary.is_dirty {
            out.push_str("  [modified]");
        }
        out.push('\n');
    }
    out
}

/// Text of an output slot.
pub fn render_output(output: &ItemOutput) -> String {
    match output {
        ItemOutput::Empty => String::new(),
        ItemOutput::Text(text) if text.ends_with('\n') => text.clone(),
        ItemOutput::Text(text) => format!("{}\n", text),
        ItemOutput::Records(records) => render_records(records),
    }
}

/// Text of engine output records in order.
///
/// Rich payloads without a `text/plain` form are shown as their MIME type.
pub fn render_records(records: &[OutputRecord]) -> String {
    let mut out = String::new();
    for record in records {
        match record {
            OutputRecord::Stream { name, text } if name == "stderr" => {
                for line in text.lines() {
                    let _ = writeln!(out, "[stderr] {}", line);
                }
            }
            OutputRecord::Stream { text, .. } => {
                out.push_str(text);
                if !text.ends_with('\n') {
                    out.push('\n');
                }
            }
            OutputRecord::ExecuteResult { data } | OutputRecord::DisplayData { data } => {
                match data.get("text/plain") {
                    Some(text) => {
                        let _ = writeln!(out, "{}", text.trim_end());
                    }
                    None => {
                        let mimes = data.keys().cloned().collect::<Vec<_>>().join(", ");
                        let _ = writeln!(out, "[{}]", mimes);
                    }
                }
            }
            OutputRecord::Error {
                ename,
                evalue,
                traceback,
            } => {
                for line in traceback {
                    let _ = writeln!(out, "{}", line);
                }
                let _ = writeln!(out, "{}: {}", ename, evalue);
            }
        }
    }
    out
}

/// Execution result with where it was stored.
pub fn render_execution(report: &ExecutionReport) -> String {
    let mut out = match &report.address {
        Some(address) => format!(
            "{}: ran {} [{}]\n",
            report.session, address, report.outcome.execution_count
        ),
        None => format!(
            "{}: ran [{}], item no longer present\n",
            report.session, report.outcome.execution_count
        ),
    };
    let body = render_records(&report.outcome.records);
    if body.is_empty() {
        out.push_str("(no output)\n");
    } else {
        out.push_str(&body);
    }
    out
}
