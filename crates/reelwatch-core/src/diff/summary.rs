//! Human-readable summary renderer for diffs.

use crate::diff::model::DiffResult;

/// Render a plain-text summary of a [`DiffResult`] for logs and the CLI.
///
/// Informational only; the structured diff is the artifact of record.
pub fn render_diff_summary(diff: &DiffResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Diff at {} (current {})\n",
        diff.created_at.to_rfc3339(),
        short(&diff.current_digest)
    ));

    match &diff.reference {
        None => out.push_str("Reference: none (bootstrap)\n"),
        Some(reference) => out.push_str(&format!(
            "Reference: {} ({})\n",
            reference.location.as_deref().unwrap_or("<unpersisted>"),
            short(&reference.content_digest)
        )),
    }

    if diff.entries.is_empty() {
        out.push_str("No new records.\n");
    } else {
        out.push_str(&format!("New records ({}):\n", diff.entries.len()));
        for entry in &diff.entries {
            let record = &entry.record;
            out.push_str(&format!(
                "  + {} {} {}",
                record.title, record.occurrence_date, record.occurrence_time
            ));
            if let Some(screen) = &record.screen {
                out.push_str(&format!(" [{}]", screen));
            }
            out.push_str(&format!("  ({})\n", entry.key));
        }
    }

    if !diff.duplicate_keys.is_empty() {
        out.push_str(&format!(
            "Duplicate keys in current snapshot ({}):\n",
            diff.duplicate_keys.len()
        ));
        for key in &diff.duplicate_keys {
            out.push_str(&format!("  ! {}\n", key));
        }
    }

    out
}

fn short(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}
