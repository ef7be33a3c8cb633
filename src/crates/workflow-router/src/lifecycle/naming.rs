/// Longest agent name the runtime accepts
pub const MAX_AGENT_NAME_LEN: usize = 63;

const LAST_RESORT_NAME: &str = "workflow-agent";

/// Turn a workflow display name into a valid agent name.
///
/// Valid names are ASCII alphanumerics and single hyphens, at most 63
/// characters, starting and ending with an alphanumeric. Falls back to the
/// workflow id, then to a constant, so every input yields a valid name.
pub fn sanitize_agent_name(name: &str, workflow_id: &str) -> String {
    sanitize(name)
        .or_else(|| sanitize(workflow_id))
        .unwrap_or_else(|| LAST_RESORT_NAME.to_string())
}

fn sanitize(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len().min(MAX_AGENT_NAME_LEN));

    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
        if out.len() >= MAX_AGENT_NAME_LEN {
            break;
        }
    }

    out.truncate(MAX_AGENT_NAME_LEN);
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
