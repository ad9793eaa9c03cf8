//! Markdown builder for LLM contexts, and the shared session-history section.

use tracing::debug;

use crate::state::{WorkflowSession, WorkflowState};

/// Line-based markdown builder.
///
/// Headers, text, bold lines and code blocks are followed by a blank line;
/// bullets are not, so consecutive bullets form one list.
#[derive(Debug, Default, Clone)]
pub struct MarkdownBuilder {
    lines: Vec<String>,
}

impl MarkdownBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `# text`
    pub fn add_header(&mut self, text: &str) -> &mut Self {
        self.push_block(format!("# {}", text))
    }

    /// `## text`
    pub fn add_section(&mut self, text: &str) -> &mut Self {
        self.push_block(format!("## {}", text))
    }

    /// `### text`
    pub fn add_subsection(&mut self, text: &str) -> &mut Self {
        self.push_block(format!("### {}", text))
    }

    pub fn add_text(&mut self, text: &str) -> &mut Self {
        self.push_block(text.to_string())
    }

    /// `**label** value`, or just `**label**` when `value` is `None` or empty.
    pub fn add_bold_text(&mut self, label: &str, value: Option<&str>) -> &mut Self {
        match value.filter(|v| !v.is_empty()) {
            Some(v) => self.push_block(format!("**{}** {}", label, v)),
            None => self.push_block(format!("**{}**", label)),
        }
    }

    pub fn add_bullet(&mut self, text: &str) -> &mut Self {
        self.lines.push(format!("- {}", text));
        self
    }

    pub fn add_code_block(&mut self, content: &str) -> &mut Self {
        self.lines.push("```".to_string());
        self.lines.push(content.to_string());
        self.push_block("```".to_string())
    }

    pub fn add_separator(&mut self) -> &mut Self {
        self.push_block("---".to_string())
    }

    pub fn add_empty_line(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn build(&self) -> String {
        self.lines.join("\n")
    }

    fn push_block(&mut self, line: String) -> &mut Self {
        self.lines.push(line);
        self.lines.push(String::new());
        self
    }
}

/// Characters of the latest report shown in session context.
const REPORT_PREVIEW_CHARS: usize = 300;
/// Earlier sessions summarized after the latest one.
const SUMMARY_SESSIONS: usize = 3;

/// First `max_chars` characters of `text`, with `...` when cut.
pub fn text_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Renders prior-session history under a `## {title}` section.
///
/// The latest session is shown in detail; up to three earlier ones get a summary line.
pub fn add_session_context(builder: &mut MarkdownBuilder, state: &WorkflowState, title: &str) {
    let sessions = &state.workflow_sessions;
    builder.add_section(title);
    let Some((latest, earlier)) = sessions.split_last() else {
        debug!("no previous workflow sessions");
        builder.add_text(
            "**No previous session context available.** This is the first investigation session.",
        );
        return;
    };
    debug!(sessions = sessions.len(), "adding session context");

    builder
        .add_text(
            "**Note:** The following information comes from previous investigation sessions \
             and provides historical context to inform the current analysis.",
        )
        .add_empty_line()
        .add_bold_text("Total Previous Sessions:", Some(&sessions.len().to_string()))
        .add_subsection(&format!("Latest Session: {}", latest.session_id));

    add_latest_session(builder, latest);
    if !earlier.is_empty() {
        add_sessions_summary(builder, earlier);
    }
}

fn add_latest_session(builder: &mut MarkdownBuilder, session: &WorkflowSession) {
    if session.previous_report.is_empty() {
        builder.add_bold_text("Previous Investigation Report:", Some("Not available"));
    } else {
        builder
            .add_bold_text("Previous Investigation Report:", Some("Available"))
            .add_code_block(&text_preview(&session.previous_report, REPORT_PREVIEW_CHARS));
    }

    if session.learned_patterns.is_empty() {
        builder.add_bold_text(
            "Learned Patterns:",
            Some("No patterns identified in previous sessions"),
        );
    } else {
        builder
            .add_bold_text("Learned Patterns from Previous Sessions:", None)
            .add_text(&session.learned_patterns)
            .add_empty_line();
    }

    if session.device_relationships.is_empty() {
        builder.add_bold_text(
            "Device Relationships:",
            Some("No relationships identified in previous sessions"),
        );
    } else {
        builder
            .add_bold_text("Device Relationships from Previous Sessions:", None)
            .add_text(&session.device_relationships)
            .add_empty_line();
    }
}

fn add_sessions_summary(builder: &mut MarkdownBuilder, earlier: &[WorkflowSession]) {
    builder.add_subsection("Historical Sessions Summary").add_text(&format!(
        "**{} previous sessions** provide additional context:",
        earlier.len()
    ));
    let start = earlier.len().saturating_sub(SUMMARY_SESSIONS);
    for session in &earlier[start..] {
        let mut parts = Vec::new();
        if !session.previous_report.is_empty() {
            parts.push(format!("report ({} chars)", session.previous_report.len()));
        }
        if !session.learned_patterns.is_empty() {
            parts.push(format!("patterns ({} chars)", session.learned_patterns.len()));
        }
        if !session.device_relationships.is_empty() {
            parts.push(format!(
                "relationships ({} chars)",
                session.device_relationships.len()
            ));
        }
        let summary = if parts.is_empty() {
            "minimal data".to_string()
        } else {
            parts.join(", ")
        };
        builder.add_bullet(&format!("Session {}: {}", session.session_id, summary));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_renders_blocks_and_bullets() {
        let mut b = MarkdownBuilder::new();
        b.add_header("Title")
            .add_section("Sec")
            .add_bold_text("Role:", Some("core"))
            .add_bold_text("Plain:", Some(""))
            .add_bullet("a")
            .add_bullet("b")
            .add_code_block("x = 1");
        assert_eq!(
            b.build(),
            "# Title\n\n## Sec\n\n**Role:** core\n\n**Plain:**\n\n- a\n- b\n```\nx = 1\n```\n"
        );
    }

    #[test]
    fn text_preview_cuts_on_char_boundary() {
        assert_eq!(text_preview("short", 10), "short");
        assert_eq!(text_preview("ééééé", 2), "éé...");
    }

    #[test]
    fn session_context_without_history() {
        let mut b = MarkdownBuilder::new();
        add_session_context(&mut b, &WorkflowState::new("q"), "Historical Context");
        let out = b.build();
        assert!(out.starts_with("## Historical Context"));
        assert!(out.contains("No previous session context available"));
    }

    /// **Scenario**: Latest session in detail with report preview, earlier ones summarized (max 3).
    #[test]
    fn session_context_with_history() {
        let mut state = WorkflowState::new("q");
        for i in 0..5 {
            let mut s = WorkflowSession::new("x".repeat(400), format!("pattern {}", i), "");
            s.session_id = format!("s{}", i);
            state.record_session(s);
        }
        let mut b = MarkdownBuilder::new();
        add_session_context(&mut b, &state, "Workflow Session Context");
        let out = b.build();
        assert!(out.contains("**Total Previous Sessions:** 5"));
        assert!(out.contains("### Latest Session: s4"));
        assert!(out.contains(&format!("{}...", "x".repeat(300))));
        assert!(out.contains("pattern 4"));
        assert!(out.contains("No relationships identified"));
        assert!(out.contains("**4 previous sessions**"));
        assert!(out.contains("- Session s1: report (400 chars), patterns (9 chars)"));
        assert!(!out.contains("Session s0:"));
    }
}
