//! Multi-day summaries.

use crate::models::LogDate;

pub const NO_LOGS_MESSAGE: &str = "No work logs found for the selected date range.";

/// Longest range a single summary may cover, in days.
pub const MAX_SUMMARY_DAYS: i64 = 366;

pub(crate) const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful work log summarization assistant.
You will be provided with a collection of work logs from a developer.
Your goal is to summarize them according to the user's specific instructions.
If no specific instructions are provided, assume a default summary focusing on what was completed and what is in progress.
Maintain a professional but concise tone. Use Markdown for formatting.";

const DEFAULT_INSTRUCTIONS: &str = "Summarize the key achievements and tasks worked on.";

/// Join day logs as `## <date>\n\n<content>` sections separated by rules.
pub fn format_logs(logs: &[(LogDate, String)]) -> String {
    logs.iter()
        .map(|(date, content)| format!("## {}\n\n{}", date, content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

pub(crate) fn summary_user_prompt(collected: &str, prompt: Option<&str>) -> String {
    let instructions = prompt
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_INSTRUCTIONS);
    format!(
        "### User Instructions\n{}\n\n### Work Logs\n{}",
        instructions, collected
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_logs_sections() {
        let logs = vec![
            ("2024-05-01".parse().unwrap(), "- a\n".to_string()),
            ("2024-05-02".parse().unwrap(), "\n- b".to_string()),
        ];
        assert_eq!(
            format_logs(&logs),
            "## 2024-05-01\n\n- a\n\n---\n\n## 2024-05-02\n\n- b"
        );
    }

    #[test]
    fn test_user_prompt_default_instructions() {
        let prompt = summary_user_prompt("LOGS", Some("  "));
        assert!(prompt.contains(DEFAULT_INSTRUCTIONS));
        assert!(prompt.ends_with("### Work Logs\nLOGS"));

        let prompt = summary_user_prompt("LOGS", Some("Bullet points only"));
        assert!(prompt.starts_with("### User Instructions\nBullet points only\n"));
    }
}
