//! Turning bare GitHub URLs in a log into titled markdown links.

use std::collections::BTreeMap;

use crate::github::LinkInfo;

pub(crate) const ENRICH_SYSTEM_PROMPT: &str = "You are a technical writing assistant. You will receive a raw markdown work log and a JSON object mapping GitHub URLs to their details (title, type, state, labels).

Your job:
- Replace bare GitHub URLs with formatted markdown links that include the title, e.g. [Fix auth bug (#123)](https://github.com/org/repo/pull/123)
- Keep the original meaning intact
- Do not add information that cannot be inferred from the log or issue/PR title
- Return only the enhanced markdown, no extra commentary or headings";

/// User prompt: the URL context as pretty JSON followed by the raw log.
pub(crate) fn enrich_user_prompt(raw: &str, links: &[LinkInfo]) -> String {
    let context: BTreeMap<&str, serde_json::Value> = links
        .iter()
        .map(|info| {
            (
                info.url.as_str(),
                serde_json::json!({
                    "title": info.title,
                    "number": info.number,
                    "type": info.kind,
                    "state": info.state,
                    "labels": info.labels,
                }),
            )
        })
        .collect();
    let context = serde_json::to_string_pretty(&context).unwrap_or_else(|_| "{}".to_string());

    format!("## GitHub Link Context\n```json\n{}\n```\n\n## Raw Work Log\n{}", context, raw)
}

/// Replace every bare occurrence of each link's URL with
/// `[<title> (#<number>)](<url>)`.
///
/// An occurrence is left alone when it sits directly inside `(...)` or
/// `[...]` (it is already part of a link) or when it is followed by another
/// digit (it is a prefix of a longer issue number).
pub fn apply_fallback_enrichment(markdown: &str, links: &[LinkInfo]) -> String {
    let mut result = markdown.to_string();
    for info in links {
        let label = format!("[{} (#{})]({})", info.title, info.number, info.url);
        result = replace_bare(&result, &info.url, &label);
    }
    result
}

fn replace_bare(text: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, _) in text.match_indices(needle) {
        if start < cursor {
            continue;
        }
        let end = start + needle.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();

        let wrapped = matches!(before, Some('(' | '[')) || matches!(after, Some(')' | ']'));
        let longer_number = after.is_some_and(|c| c.is_ascii_digit());
        if wrapped || longer_number {
            continue;
        }

        out.push_str(&text[cursor..start]);
        out.push_str(replacement);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::LinkKind;

    fn link(url: &str, number: u64, title: &str) -> LinkInfo {
        LinkInfo {
            url: url.to_string(),
            owner: "acme".to_string(),
            repo: "api".to_string(),
            number,
            kind: LinkKind::Pull,
            title: title.to_string(),
            state: "open".to_string(),
            labels: vec!["bug".to_string()],
        }
    }

    #[test]
    fn test_replaces_bare_url() {
        let links = [link("https://github.com/acme/api/pull/7", 7, "Fix auth")];
        let out = apply_fallback_enrichment("- Worked on https://github.com/acme/api/pull/7 today", &links);
        assert_eq!(
            out,
            "- Worked on [Fix auth (#7)](https://github.com/acme/api/pull/7) today"
        );
    }

    #[test]
    fn test_leaves_existing_links_alone() {
        let links = [link("https://github.com/acme/api/pull/7", 7, "Fix auth")];
        let input = "- [Fix auth (#7)](https://github.com/acme/api/pull/7)\n- <[https://github.com/acme/api/pull/7]>";
        assert_eq!(apply_fallback_enrichment(input, &links), input);
    }

    #[test]
    fn test_replaces_every_bare_occurrence() {
        let links = [link("https://github.com/acme/api/pull/7", 7, "T")];
        let out = apply_fallback_enrichment(
            "https://github.com/acme/api/pull/7 and https://github.com/acme/api/pull/7",
            &links,
        );
        assert_eq!(out.matches("[T (#7)]").count(), 2);
    }

    #[test]
    fn test_does_not_touch_longer_numbers() {
        let links = [link("https://github.com/acme/api/pull/1", 1, "One")];
        let input = "https://github.com/acme/api/pull/12 then https://github.com/acme/api/pull/1.";
        let out = apply_fallback_enrichment(input, &links);
        assert_eq!(
            out,
            "https://github.com/acme/api/pull/12 then [One (#1)](https://github.com/acme/api/pull/1)."
        );
    }

    #[test]
    fn test_no_links_is_identity() {
        assert_eq!(apply_fallback_enrichment("plain text", &[]), "plain text");
    }

    #[test]
    fn test_user_prompt_contains_context_and_log() {
        let links = [link("https://github.com/acme/api/pull/7", 7, "Fix auth")];
        let prompt = enrich_user_prompt("- did things", &links);
        assert!(prompt.starts_with("## GitHub Link Context\n```json\n"));
        assert!(prompt.contains("\"title\": \"Fix auth\""));
        assert!(prompt.contains("\"type\": \"pull\""));
        assert!(prompt.ends_with("## Raw Work Log\n- did things"));
    }
}
