use serde_json::Value;

const WESTERN_HINT: &str = "western L→R, T→B";
const MANGA_HINT: &str = "manga R→L, T→B";

pub const USER_PROMPT: &str = "Analyze this page for reading order, bubbles, and composition.";

const SYSTEM_PROMPT: &str = r#"You are an art director for comics. Critique a single comic page sketch.
Focus on: (1) reading order ({reading_order} unless told otherwise),
(2) speech bubble placement vs art, (3) panel clarity and flow,
(4) glaring composition issues (competing focal points, tangents, cramped text).
Rules:
- Return a numbered list of 5–10 specific notes.
- Be concrete (“Move bubble in panel 3 up-left by ~10–15% to avoid covering the eyes.”).
- If unsure about panel count, say so and explain why.
- If text is unreadable, infer from layout and say so.
Output JSON only: {"notes":[ "...", "...", ... ]}"#;

/// Reading order the page is drawn for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadingStyle {
    #[default]
    Western,
    Manga,
}

impl ReadingStyle {
    /// Anything other than `manga` (trimmed, any case) reads western.
    pub fn from_form(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("manga") {
            ReadingStyle::Manga
        } else {
            ReadingStyle::Western
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            ReadingStyle::Western => WESTERN_HINT,
            ReadingStyle::Manga => MANGA_HINT,
        }
    }
}

pub fn build_system_prompt(style: ReadingStyle, goals: Option<&str>) -> String {
    let mut prompt = SYSTEM_PROMPT.replace("{reading_order}", style.hint());
    if let Some(goals) = goals.map(str::trim).filter(|g| !g.is_empty()) {
        prompt.push_str("\nThe artist's goals for this page: ");
        prompt.push_str(goals);
        prompt.push_str("\nWeigh every note against these goals.");
    }
    prompt
}

/// Pulls the note list out of whatever the model returned.
///
/// Content that is not JSON becomes a single note holding the raw text. A
/// parsed value without a `notes` list becomes a single note holding its
/// JSON text.
pub fn extract_notes(content: &str) -> Vec<String> {
    let parsed: Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(_) => return vec![content.to_string()],
    };

    match parsed.get("notes") {
        Some(Value::Array(items)) => items.iter().map(note_text).collect(),
        _ => vec![parsed.to_string()],
    }
}

fn note_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manga_swaps_reading_order() {
        let prompt = build_system_prompt(ReadingStyle::from_form("manga"), None);
        assert!(prompt.contains(MANGA_HINT));
        assert!(!prompt.contains(WESTERN_HINT));
    }

    #[test]
    fn unknown_style_reads_western() {
        assert_eq!(ReadingStyle::from_form("webtoon"), ReadingStyle::Western);
        assert_eq!(ReadingStyle::from_form(""), ReadingStyle::Western);
        assert_eq!(ReadingStyle::from_form(" Manga\n"), ReadingStyle::Manga);
    }

    #[test]
    fn goals_are_appended_when_present() {
        let prompt = build_system_prompt(ReadingStyle::Western, Some("  punchier splash page "));
        assert!(prompt.contains("goals for this page: punchier splash page\n"));

        let bare = build_system_prompt(ReadingStyle::Western, Some("   "));
        assert!(!bare.contains("goals"));
    }

    #[test]
    fn notes_are_taken_in_order() {
        let notes = extract_notes(r#"{"notes":["1. Move bubble","2. Fix tangent"]}"#);
        assert_eq!(notes, vec!["1. Move bubble", "2. Fix tangent"]);
    }

    #[test]
    fn plain_text_becomes_one_note() {
        assert_eq!(extract_notes("looks fine"), vec!["looks fine"]);
    }

    #[test]
    fn missing_notes_list_keeps_the_json() {
        let notes = extract_notes(r#"{"notes":"just one"}"#);
        assert_eq!(notes, vec![r#"{"notes":"just one"}"#]);
    }

    #[test]
    fn non_string_notes_are_stringified() {
        assert_eq!(extract_notes(r#"{"notes":[3, "ok"]}"#), vec!["3", "ok"]);
    }
}
