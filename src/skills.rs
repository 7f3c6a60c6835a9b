//! Prompt-side helpers: persona, recent-chat summarizer, and output blocklist.
//! All pure and deterministic.

pub const BASE_PERSONA: &str =
    "You are an 'imposter' blending into a group chat. Keep replies short, casual, and context-aware.";

const BLOCKLIST: &[&str] = &["hateword1", "slur2"];

const SUMMARY_WINDOW: usize = 5;

/// Compose the system prompt from the base persona plus an optional bias hint.
pub fn build_system(bias: &str) -> String {
    if bias.is_empty() {
        BASE_PERSONA.to_string()
    } else {
        format!("{BASE_PERSONA}\nBias hints: {bias}")
    }
}

/// Reduce recent chat into a compact user prompt: the last 5 lines in order,
/// or a default greeting when there is no context.
pub fn summarize_recent(lines: &[String]) -> String {
    if lines.is_empty() {
        return "hello".to_string();
    }
    let start = lines.len().saturating_sub(SUMMARY_WINDOW);
    lines[start..].join("\n")
}

/// Mask every blocklisted substring with an equal-length run of `*`.
/// Plain substring replacement; already-masked text is not re-scanned.
pub fn sanitize(text: &str) -> String {
    let mut out = text.to_string();
    for word in BLOCKLIST {
        out = out.replace(word, &"*".repeat(word.len()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_system_without_bias() {
        assert_eq!(build_system(""), BASE_PERSONA);
    }

    #[test]
    fn test_build_system_appends_bias_hints() {
        let prompt = build_system("the->cat");
        assert_eq!(prompt, format!("{BASE_PERSONA}\nBias hints: the->cat"));
    }

    #[test]
    fn test_summarize_empty_returns_greeting() {
        assert_eq!(summarize_recent(&[]), "hello");
    }

    #[test]
    fn test_summarize_short_input_keeps_everything() {
        assert_eq!(summarize_recent(&lines(&["a", "b", "c"])), "a\nb\nc");
    }

    #[test]
    fn test_summarize_takes_last_five_in_order() {
        let out = summarize_recent(&lines(&["1", "2", "3", "4", "5", "6", "7"]));
        assert_eq!(out, "3\n4\n5\n6\n7");
    }

    #[test]
    fn test_sanitize_masks_blocklisted_words() {
        let out = sanitize("say hateword1 now");
        assert_eq!(out, "say ********* now");
        assert!(!out.contains("hateword1"));
    }

    #[test]
    fn test_sanitize_masks_every_occurrence() {
        let out = sanitize("slur2 and slur2");
        assert_eq!(out, "***** and *****");
    }

    #[test]
    fn test_sanitize_leaves_clean_text_alone() {
        assert_eq!(sanitize("all good here"), "all good here");
    }
}
