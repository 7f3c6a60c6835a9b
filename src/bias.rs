use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z']+").expect("Valid regex pattern"));

const MAX_MESSAGES: usize = 100;
const TOP_BIGRAMS: usize = 10;

/// Build a steering hint from recent chat: the 10 most frequent word bigrams,
/// rendered as `"a->b, c->d"`. Ties rank by first encounter. Bigrams are taken
/// over the flattened token stream, so a pair may span a message boundary.
pub fn build_bias(messages: &[String]) -> String {
    let start = messages.len().saturating_sub(MAX_MESSAGES);
    let mut words: Vec<String> = Vec::new();
    for message in &messages[start..] {
        let lowered = message.to_lowercase();
        words.extend(WORD_RE.find_iter(&lowered).map(|m| m.as_str().to_string()));
    }

    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    let mut order: Vec<(&str, &str)> = Vec::new();
    for pair in words.windows(2) {
        let key = (pair[0].as_str(), pair[1].as_str());
        let count = counts.entry(key).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    // Stable sort keeps first-encountered order among equal counts.
    order.sort_by_key(|key| Reverse(counts[key]));
    order
        .iter()
        .take(TOP_BIGRAMS)
        .map(|(a, b)| format!("{a}->{b}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_input_yields_empty_bias() {
        assert_eq!(build_bias(&[]), "");
    }

    #[test]
    fn test_single_word_has_no_bigram() {
        assert_eq!(build_bias(&lines(&["hello"])), "");
    }

    #[test]
    fn test_repeated_pair_ranks_first() {
        let bias = build_bias(&lines(&["the cat sat", "the cat ran"]));
        assert!(bias.starts_with("the->cat"), "got: {bias}");
        assert!(bias.contains("cat->sat"));
        assert!(bias.contains("cat->ran"));
    }

    #[test]
    fn test_ties_keep_first_encountered_order() {
        let bias = build_bias(&lines(&["z y x w"]));
        assert_eq!(bias, "z->y, y->x, x->w");
    }

    #[test]
    fn test_bigrams_span_message_boundaries() {
        let bias = build_bias(&lines(&["one two", "three four"]));
        assert!(bias.contains("two->three"), "got: {bias}");
    }

    #[test]
    fn test_at_most_ten_pairs() {
        let bias = build_bias(&lines(&["a b c d e f g h i j k l m"]));
        assert_eq!(bias.split(", ").count(), 10);
    }

    #[test]
    fn test_punctuation_and_digits_ignored_apostrophe_kept() {
        let bias = build_bias(&lines(&["it's 42 fine!"]));
        assert_eq!(bias, "it's->fine");
    }

    #[test]
    fn test_tokens_are_lowercased() {
        let bias = build_bias(&lines(&["The Cat", "the cat"]));
        assert!(bias.starts_with("the->cat"));
    }

    #[test]
    fn test_only_last_hundred_messages_count() {
        let mut messages = lines(&["olda oldb"; 5]);
        messages.extend(lines(&["x y"; 100]));
        let bias = build_bias(&messages);
        assert!(!bias.contains("olda"), "got: {bias}");
        assert!(bias.starts_with("x->y"));
    }
}
