/// Escapes special characters for Telegram MarkdownV2
///
/// MarkdownV2 requires escaping: _ * [ ] ( ) ~ ` > # + - = | { } . !
///
/// The backslash itself is escaped first so already-escaped input does not
/// collapse into markup.
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len() * 2);

    for c in text.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '_' => result.push_str("\\_"),
            '*' => result.push_str("\\*"),
            '[' => result.push_str("\\["),
            ']' => result.push_str("\\]"),
            '(' => result.push_str("\\("),
            ')' => result.push_str("\\)"),
            '~' => result.push_str("\\~"),
            '`' => result.push_str("\\`"),
            '>' => result.push_str("\\>"),
            '#' => result.push_str("\\#"),
            '+' => result.push_str("\\+"),
            '-' => result.push_str("\\-"),
            '=' => result.push_str("\\="),
            '|' => result.push_str("\\|"),
            '{' => result.push_str("\\{"),
            '}' => result.push_str("\\}"),
            '.' => result.push_str("\\."),
            '!' => result.push_str("\\!"),
            _ => result.push(c),
        }
    }

    result
}

/// Joins the present lines with `\n`, skipping the absent ones.
pub fn join_present<I>(lines: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    lines.into_iter().flatten().collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markdown_basic() {
        assert_eq!(escape_markdown("hello"), "hello");
        assert_eq!(escape_markdown("hello world"), "hello world");
    }

    #[test]
    fn test_escape_markdown_all_special() {
        let input = r"_*[]()~`>#+-=|{}.!";
        let expected = r"\_\*\[\]\(\)\~\`\>\#\+\-\=\|\{\}\.\!";
        assert_eq!(escape_markdown(input), expected);
    }

    #[test]
    fn test_escape_markdown_backslash_and_cjk() {
        assert_eq!(escape_markdown(r"a\b"), r"a\\b");
        assert_eq!(escape_markdown("氣溫 28.5°C"), "氣溫 28\\.5°C");
    }

    #[test]
    fn test_join_present_skips_missing() {
        let text = join_present(vec![Some("a".to_string()), None, Some("c".to_string())]);
        assert_eq!(text, "a\nc");
        assert_eq!(join_present(Vec::<Option<String>>::new()), "");
    }
}
