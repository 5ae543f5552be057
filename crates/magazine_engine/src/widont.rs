use std::sync::LazyLock;

use regex::Regex;

/// Trailing word pair before a block-level tag (or end of input).
static TRAILING_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([^<>\s])\s+([^<>\s]+\s*)(</?(?:address|blockquote|br|dd|div|dt|fieldset|form|h[1-6]|li|noscript|p|td|th)[^>]*>|$)",
    )
    .expect("widont pattern is valid")
});

/// Binds the last two words of every block in `html` with `&nbsp;` so the
/// final word never wraps onto a line of its own.
pub fn widont(html: &str) -> String {
    TRAILING_PAIR
        .replace_all(html, "${1}&nbsp;${2}${3}")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::widont;

    #[test]
    fn joins_last_two_words_of_paragraph() {
        assert_eq!(widont("<p>a b c</p>"), "<p>a b&nbsp;c</p>");
    }

    #[test]
    fn joins_at_end_of_input() {
        assert_eq!(widont("Hello brave new world"), "Hello brave new&nbsp;world");
    }

    #[test]
    fn each_block_is_handled_once() {
        assert_eq!(
            widont("<p>one two three</p><li>four five</li>"),
            "<p>one two&nbsp;three</p><li>four&nbsp;five</li>"
        );
    }

    #[test]
    fn tag_names_match_case_insensitively() {
        assert_eq!(widont("<P>x y z</P>"), "<P>x y&nbsp;z</P>");
        assert_eq!(widont("<H2>Big news</H2>"), "<H2>Big&nbsp;news</H2>");
    }

    #[test]
    fn inline_tags_are_not_block_boundaries() {
        let input = "<span>a b</span> <em>c</em>x";
        assert_eq!(widont(input), input);
    }

    #[test]
    fn attribute_values_are_untouched() {
        for input in [
            r#"<p><a title="one two" href="x">link</a></p>"#,
            r#"<div class="a b"></div>"#,
            "<p>a <em>b</em></p>",
        ] {
            assert_eq!(widont(input), input);
        }
    }

    #[test]
    fn single_word_is_untouched() {
        assert_eq!(widont("<p>alone</p>"), "<p>alone</p>");
    }

    #[test]
    fn trailing_whitespace_before_tag_is_kept() {
        assert_eq!(widont("<p>a b </p>"), "<p>a&nbsp;b </p>");
    }

    #[test]
    fn line_breaks_count_as_blocks() {
        assert_eq!(
            widont("first line here<br/>second one"),
            "first line&nbsp;here<br/>second&nbsp;one"
        );
    }
}
