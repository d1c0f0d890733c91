//! Text layout
//!
//! Greedy word wrap for the monospaced fonts used on the panel. Lengths are
//! counted in characters, which equals columns for a mono font.

use std::borrow::Cow;

use embedded_graphics::{
    prelude::*,
    text::{renderer::TextRenderer, Text},
};

/// Marker appended wherever text is cut short
pub const ELLIPSIS: &str = "...";

const ELLIPSIS_LEN: usize = 3;

/// Geometry of a wrapped text block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapParams {
    /// Character budget per line
    pub chars_per_line: usize,
    /// Vertical cursor advance per line, in pixels
    pub line_height: i32,
    /// Lines beyond this are dropped
    pub max_lines: usize,
    /// Baseline position of the first line
    pub origin: Point,
}

/// Cut `text` to at most `max_chars` characters
///
/// When cut, the kept prefix is `max_chars - 3` characters followed by
/// [`ELLIPSIS`].
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> Cow<'_, str> {
    if text.chars().count() <= max_chars {
        return Cow::Borrowed(text);
    }
    let keep = max_chars.saturating_sub(ELLIPSIS_LEN);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    Cow::Owned(out)
}

/// Split `text` into at most `max_lines` lines of `chars_per_line` characters
///
/// A line prefers to end on a space found in the second half of its budget;
/// without one the word is split at the budget. If text is left over when the
/// last allowed line is emitted, that line loses its last three characters to
/// an ellipsis (only when it is longer than three characters).
pub fn wrap_lines(text: &str, chars_per_line: usize, max_lines: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if chars_per_line == 0 {
        return lines;
    }

    let chars: Vec<char> = text.chars().collect();
    let mut remaining: &[char] = &chars;

    while !remaining.is_empty() && lines.len() < max_lines {
        let mut break_point = chars_per_line.min(remaining.len());

        if break_point < remaining.len() {
            let floor = break_point / 2;
            if let Some(space) = (floor + 1..=break_point)
                .rev()
                .find(|&i| remaining[i] == ' ')
            {
                break_point = space;
            }
        }

        let mut line: String = remaining[..break_point].iter().collect();
        remaining = trim_chars(&remaining[break_point..]);

        if lines.len() + 1 == max_lines && !remaining.is_empty() {
            let len = line.chars().count();
            if len > ELLIPSIS_LEN {
                line = line.chars().take(len - ELLIPSIS_LEN).collect();
                line.push_str(ELLIPSIS);
            }
        }

        lines.push(line);
    }

    lines
}

fn trim_chars(mut chars: &[char]) -> &[char] {
    while let [first, rest @ ..] = chars {
        if !first.is_whitespace() {
            break;
        }
        chars = rest;
    }
    while let [rest @ .., last] = chars {
        if !last.is_whitespace() {
            break;
        }
        chars = rest;
    }
    chars
}

/// Wrap `text` and draw it line by line
///
/// Returns the cursor position below the last drawn line.
pub fn draw_wrapped<D, S>(
    target: &mut D,
    text: &str,
    style: S,
    params: &WrapParams,
) -> Result<Point, D::Error>
where
    D: DrawTarget,
    S: TextRenderer<Color = D::Color> + Clone,
{
    let mut cursor = params.origin;
    for line in wrap_lines(text, params.chars_per_line, params.max_lines) {
        Text::new(&line, cursor, style.clone()).draw(target)?;
        cursor.y += params.line_height;
    }
    Ok(cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_draws_nothing() {
        assert!(wrap_lines("", 28, 15).is_empty());
        assert!(wrap_lines("hello", 0, 15).is_empty());
        assert!(wrap_lines("hello", 28, 0).is_empty());
    }

    #[test]
    fn short_text_is_one_line() {
        assert_eq!(wrap_lines("hi there", 28, 15), vec!["hi there"]);
    }

    #[test]
    fn breaks_on_the_last_space_inside_the_budget() {
        let lines = wrap_lines("the quick brown fox jumps", 10, 5);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn space_right_after_the_budget_is_a_clean_break() {
        // index 5 is the space, budget 5: the candidate itself is checked
        assert_eq!(wrap_lines("hello world", 5, 5), vec!["hello", "world"]);
    }

    #[test]
    fn long_word_is_hard_broken() {
        let lines = wrap_lines("abcdefghijklmnopqrstuvwxyz", 10, 5);
        assert_eq!(lines, vec!["abcdefghij", "klmnopqrst", "uvwxyz"]);
    }

    #[test]
    fn space_in_first_half_is_ignored() {
        // The only space sits at index 2, below the half-window of a 10 budget
        let lines = wrap_lines("ab cdefghijklmnop", 10, 5);
        assert_eq!(lines, vec!["ab cdefghi", "jklmnop"]);
    }

    #[test]
    fn overflow_marks_the_last_line_with_an_ellipsis() {
        let lines = wrap_lines("aaaa bbbb cccc dddd eeee", 9, 2);
        assert_eq!(lines, vec!["aaaa bbbb", "cccc d..."]);
    }

    #[test]
    fn short_last_line_keeps_its_text_even_on_overflow() {
        let lines = wrap_lines("aa bb", 3, 1);
        assert_eq!(lines, vec!["aa"]);
    }

    #[test]
    fn line_count_and_width_stay_within_budget() {
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
                    eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim \
                    ad minim veniam, quis nostrud exercitation ullamco laboris nisi ut \
                    aliquip ex ea commodo consequat. Duis aute irure dolor in \
                    reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla \
                    pariatur. Supercalifragilisticexpialidocious-and-then-some";
        for budget in 4..40 {
            for max_lines in 1..20 {
                let lines = wrap_lines(text, budget, max_lines);
                assert!(lines.len() <= max_lines);
                for line in &lines {
                    assert!(line.chars().count() <= budget, "{line:?} over {budget}");
                }
            }
        }
    }

    #[test]
    fn truncated_output_ends_with_ellipsis() {
        let text = "word ".repeat(200);
        let lines = wrap_lines(&text, 28, 15);
        assert_eq!(lines.len(), 15);
        assert!(lines.last().is_some_and(|l| l.ends_with(ELLIPSIS)));
    }

    #[test]
    fn wrapping_is_deterministic() {
        let text = "Some reasonably long message that needs a couple of lines to fit";
        assert_eq!(wrap_lines(text, 12, 4), wrap_lines(text, 12, 4));
    }

    #[test]
    fn multibyte_text_is_counted_in_characters() {
        let lines = wrap_lines("ääää öööö üüüü", 9, 3);
        assert_eq!(lines, vec!["ääää öööö", "üüüü"]);
    }

    #[test]
    fn truncate_keeps_short_text_borrowed() {
        assert!(matches!(truncate_with_ellipsis("short", 35), Cow::Borrowed("short")));
        let long = "x".repeat(40);
        let cut = truncate_with_ellipsis(&long, 35);
        assert_eq!(cut.chars().count(), 35);
        assert!(cut.ends_with(ELLIPSIS));
    }
}
