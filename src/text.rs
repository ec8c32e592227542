//! Text shaping for anything handed to an external command line.
//!
//! Narration and overlay text travel as process arguments and inside ffmpeg filtergraphs, where a
//! stray quote or colon changes how the whole invocation is parsed. Everything in here strips
//! such characters and caps length in characters (never splitting a UTF-8 sequence).

use once_cell::sync::Lazy;
use regex::Regex;

/// Narration excerpt handed to the speech tool.
pub const SPEECH_MAX_CHARS: usize = 1000;
/// Title drawn on the fallback image.
pub const TITLE_MAX_CHARS: usize = 40;
/// Subtitle excerpt burned into the final video.
pub const SUBTITLE_MAX_CHARS: usize = 90;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const QUOTE_CHARS: &[char] = &['"', '\'', '`', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}'];
const FILTER_UNSAFE_CHARS: &[char] = &[':', '\\', '%', '{', '}', ';', '[', ']', ','];

/// Keeps at most `max_chars` characters.
pub fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((cut, _)) => &input[..cut],
        None => input,
    }
}

fn collapse_whitespace(input: &str) -> String {
    WHITESPACE_RE.replace_all(input.trim(), " ").into_owned()
}

/// Text for the speech tool: quotes removed, whitespace collapsed, no leading `-` that the tool
/// could read as a flag.
pub fn speech_excerpt(narration: &str) -> String {
    let stripped: String = narration.chars().filter(|c| !QUOTE_CHARS.contains(c)).collect();
    let collapsed = collapse_whitespace(&stripped);
    let unflagged = collapsed.trim_start_matches(['-', ' ']);
    truncate_chars(unflagged, SPEECH_MAX_CHARS).trim_end().to_string()
}

/// Text safe to embed in a single-quoted `drawtext` value.
pub fn overlay_text(input: &str, max_chars: usize) -> String {
    let stripped: String = input
        .chars()
        .filter(|c| !QUOTE_CHARS.contains(c) && !FILTER_UNSAFE_CHARS.contains(c))
        .collect();
    let collapsed = collapse_whitespace(&stripped);
    truncate_chars(&collapsed, max_chars).trim_end().to_string()
}

/// First few words of a script, used when the caller supplied content but no title.
pub fn title_from_content(content: &str) -> String {
    let words: Vec<&str> = content.split_whitespace().take(8).collect();
    truncate_chars(&words.join(" "), 80).to_string()
}
