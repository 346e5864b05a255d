//! Minimal markdown subset for chat messages.
//!
//! Line-oriented, with the precedence the chat view relies on: fenced
//! code blocks first, then headings, bullets, and ordered items, then
//! inline spans. Inline scanning is left-to-right; at any position a code
//! span wins over bold, which wins over italic, and filename-like tokens
//! are highlighted only in plain text runs — never inside a recognized
//! code span.

use regex::Regex;
use std::sync::LazyLock;

/// Inline fragment of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Bold(String),
    Italic(String),
    Code(String),
    /// Bare `word.ext` token (1–4 letter extension).
    Filename(String),
}

/// One block-level element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Fenced code block with its language tag (possibly empty).
    Code { language: String, content: String },
    Heading { level: u8, spans: Vec<Span> },
    Bullet { spans: Vec<Span> },
    Ordered { number: u64, spans: Vec<Span> },
    Paragraph { spans: Vec<Span> },
    Blank,
}

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9_][A-Za-z0-9_.\-/]*\.[A-Za-z]{1,4}").expect("filename pattern compiles")
});

static ORDERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s+(.*)$").expect("ordered-item pattern compiles"));

/// Parse a whole message into blocks.
pub fn parse(input: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();

        if let Some(tag) = trimmed.strip_prefix("```") {
            let language = tag.trim().to_string();
            let mut content = Vec::new();
            // Everything up to the closing fence is raw; an unclosed
            // fence runs to the end of the message.
            for code_line in lines.by_ref() {
                if code_line.trim() == "```" {
                    break;
                }
                content.push(code_line.to_string());
            }
            blocks.push(Block::Code {
                language,
                content: content.join("\n"),
            });
            continue;
        }

        if trimmed.is_empty() {
            blocks.push(Block::Blank);
            continue;
        }

        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if (1..=3).contains(&hashes)
            && let Some(rest) = trimmed[hashes..].strip_prefix(' ')
        {
            blocks.push(Block::Heading {
                level: hashes as u8,
                spans: parse_inline(rest.trim_start()),
            });
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            blocks.push(Block::Bullet {
                spans: parse_inline(rest.trim_start()),
            });
            continue;
        }

        if let Some(caps) = ORDERED_RE.captures(trimmed)
            && let Ok(number) = caps[1].parse::<u64>()
        {
            blocks.push(Block::Ordered {
                number,
                spans: parse_inline(&caps[2]),
            });
            continue;
        }

        blocks.push(Block::Paragraph {
            spans: parse_inline(trimmed),
        });
    }

    blocks
}

/// Parse inline spans out of one line of non-code text.
pub fn parse_inline(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("**")
            && let Some(end) = after.find("**")
            && end > 0
        {
            flush_plain(&mut spans, &mut plain);
            spans.push(Span::Bold(after[..end].to_string()));
            rest = &after[end + 2..];
            continue;
        }

        if let Some(after) = rest.strip_prefix('`')
            && let Some(end) = after.find('`')
        {
            flush_plain(&mut spans, &mut plain);
            spans.push(Span::Code(after[..end].to_string()));
            rest = &after[end + 1..];
            continue;
        }

        if let Some(after) = rest.strip_prefix('*')
            && let Some(end) = after.find('*')
            && end > 0
        {
            flush_plain(&mut spans, &mut plain);
            spans.push(Span::Italic(after[..end].to_string()));
            rest = &after[end + 1..];
            continue;
        }

        // Plain character; markers are ASCII so this split is safe.
        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            plain.push(ch);
            rest = chars.as_str();
        }
    }

    flush_plain(&mut spans, &mut plain);
    spans
}

/// Emit an accumulated plain-text run, splitting out filename tokens.
fn flush_plain(spans: &mut Vec<Span>, plain: &mut String) {
    if plain.is_empty() {
        return;
    }
    let text = std::mem::take(plain);

    let mut last = 0;
    for m in FILENAME_RE.find_iter(&text) {
        // The token must end at a word boundary ("config.python" is not
        // a filename with extension "pyth").
        let boundary = text[m.end()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_ascii_alphanumeric());
        if !boundary {
            continue;
        }
        if m.start() > last {
            spans.push(Span::Text(text[last..m.start()].to_string()));
        }
        spans.push(Span::Filename(m.as_str().to_string()));
        last = m.end();
    }
    if last < text.len() {
        spans.push(Span::Text(text[last..].to_string()));
    }
}
