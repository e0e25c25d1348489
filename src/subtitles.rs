//! WebVTT subtitle cleanup.
//!
//! yt-dlp writes auto-generated captions as WebVTT with inline timing tags
//! and heavy line repetition (each cue repeats the previous line while the
//! next one scrolls in). The model only needs the spoken text once.

/// Convert a WebVTT document into plain text, one caption line per line.
///
/// Header, `NOTE`, `STYLE` and `REGION` blocks are dropped, as are cue
/// identifiers and timing lines. Inline tags are stripped, a handful of HTML
/// entities decoded, and a line identical to the previously kept line is
/// skipped.
pub fn vtt_to_text(vtt: &str) -> String {
    let normalized = vtt.replace("\r\n", "\n");
    let mut out: Vec<String> = Vec::new();

    for block in normalized.split("\n\n") {
        let mut lines = block.lines().skip_while(|l| !l.contains("-->"));
        // No timing line: header or metadata block.
        if lines.next().is_none() {
            continue;
        }
        for raw in lines {
            let text = decode_entities(&strip_tags(raw));
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            if out.last().is_some_and(|prev| prev == text) {
                continue;
            }
            out.push(text.to_string());
        }
    }

    out.join("\n")
}

/// Cut `text` to at most `max_chars` characters (not bytes).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn strip_tags(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
