//! Line-level recognizers for the diagram language.
//!
//! Every function here is pure and works on one logical line. Keywords match
//! ASCII case-insensitively; labels and conditions are returned verbatim
//! (trimmed).

/// Direction words allowed inside an arrow, e.g. `-down->`.
const ARROW_DIRECTIONS: &[&str] = &["up", "down", "left", "right", "u", "d", "l", "r"];

/// Sides accepted by `note <side> ...`.
const NOTE_SIDES: &[&str] = &["left", "right", "top", "bottom"];

// ---------------------------------------------------------------------------
// Generic helpers
// ---------------------------------------------------------------------------

/// Key used for node identity: trimmed, unquoted, whitespace collapsed.
pub(crate) fn normalize_label(raw: &str) -> String {
    display_label(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Label as shown to users: trimmed and unquoted, inner layout kept.
pub(crate) fn display_label(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Match a leading keyword, returning the trimmed remainder.
///
/// The keyword must be followed by end of line, whitespace, `(` or `:`.
pub(crate) fn keyword<'a>(line: &'a str, kw: &str) -> Option<&'a str> {
    let head = line.get(..kw.len())?;
    if !head.eq_ignore_ascii_case(kw) {
        return None;
    }
    let rest = &line[kw.len()..];
    match rest.chars().next() {
        None => Some(""),
        Some(c) if c.is_whitespace() || c == '(' || c == ':' => Some(rest.trim()),
        _ => None,
    }
}

/// Whether the whole line is exactly one of the given (multi-word) keywords.
pub(crate) fn is_exactly(line: &str, words: &[&str]) -> bool {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    words.iter().any(|w| collapsed.eq_ignore_ascii_case(w))
}

/// Split `(inner) rest` into `(inner, rest)`, honouring nested parentheses.
pub(crate) fn take_parenthesized(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if !s.starts_with('(') {
        return None;
    }
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((s[1..i].trim(), s[i + 1..].trim()));
                }
            }
            _ => {}
        }
    }
    None
}

/// Optional `(label)` at the start of `s`; empty labels count as absent.
fn optional_label(s: &str) -> Option<String> {
    take_parenthesized(s)
        .map(|(inner, _)| inner.to_string())
        .filter(|l| !l.is_empty())
}

/// Index of `needle` in `s`, ignoring matches inside double quotes.
fn find_unquoted(s: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == needle && !in_quotes {
            return Some(i);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Control flow
// ---------------------------------------------------------------------------

/// `if (COND) then (LABEL)` / `if (COND) is (LABEL) then`.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct IfLine {
    pub condition: String,
    pub label: Option<String>,
}

pub(crate) fn parse_if(line: &str) -> Option<IfLine> {
    let rest = keyword(line, "if")?;
    let (condition, mut rest) = take_parenthesized(rest)?;
    let mut label = None;
    for kw in ["is", "equals"] {
        if let Some(after) = keyword(rest, kw) {
            label = optional_label(after);
            rest = take_parenthesized(after).map(|(_, r)| r).unwrap_or(after);
        }
    }
    if let Some(after) = keyword(rest, "then") {
        if let Some(l) = optional_label(after) {
            label = Some(l);
        }
    }
    Some(IfLine {
        condition: condition.to_string(),
        label,
    })
}

/// `elseif (COND) then (LABEL)` or `else if (...)`.
pub(crate) fn parse_else_if(line: &str) -> Option<IfLine> {
    if let Some(rest) = keyword(line, "elseif") {
        return parse_if(&format!("if {rest}"));
    }
    let rest = keyword(line, "else")?;
    keyword(rest, "if")?;
    parse_if(rest)
}

/// `else` or `else (LABEL)`. Returns the optional label.
pub(crate) fn parse_else(line: &str) -> Option<Option<String>> {
    let rest = keyword(line, "else")?;
    if keyword(rest, "if").is_some() {
        return None;
    }
    Some(optional_label(rest))
}

pub(crate) fn is_endif(line: &str) -> bool {
    is_exactly(line, &["endif", "end if"])
}

/// `repeat` optionally followed by an inline first action.
pub(crate) fn parse_repeat(line: &str) -> Option<&str> {
    let rest = keyword(line, "repeat")?;
    if keyword(rest, "while").is_some() {
        return None;
    }
    Some(rest)
}

/// `repeat while (COND) [is (LABEL)] [not (LABEL)]`. Returns the condition.
pub(crate) fn parse_repeat_while(line: &str) -> Option<Option<String>> {
    let rest = keyword(line, "repeat")?;
    let rest = keyword(rest, "while")?;
    Some(optional_label(rest))
}

/// `while (COND) [is (LABEL)]`.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct WhileLine {
    pub condition: String,
    pub label: Option<String>,
}

pub(crate) fn parse_while(line: &str) -> Option<WhileLine> {
    let rest = keyword(line, "while")?;
    let (condition, rest) = take_parenthesized(rest)?;
    let label = keyword(rest, "is").and_then(optional_label);
    Some(WhileLine {
        condition: condition.to_string(),
        label,
    })
}

/// `endwhile [(LABEL)]` / `end while [(LABEL)]`. Returns the exit label.
pub(crate) fn parse_endwhile(line: &str) -> Option<Option<String>> {
    let rest = keyword(line, "endwhile")
        .or_else(|| keyword(line, "end").and_then(|r| keyword(r, "while")))?;
    Some(optional_label(rest))
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// `[#color]? :text;` with an optional trailing `<<stereotype>>`.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ActionLine<'a> {
    pub text: &'a str,
    pub stereotype: Option<&'a str>,
}

/// Strip a `#color` / `[#color]` prefix, returning the line from its `:`.
pub(crate) fn action_start(line: &str) -> Option<&str> {
    if line.starts_with(':') {
        return Some(line);
    }
    let rest = if let Some(inner) = line.strip_prefix("[#") {
        &inner[inner.find(']')? + 1..]
    } else if line.starts_with('#') {
        let colon = line.find(':')?;
        if line[..colon].contains(char::is_whitespace) {
            return None;
        }
        &line[colon..]
    } else {
        return None;
    };
    let rest = rest.trim_start();
    rest.starts_with(':').then_some(rest)
}

fn split_stereotype(s: &str) -> (&str, Option<&str>) {
    let trimmed = s.trim_end();
    if trimmed.ends_with(">>") {
        if let Some(open) = trimmed.rfind("<<") {
            let inner = trimmed[open + 2..trimmed.len() - 2].trim();
            if !inner.is_empty() {
                return (&trimmed[..open], Some(inner));
            }
        }
    }
    (trimmed, None)
}

/// Whether an action line carries its `;` terminator.
pub(crate) fn action_is_terminated(line: &str) -> bool {
    let (body, _) = split_stereotype(line);
    body.trim_end().ends_with(';')
}

pub(crate) fn parse_action(line: &str) -> Option<ActionLine<'_>> {
    let body = &action_start(line)?[1..];
    let (body, mut stereotype) = split_stereotype(body);
    let body = body.trim_end();
    let body = body.strip_suffix(';').unwrap_or(body);
    let (text, inner_stereotype) = split_stereotype(body);
    if stereotype.is_none() {
        stereotype = inner_stereotype;
    }
    Some(ActionLine {
        text: text.trim(),
        stereotype,
    })
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

/// The opening line of a note.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct NoteHeader<'a> {
    /// `of X` target; `None` means the most recently touched node.
    pub target: Option<&'a str>,
    /// Text after `:`; `None` means a block note follows.
    pub inline: Option<&'a str>,
}

pub(crate) fn parse_note_header(line: &str) -> Option<NoteHeader<'_>> {
    let rest = keyword(line, "note")?;
    let mut rest = NOTE_SIDES.iter().find_map(|side| keyword(rest, side))?;

    if rest.starts_with('#') {
        let end = rest
            .find(|c: char| c == ':' || c.is_whitespace())
            .unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }

    let (target_part, inline) = match find_unquoted(rest, ':') {
        Some(i) => (rest[..i].trim(), Some(rest[i + 1..].trim())),
        None => (rest, None),
    };

    let target = if target_part.is_empty() {
        None
    } else {
        let name = keyword(target_part, "of")?;
        (!name.is_empty()).then_some(name)
    };

    Some(NoteHeader { target, inline })
}

pub(crate) fn is_end_note(line: &str) -> bool {
    is_exactly(line, &["end note", "endnote"])
}

/// Split `{json}|markdown`, using the first `|` whose left side is a JSON object.
pub(crate) fn split_note_metadata(text: &str) -> Option<(&str, &str)> {
    for (i, _) in text.match_indices('|') {
        let left = text[..i].trim();
        if !left.starts_with('{') {
            continue;
        }
        if let Ok(serde_json::Value::Object(_)) = serde_json::from_str::<serde_json::Value>(left) {
            return Some((left, text[i + 1..].trim()));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Arrows
// ---------------------------------------------------------------------------

/// A raw `A --> B : cond` edge with both sides in source order resolved.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ArrowLine<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub condition: Option<&'a str>,
}

/// Byte range of the first arrow outside quotes, and whether it points left.
fn locate_arrow(line: &str) -> Option<(usize, usize, bool)> {
    let bytes = line.as_bytes();
    let mut in_quotes = false;
    let mut i = 0;
    while i + 1 < bytes.len() {
        let b = bytes[i];
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if !in_quotes && b == b'-' && bytes[i + 1] == b'>' {
            return Some((extend_arrow_back(line, i), i + 2, false));
        } else if !in_quotes && b == b'<' && bytes[i + 1] == b'-' {
            return Some((i, extend_arrow_forward(line, i + 1), true));
        }
        i += 1;
    }
    None
}

fn is_direction(word: &str) -> bool {
    ARROW_DIRECTIONS
        .iter()
        .any(|d| d.eq_ignore_ascii_case(word))
}

/// Walk back from the `-` of `->` over dashes, `[style]` and direction words.
fn extend_arrow_back(line: &str, mut start: usize) -> usize {
    let bytes = line.as_bytes();
    loop {
        if start == 0 {
            return start;
        }
        match bytes[start - 1] {
            b'-' => start -= 1,
            b']' => match line[..start - 1].rfind('[') {
                Some(open) => start = open,
                None => return start,
            },
            b if b.is_ascii_alphabetic() => {
                let mut j = start;
                while j > 0 && bytes[j - 1].is_ascii_alphabetic() {
                    j -= 1;
                }
                if j > 0 && bytes[j - 1] == b'-' && is_direction(&line[j..start]) {
                    start = j;
                } else {
                    return start;
                }
            }
            _ => return start,
        }
    }
}

/// Walk forward from the first `-` of `<-` over dashes, styles and directions.
fn extend_arrow_forward(line: &str, mut end: usize) -> usize {
    let bytes = line.as_bytes();
    loop {
        if end >= bytes.len() {
            return end;
        }
        match bytes[end] {
            b'-' => end += 1,
            b'[' => match line[end..].find(']') {
                Some(close) => end += close + 1,
                None => return end,
            },
            b if b.is_ascii_alphabetic() && end > 0 && bytes[end - 1] == b'-' => {
                let mut j = end;
                while j < bytes.len() && bytes[j].is_ascii_alphabetic() {
                    j += 1;
                }
                if j < bytes.len() && bytes[j] == b'-' && is_direction(&line[end..j]) {
                    end = j;
                } else {
                    return end;
                }
            }
            _ => return end,
        }
    }
}

pub(crate) fn parse_arrow(line: &str) -> Option<ArrowLine<'_>> {
    let (start, end, points_left) = locate_arrow(line)?;
    let head = line[..start].trim();
    let tail = &line[end..];
    let (tail, condition) = match find_unquoted(tail, ':') {
        Some(i) => (tail[..i].trim(), Some(tail[i + 1..].trim()).filter(|c| !c.is_empty())),
        None => (tail.trim(), None),
    };
    if head.is_empty() || tail.is_empty() {
        return None;
    }
    let (from, to) = if points_left { (tail, head) } else { (head, tail) };
    Some(ArrowLine {
        from,
        to,
        condition,
    })
}
