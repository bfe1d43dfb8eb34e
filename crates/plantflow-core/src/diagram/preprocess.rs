//! Turns raw diagram text into logical lines.
//!
//! Drops comments, the `@startuml`/`@enduml` wrapper and blank lines, joins
//! multi-line actions into one line, and folds `<style>` / `skinparam {`
//! blocks into a single cosmetic line. Note blocks pass through untouched so
//! their text is never mistaken for statements.

use super::syntax;

/// One statement of the diagram, numbered by its first physical line (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogicalLine {
    pub number: usize,
    pub text: String,
}

enum Block {
    /// Inside `/' ... '/`.
    Comment,
    /// Inside `<style>` or `skinparam x {`; closes on the given marker.
    Cosmetic { start: usize, text: String, close: &'static str },
    /// Inside a note block; lines are emitted verbatim.
    Note,
    /// An action whose `;` has not been seen yet.
    Action { start: usize, text: String },
}

pub(crate) fn preprocess(text: &str) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut block: Option<Block> = None;

    for (idx, raw) in text.lines().enumerate() {
        let number = idx + 1;
        let line = raw.trim();

        match block.take() {
            Some(Block::Comment) => {
                if !line.contains("'/") {
                    block = Some(Block::Comment);
                }
                continue;
            }
            Some(Block::Cosmetic {
                start,
                mut text,
                close,
            }) => {
                text.push(' ');
                text.push_str(line);
                if line.eq_ignore_ascii_case(close) || line.ends_with(close) {
                    out.push(LogicalLine {
                        number: start,
                        text,
                    });
                } else {
                    block = Some(Block::Cosmetic { start, text, close });
                }
                continue;
            }
            Some(Block::Note) => {
                if syntax::is_end_note(line) {
                    out.push(LogicalLine {
                        number,
                        text: line.to_string(),
                    });
                } else {
                    out.push(LogicalLine {
                        number,
                        text: raw.trim_end().to_string(),
                    });
                    block = Some(Block::Note);
                }
                continue;
            }
            Some(Block::Action { start, mut text }) => {
                text.push('\n');
                text.push_str(line);
                if syntax::action_is_terminated(line) {
                    out.push(LogicalLine {
                        number: start,
                        text,
                    });
                } else {
                    block = Some(Block::Action { start, text });
                }
                continue;
            }
            None => {}
        }

        if line.is_empty() || line.starts_with('\'') {
            continue;
        }
        if line.starts_with("/'") {
            if !line[2..].contains("'/") {
                block = Some(Block::Comment);
            }
            continue;
        }
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("@start") || lower.starts_with("@end") {
            continue;
        }

        if lower.starts_with("<style") && !lower.contains("</style>") {
            block = Some(Block::Cosmetic {
                start: number,
                text: line.to_string(),
                close: "</style>",
            });
            continue;
        }
        if lower.starts_with("skinparam") && line.ends_with('{') {
            block = Some(Block::Cosmetic {
                start: number,
                text: line.to_string(),
                close: "}",
            });
            continue;
        }

        if let Some(header) = syntax::parse_note_header(line) {
            if header.inline.is_none() {
                block = Some(Block::Note);
            }
        } else if syntax::action_start(line).is_some() && !syntax::action_is_terminated(line) {
            block = Some(Block::Action {
                start: number,
                text: line.to_string(),
            });
            continue;
        }

        out.push(LogicalLine {
            number,
            text: line.to_string(),
        });
    }

    // An unterminated action at end of input is still a statement.
    if let Some(Block::Action { start, text }) = block {
        out.push(LogicalLine {
            number: start,
            text,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        preprocess(input).into_iter().map(|l| l.text).collect()
    }

    #[test]
    fn test_strips_wrapper_comments_and_blanks() {
        let input = "@startuml\n' a comment\n\n  :A;  \n/' block\nstill comment '/\n:B;\n@enduml";
        assert_eq!(texts(input), vec![":A;", ":B;"]);
    }

    #[test]
    fn test_joins_multiline_action() {
        let lines = preprocess(":first line\nsecond line;\n:next;");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, ":first line\nsecond line;");
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[1].number, 3);
    }

    #[test]
    fn test_folds_style_and_skinparam_blocks() {
        let input = "<style>\nactivityDiagram {\n}\n</style>\nskinparam activity {\nBackgroundColor red\n}\n:A;";
        let lines = texts(input);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("<style>"));
        assert!(lines[1].starts_with("skinparam activity {"));
        assert_eq!(lines[2], ":A;");
    }

    #[test]
    fn test_note_block_passes_through() {
        let input = ":A;\nnote right\n:) not an action\nend note\n:B;";
        assert_eq!(
            texts(input),
            vec![":A;", "note right", ":) not an action", "end note", ":B;"]
        );
    }

    #[test]
    fn test_unterminated_action_at_eof_is_kept() {
        assert_eq!(texts(":dangling"), vec![":dangling"]);
    }
}
