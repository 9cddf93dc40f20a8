use std::iter::Peekable;
use std::str::Chars;

/// Strip terminal escape sequences and control characters from a table cell.
///
/// Newlines and tabs collapse to a single space so each cell stays on one line.
pub(crate) fn sanitize_cell(input: &str) -> String {
    let mut sanitized = String::with_capacity(input.len());
    let mut iter = input.chars().peekable();

    while let Some(ch) = iter.next() {
        match ch {
            '\u{1b}' => match iter.peek().copied() {
                Some('[') => {
                    iter.next();
                    skip_csi(&mut iter);
                }
                Some(']' | 'P' | '_' | '^' | 'X') => {
                    iter.next();
                    skip_control_string(&mut iter);
                }
                Some(_) => {
                    iter.next();
                }
                None => {}
            },
            '\n' | '\r' | '\t' => {
                if !sanitized.ends_with(' ') {
                    sanitized.push(' ');
                }
            }
            ch if ch.is_control() => {}
            ch => sanitized.push(ch),
        }
    }

    sanitized
}

fn skip_csi(iter: &mut Peekable<Chars<'_>>) {
    for ch in iter.by_ref() {
        if ('\u{40}'..='\u{7e}').contains(&ch) {
            break;
        }
    }
}

fn skip_control_string(iter: &mut Peekable<Chars<'_>>) {
    while let Some(ch) = iter.next() {
        match ch {
            '\x07' | '\u{9c}' => break,
            '\u{1b}' => {
                if matches!(iter.peek().copied(), Some('\\')) {
                    iter.next();
                    break;
                }
            }
            _ => {}
        }
    }
}
