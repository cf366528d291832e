//! Tokenizer for CIL assembly text.

/// A single token from an assembly line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// `.method`, `.param`, ... Stored without the leading dot.
    Directive(String),
    /// A label definition, `name:`. Stored without the colon.
    Label(String),
    /// Anything else: mnemonics, names, types, numbers.
    Word(String),
}

/// Tokenize a single line of assembly text.
///
/// Returns an empty Vec for blank lines and comment-only lines.
/// Comments start with `;` and extend to end of line. Parentheses and
/// commas separate words like whitespace, so `switch (a, b)` is three
/// tokens.
pub(crate) fn tokenize_line(line: &str) -> Vec<Token> {
    let line = match line.find(';') {
        Some(pos) => &line[..pos],
        None => line,
    };

    line.split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | ','))
        .filter(|word| !word.is_empty())
        .map(|word| {
            if let Some(name) = word.strip_prefix('.') {
                Token::Directive(name.to_string())
            } else if let Some(name) = word.strip_suffix(':') {
                Token::Label(name.to_string())
            } else {
                Token::Word(word.to_string())
            }
        })
        .collect()
}
