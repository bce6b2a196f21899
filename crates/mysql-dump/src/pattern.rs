//! A tiny subset of sed basic regular expressions.
//!
//! Each [`Substitution`] is one `s/…/…/g` command, optionally guarded by a
//! negated line address (`/text/!`). The same value is rendered into `sed`
//! syntax for the shell pipeline and applied in-process with sed's matching
//! rules: leftmost match, greedy repetition with backtracking, global
//! replacement resuming after each match.

/// One element of a pattern.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Piece {
    /// Literal text.
    Lit(&'static str),
    /// `[ ]*`
    Spaces,
    /// `c\?`
    Maybe(u8),
    /// `[^set]*`
    RunExcept(&'static str),
    /// `\([set]\)`
    CaptureOneOf(&'static str),
    /// `\([^set]\)`
    CaptureNoneOf(&'static str),
}

/// One element of a replacement.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Emit {
    Lit(&'static str),
    /// `\1`
    Captured,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Substitution {
    pub pattern: &'static [Piece],
    pub replacement: &'static [Emit],
    /// Skip lines containing this text (`/text/!s/…/`).
    pub unless_line_contains: Option<&'static str>,
}

impl Substitution {
    pub const fn new(pattern: &'static [Piece], replacement: &'static [Emit]) -> Self {
        Self {
            pattern,
            replacement,
            unless_line_contains: None,
        }
    }

    pub const fn unless_line_contains(self, text: &'static str) -> Self {
        Self {
            unless_line_contains: Some(text),
            ..self
        }
    }

    /// Render as a sed script, e.g. `s/a\([;]\)/b\1/g`.
    pub fn sed_script(&self) -> String {
        let mut script = String::new();
        if let Some(address) = self.unless_line_contains {
            script.push('/');
            push_regex_literal(&mut script, address);
            script.push_str("/!");
        }
        script.push_str("s/");
        for piece in self.pattern {
            match *piece {
                Piece::Lit(text) => push_regex_literal(&mut script, text),
                Piece::Spaces => script.push_str("[ ]*"),
                Piece::Maybe(c) => {
                    push_regex_literal(&mut script, &char::from(c).to_string());
                    script.push_str("\\?");
                }
                Piece::RunExcept(set) => {
                    script.push_str("[^");
                    script.push_str(set);
                    script.push_str("]*");
                }
                Piece::CaptureOneOf(set) => {
                    script.push_str("\\([");
                    script.push_str(set);
                    script.push_str("]\\)");
                }
                Piece::CaptureNoneOf(set) => {
                    script.push_str("\\([^");
                    script.push_str(set);
                    script.push_str("]\\)");
                }
            }
        }
        script.push('/');
        for emit in self.replacement {
            match *emit {
                Emit::Lit(text) => {
                    for c in text.chars() {
                        if matches!(c, '\\' | '/' | '&') {
                            script.push('\\');
                        }
                        script.push(c);
                    }
                }
                Emit::Captured => script.push_str("\\1"),
            }
        }
        script.push_str("/g");
        script
    }

    /// Apply to a single line (without its trailing newline).
    #[cfg(test)]
    pub fn apply(&self, line: &str) -> String {
        String::from_utf8_lossy(&self.apply_bytes(line.as_bytes())).into_owned()
    }

    /// Apply to a single raw line. Dumps may carry bytes that are not UTF-8
    /// inside string literals; those pass through untouched.
    pub fn apply_bytes(&self, bytes: &[u8]) -> Vec<u8> {
        if let Some(address) = self.unless_line_contains {
            if contains(bytes, address.as_bytes()) {
                return bytes.to_vec();
            }
        }

        let mut out = Vec::with_capacity(bytes.len());
        let mut pos = 0;
        while pos < bytes.len() {
            match match_from(self.pattern, bytes, pos, None) {
                Some((end, captured)) if end > pos => {
                    for emit in self.replacement {
                        match *emit {
                            Emit::Lit(text) => out.extend_from_slice(text.as_bytes()),
                            Emit::Captured => {
                                if let Some(at) = captured {
                                    out.push(bytes[at]);
                                }
                            }
                        }
                    }
                    pos = end;
                }
                _ => {
                    out.push(bytes[pos]);
                    pos += 1;
                }
            }
        }
        out
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn push_regex_literal(script: &mut String, text: &str) {
    for c in text.chars() {
        if matches!(c, '\\' | '.' | '*' | '[' | ']' | '^' | '$' | '/') {
            script.push('\\');
        }
        script.push(c);
    }
}

/// Try to match `pieces` starting at `pos`; returns the match end and the
/// position of the captured byte, if any.
fn match_from(
    pieces: &[Piece],
    line: &[u8],
    pos: usize,
    captured: Option<usize>,
) -> Option<(usize, Option<usize>)> {
    let Some((piece, rest)) = pieces.split_first() else {
        return Some((pos, captured));
    };

    match *piece {
        Piece::Lit(text) => {
            if line[pos..].starts_with(text.as_bytes()) {
                match_from(rest, line, pos + text.len(), captured)
            } else {
                None
            }
        }
        Piece::Spaces => match_run(rest, line, pos, captured, |b| b == b' '),
        Piece::RunExcept(set) => {
            match_run(rest, line, pos, captured, |b| !set.as_bytes().contains(&b))
        }
        Piece::Maybe(c) => {
            if line.get(pos) == Some(&c) {
                if let Some(found) = match_from(rest, line, pos + 1, captured) {
                    return Some(found);
                }
            }
            match_from(rest, line, pos, captured)
        }
        Piece::CaptureOneOf(set) => match line.get(pos) {
            Some(b) if set.as_bytes().contains(b) => match_from(rest, line, pos + 1, Some(pos)),
            _ => None,
        },
        Piece::CaptureNoneOf(set) => match line.get(pos) {
            Some(b) if !set.as_bytes().contains(b) => match_from(rest, line, pos + 1, Some(pos)),
            _ => None,
        },
    }
}

/// Greedy `*` repetition with backtracking.
fn match_run(
    rest: &[Piece],
    line: &[u8],
    pos: usize,
    captured: Option<usize>,
    accept: impl Fn(u8) -> bool,
) -> Option<(usize, Option<usize>)> {
    let longest = line[pos..].iter().take_while(|b| accept(**b)).count();
    (0..=longest)
        .rev()
        .find_map(|len| match_from(rest, line, pos + len, captured))
}
