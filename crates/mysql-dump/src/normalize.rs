//! Charset/collation normalization of `mysqldump` output.
//!
//! The rules run in a fixed order. Steps 6-8 repair what earlier steps can
//! leave behind (a table-level collation inserted next to an existing one),
//! so reordering them breaks idempotence.

use std::io::{BufRead, Write};

use crate::pattern::{Emit, Piece, Substitution};

macro_rules! canonical_charset {
    () => {
        "utf8mb4"
    };
}

macro_rules! canonical_collation {
    () => {
        "utf8mb4_general_ci"
    };
}

macro_rules! column_collation {
    () => {
        concat!(
            "CHARACTER SET ",
            canonical_charset!(),
            " COLLATE ",
            canonical_collation!()
        )
    };
}

macro_rules! table_collation {
    () => {
        concat!(
            "DEFAULT CHARSET=",
            canonical_charset!(),
            " COLLATE=",
            canonical_collation!()
        )
    };
}

/// Character set every declaration is rewritten to.
pub const CANONICAL_CHARSET: &str = canonical_charset!();

/// Collation paired with [`CANONICAL_CHARSET`].
pub const CANONICAL_COLLATION: &str = canonical_collation!();

pub(crate) const FOREIGN_KEY_CHECKS_OFF: &str = "SET FOREIGN_KEY_CHECKS = 0;";
pub(crate) const FOREIGN_KEY_CHECKS_ON: &str = "SET FOREIGN_KEY_CHECKS = 1;";

const COLLATION_DELIMITERS: &str = "; ,)";

struct Step {
    name: &'static str,
    substitutions: &'static [Substitution],
}

static STEPS: [Step; 8] = [
    Step {
        name: "strip DEFINER clauses",
        substitutions: &[Substitution::new(
            &[
                Piece::Lit("DEFINER"),
                Piece::Spaces,
                Piece::Lit("="),
                Piece::Spaces,
                Piece::RunExcept("*"),
                Piece::Lit("*/"),
            ],
            &[Emit::Lit("*/")],
        )],
    },
    Step {
        name: "client character set",
        substitutions: &[Substitution::new(
            &[
                Piece::Lit("SET character_set_client = "),
                Piece::RunExcept(";*"),
                Piece::CaptureOneOf(";*"),
            ],
            &[
                Emit::Lit(concat!("SET character_set_client = ", canonical_charset!())),
                Emit::Captured,
            ],
        )],
    },
    Step {
        name: "charset declarations",
        substitutions: &[
            Substitution::new(
                &[
                    Piece::Lit("CHARSET="),
                    Piece::RunExcept("; "),
                    Piece::CaptureOneOf("; "),
                ],
                &[Emit::Lit(concat!("CHARSET=", canonical_charset!())), Emit::Captured],
            ),
            Substitution::new(
                &[
                    Piece::Lit("CHARACTER SET "),
                    Piece::RunExcept("; "),
                    Piece::CaptureOneOf("; "),
                ],
                &[
                    Emit::Lit(concat!("CHARACTER SET ", canonical_charset!())),
                    Emit::Captured,
                ],
            ),
        ],
    },
    Step {
        name: "legacy utf8mb3 collations",
        substitutions: &[Substitution::new(
            &[
                Piece::Lit("COLLATE"),
                Piece::Spaces,
                Piece::Maybe(b'='),
                Piece::Spaces,
                Piece::Lit("utf8mb3"),
                Piece::RunExcept(COLLATION_DELIMITERS),
                Piece::CaptureOneOf(COLLATION_DELIMITERS),
            ],
            &[Emit::Lit(concat!("COLLATE ", canonical_collation!())), Emit::Captured],
        )],
    },
    Step {
        name: "column collations",
        substitutions: &[
            Substitution::new(
                &[Piece::Lit(concat!("CHARACTER SET ", canonical_charset!(), " DEFAULT"))],
                &[Emit::Lit(concat!(column_collation!(), " DEFAULT"))],
            ),
            Substitution::new(
                &[Piece::Lit(concat!("CHARACTER SET ", canonical_charset!(), " NOT NULL"))],
                &[Emit::Lit(concat!(column_collation!(), " NOT NULL"))],
            ),
            Substitution::new(
                &[Piece::Lit(concat!("CHARACTER SET ", canonical_charset!(), " COMMENT"))],
                &[Emit::Lit(concat!(column_collation!(), " COMMENT"))],
            ),
        ],
    },
    Step {
        name: "table collations",
        substitutions: &[
            Substitution::new(
                &[
                    Piece::Lit(concat!("DEFAULT CHARSET=", canonical_charset!())),
                    Piece::CaptureNoneOf("C;"),
                ],
                &[
                    Emit::Lit(table_collation!()),
                    Emit::Captured,
                ],
            ),
            Substitution::new(
                &[Piece::Lit(concat!("DEFAULT CHARSET=", canonical_charset!(), ";"))],
                &[Emit::Lit(concat!(table_collation!(), ";"))],
            ),
        ],
    },
    Step {
        name: "remaining collations",
        substitutions: &[Substitution::new(
            &[
                Piece::Lit("COLLATE"),
                Piece::Spaces,
                Piece::Maybe(b'='),
                Piece::Spaces,
                Piece::RunExcept(COLLATION_DELIMITERS),
                Piece::CaptureOneOf(COLLATION_DELIMITERS),
            ],
            &[Emit::Lit(concat!("COLLATE ", canonical_collation!())), Emit::Captured],
        )
        .unless_line_contains(table_collation!())],
    },
    Step {
        name: "duplicate collations",
        substitutions: &[
            Substitution::new(
                &[
                    Piece::Lit("COLLATE="),
                    Piece::RunExcept(COLLATION_DELIMITERS),
                    Piece::Lit(concat!(" COLLATE=", canonical_collation!())),
                ],
                &[Emit::Lit(concat!("COLLATE=", canonical_collation!()))],
            ),
            Substitution::new(
                &[
                    Piece::Lit(concat!("COLLATE=", canonical_collation!(), " COLLATE=")),
                    Piece::RunExcept(COLLATION_DELIMITERS),
                ],
                &[Emit::Lit(concat!("COLLATE=", canonical_collation!()))],
            ),
        ],
    },
];

/// Ordered rewrite rules for `mysqldump` output.
///
/// The same rules are available as a shell `sed` pipeline, which is what
/// runs next to `mysqldump` on the dumping host, and as an in-process
/// transformation for dumps that are already on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpNormalizer;

impl DumpNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Step names in application order.
    pub fn step_names(&self) -> impl Iterator<Item = &'static str> {
        STEPS.iter().map(|step| step.name)
    }

    /// One `sed` stage per step, joined with ` | `.
    pub fn sed_pipeline(&self) -> String {
        STEPS
            .iter()
            .map(|step| {
                let scripts: Vec<String> = step
                    .substitutions
                    .iter()
                    .map(|s| format!("-e \"{}\"", s.sed_script()))
                    .collect();
                format!("sed {}", scripts.join(" "))
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Normalize one line (without its trailing newline).
    pub fn normalize_line(&self, line: &[u8]) -> Vec<u8> {
        STEPS
            .iter()
            .flat_map(|step| step.substitutions.iter())
            .fold(line.to_vec(), |current, substitution| {
                substitution.apply_bytes(&current)
            })
    }

    /// Normalize a whole dump held in memory.
    pub fn normalize(&self, dump: &str) -> String {
        let mut out = Vec::with_capacity(dump.len());
        for chunk in dump.as_bytes().split_inclusive(|b| *b == b'\n') {
            let (line, newline) = split_newline(chunk);
            out.extend(self.normalize_line(line));
            out.extend_from_slice(newline);
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Normalize a dump line by line from `reader` into `writer`.
    ///
    /// Returns the number of lines written.
    pub fn normalize_stream<R: BufRead, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
    ) -> std::io::Result<u64> {
        let mut buf = Vec::new();
        let mut lines = 0;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let (line, newline) = split_newline(&buf);
            writer.write_all(&self.normalize_line(line))?;
            writer.write_all(newline)?;
            lines += 1;
        }
        writer.flush()?;
        tracing::debug!("Normalized {} dump lines", lines);
        Ok(lines)
    }
}

fn split_newline(chunk: &[u8]) -> (&[u8], &[u8]) {
    match chunk.split_last() {
        Some((&b'\n', line)) => (line, &b"\n"[..]),
        _ => (chunk, &[]),
    }
}
