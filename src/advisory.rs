// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Syntax advisory
//
// Best-effort structural checks over the final diagram text. Produces
// human-readable warnings only; never alters output or fails a request.

use std::sync::LazyLock;

use regex::Regex;

/// An identifier immediately followed by a bracket-node opener.
static NODE_OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9_]+\[").unwrap_or_else(|e| panic!("node opener regex: {e}"))
});

/// Edge tokens that make several bracket nodes on one line legitimate.
const EDGE_ARROWS: [&str; 3] = ["-->", "-.->", "==>"];

const COMMENT_PREFIX: &str = "%%";

struct BracketKind {
    name: &'static str,
    open: char,
    close: char,
}

const BRACKETS: [BracketKind; 3] = [
    BracketKind {
        name: "square brackets",
        open: '[',
        close: ']',
    },
    BracketKind {
        name: "curly braces",
        open: '{',
        close: '}',
    },
    BracketKind {
        name: "parentheses",
        open: '(',
        close: ')',
    },
];

/// Check `code` for unbalanced brackets and concatenated node definitions.
///
/// Blank lines and `%%` comments are skipped. Bracket counts are tallied
/// across the whole text; node checks are per line with 1-based numbers.
pub fn advise(code: &str) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut balance = [0i64; 3];

    for (index, raw_line) in code.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
            continue;
        }

        for ch in line.chars() {
            for (kind, count) in BRACKETS.iter().zip(balance.iter_mut()) {
                if ch == kind.open {
                    *count += 1;
                } else if ch == kind.close {
                    *count -= 1;
                }
            }
        }

        let has_edge = EDGE_ARROWS.iter().any(|arrow| line.contains(arrow));
        if !has_edge && NODE_OPENER.find_iter(line).count() > 1 {
            warnings.push(format!(
                "line {}: possible concatenated node definitions",
                index + 1
            ));
        }
    }

    for (kind, count) in BRACKETS.iter().zip(balance) {
        match count {
            0 => {}
            n if n > 0 => warnings.push(format!(
                "{} unbalanced: missing {n} '{}'",
                kind.name, kind.close
            )),
            n => warnings.push(format!(
                "{} unbalanced: {} extra '{}'",
                kind.name,
                n.unsigned_abs(),
                kind.close
            )),
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_diagram_has_no_warnings() {
        assert!(advise("A[x]\nB[y]\nA --> B").is_empty());
    }

    #[test]
    fn unterminated_square_bracket() {
        assert_eq!(
            advise("A[x"),
            vec!["square brackets unbalanced: missing 1 ']'"]
        );
    }

    #[test]
    fn extra_closers_are_reported() {
        assert_eq!(
            advise("A[x]]\nB{y}}}"),
            vec![
                "square brackets unbalanced: 1 extra ']'",
                "curly braces unbalanced: 2 extra '}'",
            ]
        );
    }

    #[test]
    fn imbalance_is_tallied_across_lines() {
        assert!(advise("A(start\nand end)").is_empty());
        assert_eq!(
            advise("C{decide\nD((x)"),
            vec![
                "curly braces unbalanced: missing 1 '}'",
                "parentheses unbalanced: missing 1 ')'",
            ]
        );
    }

    #[test]
    fn concatenated_nodes_flagged_with_line_number() {
        let code = "flowchart TD\nA[one]B[two]\nA --> B";
        assert_eq!(
            advise(code),
            vec!["line 2: possible concatenated node definitions"]
        );
    }

    #[test]
    fn nodes_joined_by_edges_are_not_flagged() {
        let code = "A[one] --> B[two]\nC[three] -.-> D[four]\nE[five] ==> F[six]";
        assert!(advise(code).is_empty());
    }

    #[test]
    fn comments_and_blank_lines_are_skipped_but_counted() {
        let code = "%% A[ B[ (\n\nX[a]Y[b]";
        assert_eq!(
            advise(code),
            vec!["line 3: possible concatenated node definitions"]
        );
    }

    #[test]
    fn empty_input_is_clean() {
        assert!(advise("").is_empty());
    }
}
