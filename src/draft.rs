//! Textual draft-node descriptor (§6): a small recursive-descent parser and
//! serializer used by tests and ad-hoc diagnostics. Out of the core's scope
//! proper — it consumes the [`Type::draft`]/[`Node`] surface like any other
//! external collaborator — but shipped as a crate feature since the test
//! scenarios of §8 build their trees this way.
//!
//! ```text
//! Tree      := Name ('<' '"' Data '"' '>')? ('(' Child (',' Child)* ')')?
//! Name      := [A-Za-z]+
//! Data      := any characters except '"'
//! Child     := Tree
//! ```
//!
//! Malformed data (`<$>` with no quotes) silently degrades to empty data
//! (§6). Unknown characters inside a children list are skipped to the next
//! `,` or `)` (§6). Nodes are built via [`Type::draft`], so no descriptor
//! string is ever rejected by arity or child-type checks.

use std::iter::Peekable;
use std::str::Chars;

use crate::node::{Fragment, Node, Type};

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn parse_tree(&mut self) -> Option<Node> {
        let name = self.parse_name()?;
        let data = self.parse_data();
        let children = self.parse_children();
        Some(
            Type::draft(name)
                .build(data.unwrap_or_default(), children, Fragment::empty())
                .expect("Type::draft never rejects a build"),
        )
    }

    fn parse_name(&mut self) -> Option<String> {
        let mut name = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphabetic() {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    /// Parses an optional `<"..">` suffix. Returns `None` if there is no
    /// `<` at all; returns `Some(String::new())` if a `<...>` is present but
    /// malformed (no leading quote) — the malformed span is still consumed
    /// so parsing can continue past it.
    fn parse_data(&mut self) -> Option<String> {
        if self.chars.peek() != Some(&'<') {
            return None;
        }
        self.chars.next(); // consume '<'
        if self.chars.peek() != Some(&'"') {
            // Malformed: `<$>`-shaped. Skip to the closing '>' (if any) and
            // degrade to empty data.
            for c in self.chars.by_ref() {
                if c == '>' {
                    break;
                }
            }
            return Some(String::new());
        }
        self.chars.next(); // consume opening '"'
        let mut data = String::new();
        for c in self.chars.by_ref() {
            if c == '"' {
                break;
            }
            data.push(c);
        }
        if self.chars.peek() == Some(&'>') {
            self.chars.next();
        }
        Some(data)
    }

    fn parse_children(&mut self) -> Vec<Node> {
        if self.chars.peek() != Some(&'(') {
            return Vec::new();
        }
        self.chars.next(); // consume '('
        let mut children = Vec::new();
        loop {
            self.skip_until_name_or_boundary();
            match self.chars.peek() {
                None | Some(&')') => {
                    self.chars.next();
                    break;
                }
                _ => {}
            }
            if let Some(child) = self.parse_tree() {
                children.push(child);
            } else {
                self.skip_to_boundary();
            }
            self.skip_until_name_or_boundary();
            match self.chars.next() {
                Some(',') => continue,
                Some(')') | None => break,
                Some(_) => continue,
            }
        }
        children
    }

    /// Skips characters that are neither the start of a child (an alphabetic
    /// name character) nor a list boundary (`,`/`)`).
    fn skip_until_name_or_boundary(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == ',' || c == ')' || c.is_ascii_alphabetic() {
                break;
            }
            self.chars.next();
        }
    }

    /// Skips to (but does not consume) the next `,` or `)` — used when a
    /// child position holds unrecognized characters (§6).
    fn skip_to_boundary(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == ',' || c == ')' {
                break;
            }
            self.chars.next();
        }
    }
}

/// Parse a draft descriptor string into a [`Node`] tree.
///
/// `create` never fails: an input with no leading name yields
/// [`Node::dummy`], matching the core's "builder rejection surfaces as a
/// dummy node, never an exception" policy (§7).
pub fn create(input: &str) -> Node {
    Parser::new(input).parse_tree().unwrap_or_else(Node::dummy)
}

/// Serialize a node back to its draft descriptor string — the inverse of
/// [`create`] for any tree `create` could have produced (§8 property 8).
///
/// Note: a node with empty data is serialized with no `<"">` suffix at all,
/// since [`Node::data`] cannot distinguish "no data tag" from "an explicit,
/// empty one" — round-tripping `Name<"">` is therefore out of scope.
pub fn serialize(node: &Node) -> String {
    let mut out = String::new();
    out.push_str(node.ty().name());
    if !node.data().is_empty() {
        out.push_str("<\"");
        out.push_str(node.data());
        out.push_str("\">");
    }
    if !node.children().is_empty() {
        out.push('(');
        for (i, child) in node.children().iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&serialize(child));
        }
        out.push(')');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_name() {
        let n = create("A");
        assert_eq!(n.ty().name(), "A");
        assert_eq!(n.data(), "");
        assert!(n.children().is_empty());
    }

    #[test]
    fn parses_data_and_children() {
        let n = create("S(a, b, c)");
        assert_eq!(n.ty().name(), "S");
        assert_eq!(n.children().len(), 3);
        assert_eq!(n.children()[0].ty().name(), "a");
    }

    #[test]
    fn parses_quoted_data() {
        let n = create(r#"IntLit<"2">"#);
        assert_eq!(n.ty().name(), "IntLit");
        assert_eq!(n.data(), "2");
    }

    #[test]
    fn malformed_data_degrades_to_empty() {
        let n = create("A<$>(b)");
        assert_eq!(n.ty().name(), "A");
        assert_eq!(n.data(), "");
        assert_eq!(n.children().len(), 1);
    }

    #[test]
    fn unknown_characters_in_children_are_skipped() {
        let n = create("S(a, !!!, b)");
        assert_eq!(n.ty().name(), "S");
        let names: Vec<&str> = n.children().iter().map(|c| c.ty().name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn round_trip_preserves_shape() {
        for s in [
            "A",
            "S(a,b,c)",
            r#"IntLit<"2">"#,
            "P(S(a,b,c),T)",
            r#"X(Y<"hi">,Z)"#,
        ] {
            let n = create(s);
            assert_eq!(serialize(&n), s, "round-trip failed for {s:?}");
        }
    }
}
