#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use itertools::Itertools;
use tree_sitter::Node;

use super::{parser::Parser, queries::*};

/// A byte-range replacement in a piece of source text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Edit {
    /// first byte replaced
    start:       usize,
    /// one past the last byte replaced
    end:         usize,
    /// text written in place of `start..end`
    replacement: String,
}

impl Edit {
    /// Deletes `start..end`.
    pub(crate) fn delete(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            replacement: String::new(),
        }
    }

    /// Deletes the text spanned by `node`.
    fn delete_node(node: Node<'_>) -> Self {
        Self::delete(node.start_byte(), node.end_byte())
    }

    /// Replaces `start..end` with `text`.
    pub(crate) fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: text.into(),
        }
    }

    /// Inserts `text` at byte offset `at`.
    pub(crate) fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at, at, text)
    }
}

/// Applies `edits` to `code`. When two edits overlap, the one that starts
/// first wins, and among edits starting at the same offset the longest one
/// wins. Exact duplicates are applied once.
pub(crate) fn apply_edits(code: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    edits.dedup();

    let mut out = String::with_capacity(code.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.start < cursor || edit.end > code.len() {
            continue;
        }
        out.push_str(&code[cursor..edit.start]);
        out.push_str(&edit.replacement);
        cursor = edit.end;
    }
    out.push_str(&code[cursor..]);
    out
}

/// An erasure pass: inspects a parse and proposes edits.
type Pass = fn(&Parser) -> Vec<Edit>;

/// Erasure passes, in the order they run.
const PASSES: &[(&str, Pass)] = &[
    ("interfaces", erase_interfaces),
    ("type declarations", erase_type_declarations),
    ("enums", rewrite_enums),
    ("declaration annotations", erase_declaration_annotations),
    ("signatures", erase_signatures),
    ("casts", erase_casts),
    ("generics", erase_generics),
    ("modifiers", erase_modifiers),
    ("non-null assertions", erase_non_null_assertions),
];

/// Runs every erasure pass over `source`, re-parsing between passes.
pub(crate) fn run(source: &str) -> String {
    let mut code = source.to_string();

    for (name, pass) in PASSES {
        let parser = match Parser::new(code.clone()) {
            Ok(parser) => parser,
            Err(e) => {
                tracing::warn!("TypeScript parser unavailable, leaving source as-is: {e:#}");
                return source.to_string();
            }
        };

        let edits = pass(&parser);
        if edits.is_empty() {
            continue;
        }
        tracing::debug!(pass = name, edits = edits.len(), "Applying erasure pass");
        code = apply_edits(parser.code(), edits);
    }

    code
}

/// Collects the `capture` nodes of every query in `queries`. Queries the
/// grammar rejects are logged and skipped.
fn capture_all<'a>(parser: &'a Parser, queries: &[&str], capture: &str) -> Vec<Node<'a>> {
    queries
        .iter()
        .flat_map(|q| match parser.captures(q, capture) {
            Ok(nodes) => nodes,
            Err(e) => {
                tracing::warn!("Skipping erasure query: {e:#}");
                Vec::new()
            }
        })
        .collect()
}

/// Returns the offset just past any spaces or tabs starting at `from`.
fn skip_blanks(code: &str, from: usize) -> usize {
    from + code[from..]
        .bytes()
        .take_while(|b| *b == b' ' || *b == b'\t')
        .count()
}

/// Builds deletions for every `@erase` capture of `queries`.
fn erase_captures(parser: &Parser, queries: &[&str]) -> Vec<Edit> {
    capture_all(parser, queries, "erase")
        .into_iter()
        .map(Edit::delete_node)
        .collect()
}

/// Pass 1: interface declarations and `implements` clauses.
fn erase_interfaces(parser: &Parser) -> Vec<Edit> {
    erase_captures(parser, INTERFACE_QUERIES)
}

/// Pass 2: type aliases and other declarations with no runtime meaning.
/// Class members take their `;` or `,` separator with them.
fn erase_type_declarations(parser: &Parser) -> Vec<Edit> {
    capture_all(parser, TYPE_ONLY_QUERIES, "erase")
        .into_iter()
        .map(|node| {
            let end = node
                .next_sibling()
                .filter(|next| matches!(next.kind(), ";" | ","))
                .map_or(node.end_byte(), |next| next.end_byte());
            Edit::delete(node.start_byte(), end)
        })
        .collect()
}

/// Pass 3: `enum Name { A, B = expr }` becomes
/// `const Name = { A: "A", B: expr };`.
fn rewrite_enums(parser: &Parser) -> Vec<Edit> {
    capture_all(parser, &[ENUM_QUERY], "enum")
        .into_iter()
        .filter_map(|node| {
            let name = parser.text(node.child_by_field_name("name")?);
            let body = node.child_by_field_name("body")?;
            let mut cursor = body.walk();

            let members = body
                .named_children(&mut cursor)
                .filter_map(|member| enum_member(parser, member))
                .join(", ");
            let object = if members.is_empty() {
                "{}".to_string()
            } else {
                format!("{{ {members} }}")
            };

            Some(Edit::replace(
                node.start_byte(),
                node.end_byte(),
                format!("const {name} = {object};"),
            ))
        })
        .collect()
}

/// Renders one enum member as an object property, or `None` for comments
/// and anything unrecognised.
fn enum_member(parser: &Parser, member: Node<'_>) -> Option<String> {
    match member.kind() {
        "property_identifier" => {
            let key = parser.text(member);
            Some(format!("{key}: \"{key}\""))
        }
        "string" => {
            let key = parser.text(member);
            Some(format!("{key}: {key}"))
        }
        "enum_assignment" => {
            let key = parser.text(member.child_by_field_name("name")?);
            let value = parser.text(member.child_by_field_name("value")?);
            Some(format!("{key}: {value}"))
        }
        _ => None,
    }
}

/// Pass 4: annotations and `?`/`!` markers on variables, class fields and
/// catch parameters.
fn erase_declaration_annotations(parser: &Parser) -> Vec<Edit> {
    erase_captures(parser, DECLARATION_QUERIES)
}

/// Pass 5: parameter annotations, optional markers, return types and
/// explicit `this` parameters.
fn erase_signatures(parser: &Parser) -> Vec<Edit> {
    let mut edits = erase_captures(parser, SIGNATURE_QUERIES);

    for param in capture_all(parser, &[THIS_PARAMETER_QUERY], "param") {
        let mut end = param.end_byte();
        if let Some(comma) = param.next_sibling().filter(|n| n.kind() == ",") {
            end = skip_blanks(parser.code(), comma.end_byte());
        }
        edits.push(Edit::delete(param.start_byte(), end));
    }

    edits
}

/// Pass 6: `expr as T`, `expr as const` and `expr satisfies T` keep only
/// `expr`.
fn erase_casts(parser: &Parser) -> Vec<Edit> {
    capture_all(parser, CAST_QUERIES, "cast")
        .into_iter()
        .filter_map(|cast| {
            let operand = cast.named_child(0)?;
            Some(Edit::delete(operand.end_byte(), cast.end_byte()))
        })
        .collect()
}

/// Pass 7: generic argument and parameter lists, including the `<T>` prefix
/// of old-style assertions.
fn erase_generics(parser: &Parser) -> Vec<Edit> {
    erase_captures(parser, GENERIC_QUERIES)
}

/// Pass 8: modifier keywords. Constructor parameter properties also get a
/// matching `this.x = x;` at the top of the constructor body.
fn erase_modifiers(parser: &Parser) -> Vec<Edit> {
    let code = parser.code();
    let mut edits: Vec<Edit> = capture_all(parser, MODIFIER_QUERIES, "modifier")
        .into_iter()
        .map(|m| Edit::delete(m.start_byte(), skip_blanks(code, m.end_byte())))
        .collect();

    for method in capture_all(parser, &[METHOD_QUERY], "method") {
        if let Some(edit) = parameter_property_assignments(parser, method) {
            edits.push(edit);
        }
    }

    edits
}

/// Returns true when a parameter carries a modifier that makes it a
/// parameter property.
fn is_parameter_property(param: Node<'_>) -> bool {
    let mut cursor = param.walk();
    param.children(&mut cursor).any(|child| {
        matches!(
            child.kind(),
            "accessibility_modifier" | "override_modifier" | "readonly"
        )
    })
}

/// For a constructor with parameter properties, builds the insertion of
/// their assignments: after a leading `super(...)` call, else right after
/// the opening brace.
fn parameter_property_assignments(parser: &Parser, method: Node<'_>) -> Option<Edit> {
    let name = method.child_by_field_name("name")?;
    if parser.text(name) != "constructor" {
        return None;
    }
    let params = method.child_by_field_name("parameters")?;
    let body = method.child_by_field_name("body")?;

    let mut cursor = params.walk();
    let assignments = params
        .named_children(&mut cursor)
        .filter(|p| matches!(p.kind(), "required_parameter" | "optional_parameter"))
        .filter(|p| is_parameter_property(*p))
        .filter_map(|p| p.child_by_field_name("pattern"))
        .filter(|pattern| pattern.kind() == "identifier")
        .map(|pattern| {
            let field = parser.text(pattern);
            format!(" this.{field} = {field};")
        })
        .join("");

    if assignments.is_empty() {
        return None;
    }

    let at = leading_super_call(parser, body)
        .map(|stmt| stmt.end_byte())
        .unwrap_or(body.start_byte() + 1);
    Some(Edit::insert(at, assignments))
}

/// Returns the first statement of `body` if it is a `super(...)` call.
fn leading_super_call<'a>(parser: &Parser, body: Node<'a>) -> Option<Node<'a>> {
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let call = first.named_child(0).filter(|n| n.kind() == "call_expression")?;
    let callee = call.child_by_field_name("function")?;
    (callee.kind() == "super" || parser.text(callee) == "super").then_some(first)
}

/// Pass 9: `x!` becomes `x`.
fn erase_non_null_assertions(parser: &Parser) -> Vec<Edit> {
    let code = parser.code();
    capture_all(parser, &[NON_NULL_QUERY], "assertion")
        .into_iter()
        .filter(|n| n.end_byte() > n.start_byte() && code.as_bytes()[n.end_byte() - 1] == b'!')
        .map(|n| Edit::delete(n.end_byte() - 1, n.end_byte()))
        .collect()
}
