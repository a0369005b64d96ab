#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Formatter;

use anyhow::{Context, Result, anyhow};
use tree_sitter::{Language, Node, Query, QueryCursor, StreamingIterator, Tree};

/// Wraps a tree-sitter TypeScript parse of a piece of source code.
pub struct Parser {
    /// the source code being parsed
    code: String,
    /// the parse tree
    tree: Tree,
    /// the tree-sitter typescript grammar language
    lang: Language,
}

/// Returns the compiled tree-sitter TypeScript language.
fn typescript_language() -> Language {
    tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("bytes", &self.code.len())
            .finish_non_exhaustive()
    }
}

impl Parser {
    /// Parses `source_code` with the TypeScript grammar.
    pub fn new(source_code: String) -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        let language = typescript_language();

        parser
            .set_language(&language)
            .with_context(|| "Failed to load TypeScript grammar")?;
        let tree = parser
            .parse(source_code.as_str(), None)
            .ok_or_else(|| anyhow!("Error parsing TypeScript code"))?;

        Ok(Self {
            code: source_code,
            tree,
            lang: language,
        })
    }

    /// A getter for parser's source code
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// Consumes the parser, returning the source code.
    pub fn into_code(self) -> String {
        self.code
    }

    /// Returns the root node of the parse tree.
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Returns the text spanned by `node`, or an empty string if the span is
    /// not valid UTF-8.
    pub fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.code.as_bytes()).unwrap_or_default()
    }

    /// Runs a tree-sitter query and returns every node bound to `capture_name`,
    /// in match order.
    ///
    /// * `q`: the tree-sitter query to be applied
    /// * `capture_name`: the capture to collect
    pub fn captures(&self, q: &str, capture_name: &str) -> Result<Vec<Node<'_>>> {
        let query = Query::new(&self.lang, q)
            .with_context(|| format!("Failed to compile tree-sitter query: {q}"))?;
        let capture_index = query
            .capture_index_for_name(capture_name)
            .ok_or_else(|| anyhow!("Capture name {capture_name} not present in query"))?;

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, self.tree.root_node(), self.code.as_bytes());
        let mut results = Vec::new();

        while let Some(m) = matches.next() {
            results.extend(
                m.captures
                    .iter()
                    .filter(|c| c.index == capture_index)
                    .map(|c| c.node),
            );
        }

        Ok(results)
    }

    /// Returns true when any node in the tree has one of the given kinds.
    pub fn contains_kind(&self, kinds: &[&str]) -> bool {
        let mut cursor = self.tree.walk();
        loop {
            if kinds.contains(&cursor.node().kind()) {
                return true;
            }
            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return false;
                }
            }
        }
    }
}
