//! # TypeScript erasure
//!
//! Turns TypeScript into JavaScript by deleting type-only syntax. Nothing is
//! type checked and nothing is optimised; the output is the input minus its
//! types, so it keeps the author's formatting and line numbers.
//!
//! Erasure runs as a fixed sequence of passes. Each pass re-parses the output
//! of the previous one with tree-sitter, runs its queries and applies the
//! resulting byte-range edits:
//!
//! 1. interfaces and `implements` clauses
//! 2. type aliases, ambient declarations, overload and index signatures
//! 3. enums, rewritten into `const` objects
//! 4. annotations on variables, class fields and catch parameters
//! 5. parameter annotations, optional markers and return types
//! 6. `as` and `satisfies` casts
//! 7. generic argument and parameter lists
//! 8. modifiers, with constructor parameter properties turned into
//!    assignments
//! 9. non-null assertions
//!
//! Erasure is best effort: constructs the passes don't recognise are left in
//! place and surface later as syntax errors from the sandbox.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Tree-sitter parser wrapper
pub mod parser;
/// Erasure passes and the edit machinery behind them
mod passes;
/// Tree-sitter queries used by the passes
mod queries;

use parser::Parser;

/// Returns true when `source` contains any TypeScript-only syntax.
pub fn looks_typed(source: &str) -> bool {
    match Parser::new(source.to_string()) {
        Ok(parser) => parser.contains_kind(queries::TYPED_KINDS),
        Err(e) => {
            tracing::warn!("TypeScript parser unavailable: {e:#}");
            false
        }
    }
}

/// Erases TypeScript syntax from `source` if it has any, and returns it
/// unchanged otherwise. Never fails.
pub fn transpile(source: &str) -> String {
    if looks_typed(source) {
        erase(source)
    } else {
        source.to_string()
    }
}

/// Runs every erasure pass over `source`, whether or not it looks typed.
pub fn erase(source: &str) -> String {
    passes::run(source)
}
