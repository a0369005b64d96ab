//! Tree-sitter queries driving the erasure passes.
//!
//! Every entry is a single pattern so that one pattern the grammar rejects
//! only disables itself, not the whole pass. Unless noted otherwise a query
//! binds `@erase` to the span to delete.

/// Interface declarations (an enclosing `export` goes with them) and
/// `implements` clauses.
pub const INTERFACE_QUERIES: &[&str] = &[
    "(export_statement declaration: (interface_declaration)) @erase",
    "(interface_declaration) @erase",
    "(implements_clause) @erase",
];

/// Declarations with no runtime semantics: type aliases, ambient `declare`
/// statements, overload signatures, abstract method signatures and class
/// index signatures.
pub const TYPE_ONLY_QUERIES: &[&str] = &[
    "(export_statement declaration: (type_alias_declaration)) @erase",
    "(type_alias_declaration) @erase",
    "(ambient_declaration) @erase",
    "(function_signature) @erase",
    "(abstract_method_signature) @erase",
    "(class_body (method_signature) @erase)",
    "(class_body (index_signature) @erase)",
];

/// Enum declarations.
/// * `enum`: the whole declaration, rewritten into an object binding
pub const ENUM_QUERY: &str = "(enum_declaration) @enum";

/// Annotations and markers in declaration positions: variables, class fields
/// and catch clause parameters.
pub const DECLARATION_QUERIES: &[&str] = &[
    "(variable_declarator type: (type_annotation) @erase)",
    "(variable_declarator \"!\" @erase)",
    "(public_field_definition type: (type_annotation) @erase)",
    "(public_field_definition \"?\" @erase)",
    "(public_field_definition \"!\" @erase)",
    "(catch_clause type: (type_annotation) @erase)",
];

/// Parameter annotations, optional markers and return types of every
/// function-like node.
pub const SIGNATURE_QUERIES: &[&str] = &[
    "(required_parameter type: (type_annotation) @erase)",
    "(optional_parameter type: (type_annotation) @erase)",
    "(optional_parameter \"?\" @erase)",
    "(method_definition \"?\" @erase)",
    "(function_declaration return_type: (_) @erase)",
    "(function_expression return_type: (_) @erase)",
    "(generator_function_declaration return_type: (_) @erase)",
    "(generator_function return_type: (_) @erase)",
    "(arrow_function return_type: (_) @erase)",
    "(method_definition return_type: (_) @erase)",
];

/// Explicit `this` parameters, which only exist for the type checker.
/// * `param`: the parameter node
pub const THIS_PARAMETER_QUERY: &str = "(formal_parameters (required_parameter pattern: (this)) @param)";

/// Cast-like expressions; the operand is kept and the rest dropped.
/// * `cast`: the whole expression
pub const CAST_QUERIES: &[&str] = &["(as_expression) @cast", "(satisfies_expression) @cast"];

/// Generic argument and parameter lists.
pub const GENERIC_QUERIES: &[&str] = &["(type_arguments) @erase", "(type_parameters) @erase"];

/// Modifier keywords.
/// * `modifier`: the keyword, deleted along with the whitespace after it
pub const MODIFIER_QUERIES: &[&str] = &[
    "(accessibility_modifier) @modifier",
    "(override_modifier) @modifier",
    "(required_parameter \"readonly\" @modifier)",
    "(optional_parameter \"readonly\" @modifier)",
    "(public_field_definition \"readonly\" @modifier)",
    "(public_field_definition \"declare\" @modifier)",
    "(public_field_definition \"abstract\" @modifier)",
    "(abstract_class_declaration \"abstract\" @modifier)",
];

/// Method definitions, filtered down to constructors when turning parameter
/// properties into assignments.
/// * `method`: the `method_definition` node
pub const METHOD_QUERY: &str = "(method_definition body: (statement_block)) @method";

/// Non-null assertions.
/// * `assertion`: the whole `expr!` node
pub const NON_NULL_QUERY: &str = "(non_null_expression) @assertion";

/// Node kinds that only occur in TypeScript.
pub const TYPED_KINDS: &[&str] = &[
    "type_annotation",
    "interface_declaration",
    "type_alias_declaration",
    "enum_declaration",
    "type_arguments",
    "type_parameters",
    "type_assertion",
    "as_expression",
    "satisfies_expression",
    "non_null_expression",
    "accessibility_modifier",
    "override_modifier",
    "optional_parameter",
    "implements_clause",
    "ambient_declaration",
    "function_signature",
    "abstract_class_declaration",
    "abstract_method_signature",
    "index_signature",
];
