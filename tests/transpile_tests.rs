//! Tests for TypeScript erasure.

use tsgrade::{
    Sandbox,
    typescript::{erase, looks_typed, transpile},
};

/// Runs erased `source` and returns its trimmed output, failing the test on
/// any execution error.
fn run_erased(source: &str) -> String {
    let js = transpile(source);
    let result = Sandbox::default().execute(&js);
    assert!(
        result.success(),
        "erased code failed: {:?}\n--- erased ---\n{js}",
        result.error()
    );
    result.output().to_string()
}

#[test]
fn strips_variable_annotation() {
    assert_eq!(transpile("let x: number = 5;"), "let x = 5;");
}

#[test]
fn annotated_and_plain_variables_behave_the_same() {
    let typed = Sandbox::default().execute(&transpile("let x: number = 5; console.log(x);"));
    let plain = Sandbox::default().execute("let x = 5; console.log(x);");
    assert_eq!(typed, plain);
}

#[test]
fn strips_parameter_and_return_types() {
    assert_eq!(
        transpile("function greet(name: string): string { return 'Hi, ' + name; }"),
        "function greet(name) { return 'Hi, ' + name; }"
    );
}

#[test]
fn plain_javascript_passes_through() {
    let js = "function add(a,b){return a+b;}\nconst t = a ? b : c;\nconst y = obj?.field;";
    assert!(!looks_typed(js));
    assert_eq!(transpile(js), js);
}

#[test]
fn detects_typed_syntax() {
    assert!(looks_typed("let x: number = 1;"));
    assert!(looks_typed("interface A { b: string }"));
    assert!(looks_typed("type Id = string;"));
    assert!(looks_typed("enum E { A }"));
    assert!(looks_typed("const v = x as number;"));
    assert!(looks_typed("const n = maybe!.length;"));
    assert!(looks_typed("function f(a?) {}"));
}

#[test]
fn removes_interfaces_and_type_aliases() {
    let source = "interface Point { x: number; y: number }\n\
                  export interface Named { name: string }\n\
                  type Id = string | number;\n\
                  const p: Point = { x: 1, y: 2 };\n\
                  const id: Id = 7;\n\
                  console.log(p.x + p.y, id);";
    let js = transpile(source);
    assert!(!js.contains("interface"), "{js}");
    assert!(!js.contains("type Id"), "{js}");
    assert_eq!(run_erased(source), "3 7");
}

#[test]
fn rewrites_enums_into_objects() {
    assert_eq!(
        transpile("enum Color { Red, Green = \"g\" }"),
        "const Color = { Red: \"Red\", Green: \"g\" };"
    );
}

#[test]
fn const_enums_and_explicit_values_run() {
    let source = "const enum Level { Low = 1, High = 10 }\n\
                  enum Mode { Fast, Slow }\n\
                  console.log(Level.Low + Level.High, Mode.Slow);";
    assert_eq!(run_erased(source), "11 Slow");
}

#[test]
fn strips_generics() {
    assert_eq!(
        transpile("function id<T>(x: T): T { return x; }"),
        "function id(x) { return x; }"
    );
    assert_eq!(
        transpile("const m = new Map<string, number>();"),
        "const m = new Map();"
    );
}

#[test]
fn strips_casts() {
    assert_eq!(transpile("const s = input as string;"), "const s = input;");
    assert_eq!(
        transpile("const dirs = [\"n\", \"s\"] as const;"),
        "const dirs = [\"n\", \"s\"];"
    );
    assert_eq!(
        transpile("const cfg = { a: 1 } satisfies Record<string, number>;"),
        "const cfg = { a: 1 };"
    );
    assert_eq!(transpile("const v = <number>someValue;"), "const v = someValue;");
}

#[test]
fn chained_casts_leave_only_the_operand() {
    assert_eq!(transpile("const v = raw as unknown as number;"), "const v = raw;");
}

#[test]
fn strips_non_null_assertions_only() {
    assert_eq!(
        transpile("const len = name!.length;"),
        "const len = name.length;"
    );
    let untouched = "let ok = !done && a !== b && c != d;";
    assert_eq!(erase(untouched), untouched);
}

#[test]
fn optional_parameters_keep_ternaries() {
    let source = "function f(a: number, b?: number): number { return b === undefined ? a : a + b; }\n\
                  console.log(f(1), f(1, 2));";
    assert_eq!(run_erased(source), "1 3");
}

#[test]
fn parameter_properties_become_assignments() {
    let source = "class Point {\n\
                  \x20 constructor(private x: number, public readonly y: number) {}\n\
                  \x20 sum(): number { return this.x + this.y; }\n\
                  }\n\
                  console.log(new Point(1, 2).sum());";
    let js = transpile(source);
    assert!(js.contains("this.x = x;"), "{js}");
    assert!(!js.contains("private"), "{js}");
    assert_eq!(run_erased(source), "3");
}

#[test]
fn parameter_properties_follow_super_call() {
    let source = "class Base { constructor(name) { this.name = name; } }\n\
                  class Child extends Base {\n\
                  \x20 constructor(name: string, private age: number) {\n\
                  \x20   super(name);\n\
                  \x20 }\n\
                  \x20 describe(): string { return `${this.name}:${this.age}`; }\n\
                  }\n\
                  console.log(new Child(\"a\", 3).describe());";
    assert_eq!(run_erased(source), "a:3");
}

#[test]
fn abstract_classes_and_overrides_run() {
    let source = "abstract class Shape {\n\
                  \x20 abstract area(): number;\n\
                  \x20 describe(): string { return \"area \" + this.area(); }\n\
                  }\n\
                  class Square extends Shape implements Object {\n\
                  \x20 constructor(private side: number) { super(); }\n\
                  \x20 override area(): number { return this.side * this.side; }\n\
                  }\n\
                  console.log(new Square(3).describe());";
    assert_eq!(run_erased(source), "area 9");
}

#[test]
fn class_member_signatures_take_their_separator() {
    assert_eq!(
        transpile("abstract class Sh { abstract area(): number; describe() { return 1; } }"),
        "class Sh {  describe() { return 1; } }"
    );
    assert_eq!(
        erase("class Bag { [key: string]: number; size = 0; }"),
        "class Bag {  size = 0; }"
    );
}

#[test]
fn class_fields_lose_modifiers_and_markers() {
    let source = "class Counter {\n\
                  \x20 private count: number = 0;\n\
                  \x20 label?: string;\n\
                  \x20 readonly step!: number;\n\
                  \x20 inc(): void { this.count++; }\n\
                  \x20 get value(): number { return this.count; }\n\
                  }\n\
                  const c = new Counter();\n\
                  c.inc(); c.inc();\n\
                  console.log(c.value, c.label);";
    assert_eq!(run_erased(source), "2 undefined");
}

#[test]
fn erases_type_only_declarations() {
    let source = "declare const VERSION: string;\n\
                  function pick(x: string): string;\n\
                  function pick(x: number): number;\n\
                  function pick(x: any) { return x; }\n\
                  console.log(typeof VERSION, pick(4));";
    assert_eq!(run_erased(source), "undefined 4");
}

#[test]
fn erases_this_parameters_and_catch_annotations() {
    let source = "function show(this: { n: number }, suffix: string) { return this.n + suffix; }\n\
                  let count!: number;\n\
                  try { throw new Error(\"x\"); } catch (e: unknown) { console.log(show.call({ n: 1 }, \"!\")); }";
    assert_eq!(run_erased(source), "1!");
}

#[test]
fn arrow_functions_and_generics_run() {
    let source = "function wrap<T>(items: T[]): Array<T> { return items.map((i: T): T => i); }\n\
                  const xs: number[] = wrap<number>([1, 2, 3]);\n\
                  console.log(xs.join(\",\"));";
    assert_eq!(run_erased(source), "1,2,3");
}

#[test]
fn transpile_is_idempotent() {
    let sources = [
        "let x: number = 5;",
        "interface A { b: string }\nconst a: A = { b: 'c' };",
        "enum E { A, B = 2 }",
        "class P { constructor(private x: number) {} }",
        "function f<T>(a?: T): T | undefined { return a!; }",
    ];
    for source in sources {
        let once = transpile(source);
        assert_eq!(transpile(&once), once, "not idempotent for {source:?}");
    }
}

#[test]
fn unknown_syntax_is_left_for_the_sandbox() {
    let js = transpile("namespace Geometry { export const pi = 3.14; }\nlet r: number = 1;");
    assert!(js.contains("namespace Geometry"), "{js}");
    assert!(js.contains("let r = 1;"), "{js}");
}
