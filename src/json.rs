//! JSON interchange format for syntax trees.
//!
//! Each node becomes an object tagged by `type`:
//!
//! ```json
//! {"type": "apply",
//!  "operator": {"type": "word", "name": ">"},
//!  "args": [{"type": "word", "name": "x"},
//!           {"type": "value", "value": 5}]}
//! ```
//!
//! `value` holds a JSON number or string; integral numbers are written
//! without a fractional part.

use serde_json::json;

use crate::ast::{Literal, Node, NumberType, apply, num, string, word};
use crate::{Error, MAX_PARSE_DEPTH, SyntaxError, SyntaxErrorKind};

fn json_error(message: impl Into<String>) -> Error {
    SyntaxError::from_message(SyntaxErrorKind::UnexpectedSyntax, message).into()
}

fn number_to_json(n: NumberType) -> serde_json::Value {
    // Exactly representable integers print as `5`, not `5.0`
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

/// Convert a syntax tree to its JSON form
pub fn ast_to_json(node: &Node) -> serde_json::Value {
    match node {
        Node::Literal(Literal::Number(n)) => json!({"type": "value", "value": number_to_json(*n)}),
        Node::Literal(Literal::String(s)) => json!({"type": "value", "value": s}),
        Node::Word(name) => json!({"type": "word", "name": name}),
        Node::Apply { operator, args } => json!({
            "type": "apply",
            "operator": ast_to_json(operator),
            "args": args.iter().map(ast_to_json).collect::<Vec<_>>(),
        }),
    }
}

/// Convert a syntax tree to a compact JSON string
pub fn ast_to_json_string(node: &Node) -> String {
    ast_to_json(node).to_string()
}

/// Deepest `{`/`[` nesting a valid tree can reach: every apply level adds
/// its node object and its `args` array.
const MAX_JSON_NESTING: usize = 2 * MAX_PARSE_DEPTH + 1;

fn too_deep() -> Error {
    SyntaxError::from_message(
        SyntaxErrorKind::TooDeeplyNested,
        format!("JSON syntax tree too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
    )
    .into()
}

/// Whether brackets outside of string literals nest deeper than `limit`
fn nesting_exceeds(input: &str, limit: usize) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for byte in input.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                if depth > limit {
                    return true;
                }
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}

/// Parse the JSON form of a syntax tree
///
/// Accepts trees as deep as [`parse`](crate::parse) does.
pub fn parse_json_ast(input: &str) -> Result<Node, Error> {
    // serde_json's own limit (128) is below what deep trees need, so it is
    // lifted and the nesting bounded here before any recursion happens
    if nesting_exceeds(input, MAX_JSON_NESTING) {
        return Err(too_deep());
    }

    let mut deserializer = serde_json::Deserializer::from_str(input);
    deserializer.disable_recursion_limit();
    let mut values = deserializer.into_iter::<serde_json::Value>();

    let json_value = match values.next() {
        Some(Ok(value)) => value,
        Some(Err(e)) => return Err(json_error(format!("Invalid JSON: {e}"))),
        None => return Err(json_error("Invalid JSON: empty input")),
    };
    if values.next().is_some() {
        return Err(json_error("Invalid JSON: trailing content after the tree"));
    }

    json_to_ast(&json_value, 0)
}

fn json_to_ast(json: &serde_json::Value, depth: usize) -> Result<Node, Error> {
    if depth > MAX_PARSE_DEPTH {
        return Err(too_deep());
    }

    let serde_json::Value::Object(obj) = json else {
        return Err(json_error(format!("Expected a node object, got {json}")));
    };

    match obj.get("type").and_then(serde_json::Value::as_str) {
        Some("value") => match obj.get("value") {
            Some(serde_json::Value::String(s)) => Ok(string(s)),
            Some(serde_json::Value::Number(n)) => n
                .as_f64()
                .map(num)
                .ok_or_else(|| json_error(format!("Unrepresentable number: {n}"))),
            _ => Err(json_error("Value nodes need a string or number \"value\"")),
        },

        Some("word") => match obj.get("name") {
            Some(serde_json::Value::String(name)) => Ok(word(name)),
            _ => Err(json_error("Word nodes need a string \"name\"")),
        },

        Some("apply") => {
            let operator = obj
                .get("operator")
                .ok_or_else(|| json_error("Apply nodes need an \"operator\""))?;
            let Some(serde_json::Value::Array(args)) = obj.get("args") else {
                return Err(json_error("Apply nodes need an \"args\" array"));
            };

            let operator = json_to_ast(operator, depth + 1)?;
            let args = args
                .iter()
                .map(|arg| json_to_ast(arg, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(apply(operator, args))
        }

        Some(other) => Err(json_error(format!("Unknown node type: {other}"))),
        None => Err(json_error("Node objects need a string \"type\"")),
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_node_shapes() {
        let node = parse(">(x, 5)").unwrap();
        assert_eq!(
            ast_to_json(&node),
            json!({
                "type": "apply",
                "operator": {"type": "word", "name": ">"},
                "args": [
                    {"type": "word", "name": "x"},
                    {"type": "value", "value": 5}
                ]
            })
        );

        assert_eq!(
            ast_to_json_string(&string("hi")),
            r#"{"type":"value","value":"hi"}"#
        );
        assert_eq!(ast_to_json(&num(0.5)), json!({"type": "value", "value": 0.5}));
    }

    #[test]
    fn test_programs_survive_json() {
        let programs = [
            "42",
            "\"text with # and ,\"",
            "f(4)(5)",
            "do(define(total, 0), while(<(total, 3), set(total, +(total, 1))), print(total))",
            "define(f, fun(a, fun(b, +(a, b))))",
        ];

        for program in programs {
            let node = parse(program).unwrap();
            let text = ast_to_json_string(&node);
            assert_eq!(parse_json_ast(&text).unwrap(), node, "{program}");
        }
    }

    #[test]
    fn test_malformed_json() {
        let test_cases = [
            "not json",
            "5",
            r#"{"name": "x"}"#,
            r#"{"type": "word"}"#,
            r#"{"type": "word", "name": 5}"#,
            r#"{"type": "value", "value": true}"#,
            r#"{"type": "apply", "args": []}"#,
            r#"{"type": "apply", "operator": {"type": "word", "name": "f"}}"#,
            r#"{"type": "apply", "operator": {"type": "word", "name": "f"}, "args": [1]}"#,
            r#"{"type": "lambda"}"#,
            "",
            r#"{"type": "word", "name": "x"} {"type": "word", "name": "y"}"#,
        ];

        for input in test_cases {
            match parse_json_ast(input) {
                Err(Error::Syntax(e)) => {
                    assert_eq!(e.kind, SyntaxErrorKind::UnexpectedSyntax, "{input}")
                }
                other => panic!("{input}: expected syntax error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_json_depth_limit() {
        let mut node = word("x");
        for _ in 0..=MAX_PARSE_DEPTH {
            node = apply(word("f"), vec![node]);
        }
        let json_value = ast_to_json(&node);
        match json_to_ast(&json_value, 0) {
            Err(Error::Syntax(e)) => assert_eq!(e.kind, SyntaxErrorKind::TooDeeplyNested),
            other => panic!("expected depth error, got {other:?}"),
        }
    }

    /// Trees at the parser's depth limit need more stack than a default
    /// test thread has in debug builds
    fn with_large_stack(test: impl FnOnce() + Send + 'static) {
        std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(test)
            .unwrap()
            .join()
            .unwrap();
    }

    fn nested(depth: usize) -> String {
        format!("{}1{}", "f(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn test_deep_trees_survive_json() {
        with_large_stack(|| {
            for depth in [200, MAX_PARSE_DEPTH] {
                let node = parse(&nested(depth)).unwrap();
                let text = ast_to_json_string(&node);
                assert_eq!(parse_json_ast(&text).unwrap(), node, "depth {depth}");
            }

            let mut node = word("x");
            for _ in 0..=MAX_PARSE_DEPTH {
                node = apply(word("f"), vec![node]);
            }
            match parse_json_ast(&ast_to_json_string(&node)) {
                Err(Error::Syntax(e)) => assert_eq!(e.kind, SyntaxErrorKind::TooDeeplyNested),
                other => panic!("expected depth error, got {other:?}"),
            }
        });
    }

    #[test]
    fn test_hostile_nesting_is_rejected_before_parsing() {
        for input in ["[".repeat(100_000), "{\"a\":".repeat(100_000)] {
            match parse_json_ast(&input) {
                Err(Error::Syntax(e)) => assert_eq!(e.kind, SyntaxErrorKind::TooDeeplyNested),
                other => panic!("expected depth error, got {other:?}"),
            }
        }

        // Brackets inside strings do not count
        let word_node = format!(
            r#"{{"type": "word", "name": "{}\\\"{}"}}"#,
            "[".repeat(1000),
            "{".repeat(1000)
        );
        assert_eq!(
            parse_json_ast(&word_node).unwrap(),
            word(format!("{}\\\"{}", "[".repeat(1000), "{".repeat(1000)))
        );
    }
}
