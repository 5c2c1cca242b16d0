//! Language-level properties checked against the public API.

use egglang::ast::{apply, num, string, word};
use egglang::evaluator::create_global_env_with_output;
use egglang::parser::{ParseConfig, parse_with_config, skip_space};
use egglang::{Error, Node, SyntaxErrorKind, Value, parse, run};
use pretty_assertions::assert_eq;

const PROGRAMS: &[&str] = &[
    "42",
    "\"hello world\"",
    "x",
    "+(a, 10)",
    "f()",
    "f(4)(5)",
    "if(true, 1, 2)",
    "do(define(x, 10), if(>(x, 5), print(\"large\"), print(\"small\")))",
    "do(define(total, 0), define(count, 1), while(<(count, 11), do(define(total, +(total, count)), define(count, +(count, 1)))), print(total))",
    "define(pow, fun(base, exp, if(==(exp, 0), 1, *(base, pow(base, -(exp, 1))))))",
    "define(f, fun(a, fun(b, +(a, b))))",
    "1(2)",
    "\"s\"(x)(y)",
];

fn eval_program(program: &str) -> Result<Value, Error> {
    run(program, &create_global_env_with_output(|_| {}))
}

#[test]
fn canonical_text_round_trips() {
    for program in PROGRAMS {
        let node = parse(program).unwrap_or_else(|e| panic!("{program}: {e}"));
        let rendered = node.to_string();
        assert_eq!(&rendered, program);
        assert_eq!(parse(&rendered), Ok(node));
    }
}

#[test]
fn layout_and_comments_do_not_change_the_tree() {
    let spaced = "
        # compute something
        do( define( x , 10 ) ,   # bind x
            if( >( x , 5 ) ,
                print( \"large\" ) ,
                print( \"small\" ) ) )
    ";
    assert_eq!(parse(spaced), parse(PROGRAMS[7]));
}

#[test]
fn apply_shape() {
    let expected = Node::Apply {
        operator: Box::new(Node::Word("+".to_owned())),
        args: vec![word("a"), num(10)],
    };
    assert_eq!(parse("+(a, 10)"), Ok(expected));
}

#[test]
fn chained_calls_nest_left_to_right() {
    assert_eq!(
        parse("f(1)(2)(3)"),
        Ok(apply(
            apply(apply(word("f"), vec![num(1)]), vec![num(2)]),
            vec![num(3)]
        ))
    );
    assert_eq!(
        parse("\"s\"(x)"),
        Ok(apply(string("s"), vec![word("x")]))
    );
}

#[test]
fn truthiness() {
    let test_cases = [
        ("if(true, 1, 2)", 1),
        ("if(false, 1, 2)", 2),
        ("if(0, 1, 2)", 1),
        ("if(\"\", 1, 2)", 1),
        ("if(array(), 1, 2)", 1),
        ("if(+, 1, 2)", 1),
    ];
    for (program, expected) in test_cases {
        assert_eq!(eval_program(program), Ok(Value::from(expected)), "{program}");
    }
}

#[test]
fn skip_space_is_idempotent() {
    let inputs = ["", "  x", "# a\n# b\n  x", "\t\n", "#", "x # y"];
    for input in inputs {
        let once = skip_space(input);
        assert_eq!(skip_space(once), once);
    }
}

#[test]
fn syntax_error_kinds() {
    let test_cases = [
        (")", SyntaxErrorKind::UnexpectedSyntax),
        ("f(1 2)", SyntaxErrorKind::ExpectedSeparator),
        ("f(1", SyntaxErrorKind::Incomplete),
        ("f(1) g(2)", SyntaxErrorKind::TrailingContent),
    ];
    for (program, kind) in test_cases {
        match parse(program) {
            Err(Error::Syntax(e)) => assert_eq!(e.kind, kind, "{program}"),
            other => panic!("{program}: expected syntax error, got {other:?}"),
        }
    }
}

#[test]
fn not_callable_is_an_evaluation_error() {
    // Parses fine; fails only when run
    assert!(parse("1(2)").is_ok());
    assert!(matches!(eval_program("1(2)"), Err(Error::NotCallable(_))));
}

#[test]
fn parse_config_limits_depth() {
    let config = ParseConfig {
        max_depth: 2,
        ..ParseConfig::default()
    };
    assert!(parse_with_config("f(g(1))", config).is_ok());
    assert!(matches!(
        parse_with_config("f(g(h(1)))", config),
        Err(Error::Syntax(e)) if e.kind == SyntaxErrorKind::TooDeeplyNested
    ));
}
