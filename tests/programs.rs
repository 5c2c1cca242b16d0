//! Whole programs run through the public API.

use std::cell::RefCell;
use std::rc::Rc;

use egglang::evaluator::{create_global_env, create_global_env_with_output};
use egglang::{Error, Value, run};

fn run_program(program: &str) -> Result<Value, Error> {
    run(program, &create_global_env_with_output(|_| {}))
}

/// Run `program` and return everything it printed
fn printed_by(program: &str) -> (Result<Value, Error>, Vec<String>) {
    let printed = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&printed);
    let global = create_global_env_with_output(move |value| sink.borrow_mut().push(value.to_string()));
    let result = run(program, &global);
    let lines = printed.borrow().clone();
    (result, lines)
}

#[test]
fn sums_one_to_ten() {
    let program = r#"
        # sum the integers 1..10
        do(define(total, 0),
           define(count, 1),
           while(<(count, 11),
                 do(define(total, +(total, count)),
                    define(count, +(count, 1)))),
           print(total))
    "#;

    let (result, printed) = printed_by(program);
    assert_eq!(result, Ok(Value::from(55)));
    assert_eq!(printed, vec!["55"]);
}

#[test]
fn sums_one_to_ten_with_set() {
    let program = "
        do(define(total, 0),
           define(count, 1),
           while(<(count, 11),
                 do(set(total, +(total, count)),
                    set(count, +(count, 1)))),
           total)
    ";
    assert_eq!(run_program(program), Ok(Value::from(55)));
}

#[test]
fn user_function() {
    let program = "
        do(define(plusOne, fun(a, +(a, 1))),
           print(plusOne(10)))
    ";
    let (result, printed) = printed_by(program);
    assert_eq!(result, Ok(Value::from(11)));
    assert_eq!(printed, vec!["11"]);
}

#[test]
fn recursive_pow() {
    let program = "
        do(define(pow, fun(base, exp,
             if(==(exp, 0),
                1,
                *(base, pow(base, -(exp, 1)))))),
           print(pow(2, 10)))
    ";
    let (result, printed) = printed_by(program);
    assert_eq!(result, Ok(Value::from(1024)));
    assert_eq!(printed, vec!["1024"]);
}

#[test]
fn array_sum() {
    let program = "
        do(define(sum, fun(arr,
             do(define(i, 0),
                define(total, 0),
                while(<(i, length(arr)),
                      do(define(total, +(total, element(arr, i))),
                         define(i, +(i, 1)))),
                total))),
           print(sum(array(1, 2, 3))))
    ";
    let (result, printed) = printed_by(program);
    assert_eq!(result, Ok(Value::from(6)));
    assert_eq!(printed, vec!["6"]);
}

#[test]
fn closures_capture_their_scope() {
    let program = "
        do(define(f, fun(a, fun(b, +(a, b)))),
           print(f(4)(5)))
    ";
    let (result, printed) = printed_by(program);
    assert_eq!(result, Ok(Value::from(9)));
    assert_eq!(printed, vec!["9"]);
}

#[test]
fn counters_keep_independent_state() {
    let program = "
        do(define(counter, fun(
             do(define(n, 0),
                fun(set(n, +(n, 1)))))),
           define(a, counter()),
           define(b, counter()),
           a(), a(), b(),
           array(a(), b()))
    ";
    assert_eq!(run_program(program), Ok(Value::from([3, 2])));
}

#[test]
fn set_rebinds_and_define_shadows() {
    let with_set = "
        do(define(x, 4),
           define(setx, fun(val, set(x, val))),
           setx(50),
           print(x))
    ";
    let (result, printed) = printed_by(with_set);
    assert_eq!(result, Ok(Value::from(50)));
    assert_eq!(printed, vec!["50"]);

    let with_define = "
        do(define(x, 4),
           define(setx, fun(val, define(x, val))),
           setx(50),
           print(x))
    ";
    let (result, printed) = printed_by(with_define);
    assert_eq!(result, Ok(Value::from(4)));
    assert_eq!(printed, vec!["4"]);
}

#[test]
fn conditional_output() {
    let program = r#"
        do(define(x, 10),
           if(>(x, 5),
              print("large"),
              print("small")))
    "#;
    let (result, printed) = printed_by(program);
    assert_eq!(result, Ok(Value::from("large")));
    assert_eq!(printed, vec!["large"]);
}

#[test]
fn print_returns_its_argument() {
    let (result, printed) = printed_by("+(print(1), print(2))");
    assert_eq!(result, Ok(Value::from(3)));
    assert_eq!(printed, vec!["1", "2"]);
}

#[test]
fn runs_do_not_share_definitions() {
    let global = create_global_env_with_output(|_| {});
    assert_eq!(run("define(x, 1)", &global), Ok(Value::from(1)));
    assert_eq!(
        run("x", &global),
        Err(Error::UndefinedBinding("x".to_owned()))
    );
}

#[test]
fn host_bindings_are_visible() {
    fn square(n: f64) -> f64 {
        n * n
    }

    let global = create_global_env();
    global.register_builtin_operation::<_, (f64,)>("square", square);
    global.define("limit", Value::from(3));

    assert_eq!(run("square(limit)", &global), Ok(Value::from(9)));
    assert!(matches!(
        run("square(\"x\")", &global),
        Err(Error::TypeError(_))
    ));
}

#[test]
fn errors_surface_at_evaluation_time() {
    assert!(matches!(run_program("1(2)"), Err(Error::NotCallable(_))));
    assert!(matches!(
        run_program("fun(a, a)(1, 2)"),
        Err(Error::WrongArity {
            expected: 1,
            got: 2
        })
    ));
    assert_eq!(
        run_program("set(quux, true)"),
        Err(Error::UndefinedBinding("quux".to_owned()))
    );
    assert!(matches!(run_program("define(1, 2)"), Err(Error::Syntax(_))));
    assert!(matches!(run_program("fun(1, 2)"), Err(Error::Syntax(_))));
    // Errors abort the program; later expressions never run
    let (result, printed) = printed_by("do(print(1), undefined, print(2))");
    assert!(matches!(result, Err(Error::UndefinedBinding(_))));
    assert_eq!(printed, vec!["1"]);
}
