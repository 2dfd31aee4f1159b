mod common;

use c_extension_swc_plugin::{process, BuildContext, Error, FileContext, MacroKind};
use common::{app_js, Output, Value};
use regex::Regex;

fn run(src: &str) -> (String, Output) {
    let js = process(src, &app_js(), &BuildContext::default()).unwrap();
    let out = Output::parse(&js);
    (js, out)
}

#[test]
fn non_script_units_are_untouched() {
    let src = "__C_EXTENSION('__LINE__')\n  not even javascript {";
    for (id, path) in [("/a.css", "/p/a.css"), ("/a.html", "/p/a.html"), ("/README", "/p/README")] {
        let file = FileContext::new(id, path);
        for build in [BuildContext::default(), BuildContext::optimized()] {
            assert_eq!(process(src, &file, &build).unwrap(), src);
        }
    }
}

#[test]
fn line_is_the_call_site_line() {
    let (js, out) = run("var a = __C_EXTENSION('__LINE__');\n\n\nvar b = [\n  __C_EXTENSION('__LINE__')\n][0];\nvar c = __C_EXTENSION('__LINE__');");
    assert_eq!(out.value("a"), Value::Num(1.0));
    assert_eq!(out.value("c"), Value::Num(7.0));
    assert!(!js.contains("__C_EXTENSION"), "{js}");
}

#[test]
fn file_is_the_logical_id() {
    let (_, out) = run("var f = __C_EXTENSION('__FILE__');");
    assert_eq!(out.value("f"), Value::Str("/src/app.js".into()));
}

#[test]
fn time_and_date_formats() {
    let (_, out) = run("var t = __C_EXTENSION('__TIME__');\nvar d = __C_EXTENSION(\"__DATE__\");");
    let time = Regex::new(r"^\d{2}:\d{2}:\d{2}$").unwrap();
    let date = Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").unwrap();
    assert!(time.is_match(out.value("t").str()));
    assert!(date.is_match(out.value("d").str()));
}

#[test]
fn debug_block_runs_in_place() {
    let src = "var before = 1;\n\
               __C_EXTENSION('__DEBUG__', function () {\n  debugHook(state);\n});\n\
               var after = 2;";
    let js = process(src, &app_js(), &BuildContext::default()).unwrap();
    let out = Output::parse(&js);

    assert_eq!(out.immediate_calls(), 1);
    assert_eq!(js.matches("debugHook(").count(), 1);
    let hook = js.find("debugHook(").unwrap();
    assert!(js.find("before").unwrap() < hook && hook < js.find("after").unwrap());
}

#[test]
fn debug_block_vanishes_when_optimized() {
    let src = "var x = 1;\n__C_EXTENSION('__DEBUG__', function () { debugHook(); });\nvar y = __C_EXTENSION('__DEBUG__', () => debugHook());";
    let js = process(src, &app_js(), &BuildContext::optimized()).unwrap();
    assert!(!js.contains("debugHook"), "{js}");
    assert!(!js.contains("__DEBUG__"), "{js}");
    assert_eq!(Output::parse(&js).immediate_calls(), 0);
}

#[test]
fn unknown_kinds_are_left_alone() {
    let js = process(
        "var a = __C_EXTENSION('__SOMETHING_ELSE__', 1);\nvar b = __C_EXTENSION(42);",
        &app_js(),
        &BuildContext::default(),
    )
    .unwrap();
    assert!(js.contains("__SOMETHING_ELSE__"), "{js}");
    assert_eq!(js.matches("__C_EXTENSION(").count(), 2, "{js}");
    assert!(js.contains("__C_EXTENSION(42)"), "{js}");
}

#[test]
fn invalid_arguments_are_fatal() {
    let cases = [
        ("__C_EXTENSION('__DEBUG__', notAFunction);", MacroKind::Debug),
        ("__C_EXTENSION('__LINE__', 1);", MacroKind::Line),
        ("\n\n__C_EXTENSION('__INLINE__');", MacroKind::Inline),
        ("__C_EXTENSION('__INLINE__', path);", MacroKind::Inline),
        ("function f() { __C_EXTENSION('__METHOD__', f); }", MacroKind::Method),
    ];
    for (src, kind) in cases {
        match process(src, &app_js(), &BuildContext::default()) {
            Err(Error::Validation { file, source, .. }) => {
                assert_eq!(file, "/src/app.js");
                assert_eq!(source.kind, kind);
            }
            other => panic!("{src}: expected a validation error, got {other:?}"),
        }
    }

    let err = process("\n\n__C_EXTENSION('__INLINE__');", &app_js(), &BuildContext::default())
        .unwrap_err();
    assert_eq!(err.line(), Some(3));
    assert!(err.to_string().contains("__INLINE__"));
}

#[test]
fn second_run_is_a_no_op() {
    let src = "var l = __C_EXTENSION('__LINE__');\n\
               var f = __C_EXTENSION('__FILE__');\n\
               function named() { return __C_EXTENSION('__METHOD__'); }\n\
               __C_EXTENSION('__DEBUG__', function () { check(); });";
    let build = BuildContext::default();
    let once = process(src, &app_js(), &build).unwrap();
    let twice = process(&once, &app_js(), &build).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn macros_in_nested_positions() {
    let (js, out) = run(
        "var o = { line: __C_EXTENSION('__LINE__'), file: [__C_EXTENSION('__FILE__')] };\n\
         var s = cond ? __C_EXTENSION('__FILE__') : null;",
    );
    assert_eq!(out.value("o"), Value::Other);
    assert!(!js.contains("__C_EXTENSION"), "{js}");
    assert_eq!(js.matches("\"/src/app.js\"").count(), 2, "{js}");
}
