use swc_core::{
    common::{sync::Lrc, FileName, SourceFile, SourceMap, SourceMapper, Spanned},
    ecma::{
        ast::Program,
        codegen::{text_writer::JsWriter, Config as CodegenConfig, Emitter},
        parser::{EsSyntax, Parser, StringInput, Syntax},
    },
};
use tracing::{debug, error};

use crate::{
    config::{BuildContext, FileContext, SourceKind},
    error::{Error, Result},
    expand::MacroExpander,
    resolve::{self, unique_id},
    walker::walk,
};

/// What one expansion pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionReport {
    /// Sites rewritten during the walk.
    pub expanded: usize,
    /// `__METHOD__` sites named by the resolver afterwards.
    pub resolved: usize,
}

// -----------------------------------------------------------------------------
// Entry points
// -----------------------------------------------------------------------------

/// Expand every macro site in `content`.
///
/// Units that are not scripts are returned unchanged. On error nothing is
/// generated; the caller decides whether to fail the build or fall back.
pub fn process(content: &str, file: &FileContext, build: &BuildContext) -> Result<String> {
    if file.kind() != SourceKind::Script {
        return Ok(content.to_owned());
    }
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(FileName::Custom(file.id.clone()).into(), content.to_owned());
    let mut program = parse(&cm, &fm, &file.id)?;
    let report = expand_program(&mut program, &*cm, file, build)?;
    debug!(
        file = %file.id,
        expanded = report.expanded,
        resolved = report.resolved,
        "expanded macros"
    );
    generate(&cm, &program, &file.id, false)
}

/// Like [`process`], but logs failures and hands back the input untouched.
pub fn process_or_original(content: &str, file: &FileContext, build: &BuildContext) -> String {
    match process(content, file, build) {
        Ok(out) => out,
        Err(err) => {
            error!("{}", err);
            content.to_owned()
        }
    }
}

/// Run the walk and the deferred `__METHOD__` pass over an already parsed
/// program. `source_map` must be the one `program` was parsed with; it maps
/// spans to line numbers.
///
/// On error the program may be partially rewritten and should be discarded.
pub fn expand_program(
    program: &mut Program,
    source_map: &dyn SourceMapper,
    file: &FileContext,
    build: &BuildContext,
) -> Result<ExpansionReport> {
    let mut deferred = Vec::new();
    let mut expander = MacroExpander::new(file, build, source_map, &mut deferred);
    let ancestry = walk(program, &mut expander)?;
    let expanded = expander.expanded();

    let resolved = resolve::resolve(&deferred, &ancestry, unique_id);
    let resolved = resolve::apply(program, &resolved, &build.macro_name);
    Ok(ExpansionReport { expanded, resolved })
}

// -----------------------------------------------------------------------------
// Parser / generator boundary
// -----------------------------------------------------------------------------

pub(crate) fn parse(cm: &SourceMap, fm: &SourceFile, file: &str) -> Result<Program> {
    let mut parser = Parser::new(Syntax::Es(EsSyntax::default()), StringInput::from(fm), None);
    let parsed = parser.parse_program();
    let err = match (parsed, parser.take_errors().into_iter().next()) {
        (Ok(program), None) => return Ok(program),
        (Err(err), _) | (Ok(_), Some(err)) => err,
    };
    Err(Error::Parse {
        file: file.to_string(),
        line: cm.lookup_char_pos(err.span().lo).line,
        message: err.kind().msg().to_string(),
    })
}

pub(crate) fn generate(
    cm: &Lrc<SourceMap>,
    program: &Program,
    file: &str,
    minify: bool,
) -> Result<String> {
    let codegen_err = |source| Error::Codegen {
        file: file.to_string(),
        source,
    };
    let mut buf = Vec::new();
    {
        let mut emitter = Emitter {
            cfg: CodegenConfig::default().with_minify(minify),
            cm: cm.clone(),
            comments: None,
            wr: JsWriter::new(cm.clone(), "\n", &mut buf, None),
        };
        emitter.emit_program(program).map_err(codegen_err)?;
    }
    String::from_utf8(buf)
        .map_err(|e| codegen_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Reprint a script without insignificant whitespace. Used for `<script>`
/// bodies inside inlined HTML.
pub(crate) fn compact_script(source: &str) -> Result<String> {
    const NAME: &str = "<inline script>";
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(FileName::Custom(NAME.into()).into(), source.to_owned());
    let program = parse(&cm, &fm, NAME)?;
    generate(&cm, &program, NAME, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn js_file() -> FileContext {
        FileContext::new("/src/app.js", "/work/src/app.js")
    }

    #[test]
    fn non_scripts_pass_through() {
        let file = FileContext::new("/style/a.css", "/work/style/a.css");
        let content = "a { color: red } __C_EXTENSION('__LINE__')";
        let out = process(content, &file, &BuildContext::default()).unwrap();
        assert_eq!(out, content);
    }

    #[test]
    fn parse_errors_carry_the_line() {
        let err = process("var a = 1;\nvar = ;", &js_file(), &BuildContext::default()).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }), "{err}");
    }

    #[test]
    fn failures_fall_back_to_the_input() {
        let content = "__C_EXTENSION('__LINE__', 1);";
        let out = process_or_original(content, &js_file(), &BuildContext::default());
        assert_eq!(out, content);
    }

    #[test]
    fn reports_counts() {
        let cm: Lrc<SourceMap> = Default::default();
        let fm = cm.new_source_file(
            FileName::Custom("t.js".into()).into(),
            "function f() { return [__C_EXTENSION('__LINE__'), __C_EXTENSION('__METHOD__')]; }"
                .to_owned(),
        );
        let mut program = parse(&cm, &fm, "t.js").unwrap();
        let report =
            expand_program(&mut program, &*cm, &js_file(), &BuildContext::default()).unwrap();
        assert_eq!(
            report,
            ExpansionReport {
                expanded: 1,
                resolved: 1
            }
        );
    }

    #[test]
    fn compacts_scripts() {
        let out = compact_script("var  a = 1;\n\nfunction  f ( x ) {\n  return x ;\n}\n").unwrap();
        assert!(!out.contains("  "));
        assert!(out.contains("function f(x){return x"));
    }

    #[test]
    fn custom_macro_name() {
        let build = BuildContext {
            macro_name: "__PP".into(),
            ..BuildContext::default()
        };
        let out = process("var f = __PP('__FILE__');", &js_file(), &build).unwrap();
        assert!(out.contains("\"/src/app.js\""), "{out}");
    }
}
