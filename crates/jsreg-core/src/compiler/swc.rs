//! SWC compiler backend implementation.
//!
//! ## Feature Flags
//!
//! - `swc`: Enable the full SWC pipeline (parse, minify, downlevel codegen)
//!
//! Without the `swc` feature, a passthrough implementation is used that
//! returns the source unchanged. It exists so the rest of the crate can be
//! built and tested without compiling SWC.

#![allow(clippy::needless_raw_string_hashes)]

use super::{CompilerBackend, CompilerError, TranspileOutput, TranspileSpec};

#[cfg(feature = "swc")]
use super::EsTarget;

/// SWC-based compiler backend.
///
/// `SwcBackend` is `Send + Sync`; each call to `transpile` builds its own
/// source map and globals, so calls never share state.
#[derive(Debug, Clone, Default)]
pub struct SwcBackend {
    _private: (),
}

impl SwcBackend {
    /// Create a new SWC backend with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl CompilerBackend for SwcBackend {
    fn name(&self) -> &'static str {
        "swc"
    }

    fn transpile(
        &self,
        spec: &TranspileSpec,
        source: &str,
    ) -> Result<TranspileOutput, CompilerError> {
        if source.trim().is_empty() {
            return Ok(TranspileOutput::new(""));
        }

        #[cfg(not(feature = "swc"))]
        {
            let _ = spec;
            Ok(TranspileOutput::new(source))
        }

        #[cfg(feature = "swc")]
        {
            compile_with_swc(spec, source)
        }
    }
}

#[cfg(feature = "swc")]
fn es_version(target: EsTarget) -> swc_ecma_ast::EsVersion {
    use swc_ecma_ast::EsVersion;

    match target {
        EsTarget::ES2015 => EsVersion::Es2015,
        EsTarget::ES2016 => EsVersion::Es2016,
        EsTarget::ES2017 => EsVersion::Es2017,
        EsTarget::ES2018 => EsVersion::Es2018,
        EsTarget::ES2019 => EsVersion::Es2019,
        EsTarget::ES2020 => EsVersion::Es2020,
        EsTarget::ES2021 => EsVersion::Es2021,
        // swc's newest named level
        EsTarget::ES2022 | EsTarget::ES2023 | EsTarget::ES2024 => EsVersion::Es2022,
        EsTarget::ESNext => EsVersion::EsNext,
    }
}

/// Parse, downlevel and optimize, emit.
#[cfg(feature = "swc")]
fn compile_with_swc(spec: &TranspileSpec, source: &str) -> Result<TranspileOutput, CompilerError> {
    use swc_common::{sync::Lrc, Globals, SourceMap, GLOBALS};
    use swc_ecma_transforms_base::helpers::{Helpers, HELPERS};

    let cm: Lrc<SourceMap> = Lrc::default();
    let module = pipeline::parse(&cm, &spec.filename, source)?;
    // Helpers are inlined into the module; the output must not import a runtime.
    let program = GLOBALS.set(&Globals::default(), || {
        HELPERS.set(&Helpers::new(false), || pipeline::optimize(&cm, module, spec))
    });
    pipeline::emit(&cm, &program, spec).map(TranspileOutput::new)
}

#[cfg(feature = "swc")]
mod pipeline {
    use super::{es_version, CompilerError, EsTarget, TranspileSpec};
    use swc_common::{comments::SingleThreadedComments, errors::Handler, sync::Lrc, FileName, Mark, SourceMap};
    use swc_ecma_ast::{EsVersion, Module, Program};
    use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
    use swc_ecma_minifier::option::{CompressOptions, ExtraOptions, MangleOptions, MinifyOptions};
    use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax};
    use swc_ecma_transforms_base::{fixer::fixer, helpers::inject_helpers, hygiene::hygiene, resolver};
    use swc_ecma_transforms_compat as compat;
    use swc_ecma_visit::FoldWith;

    /// Parse as an ES module at the newest syntax level; the target only
    /// constrains output.
    pub(super) fn parse(cm: &Lrc<SourceMap>, filename: &str, source: &str) -> Result<Module, CompilerError> {
        let fm = cm.new_source_file(
            Lrc::new(FileName::Custom(filename.to_string())),
            source.to_string(),
        );
        let comments = SingleThreadedComments::default();
        let lexer = Lexer::new(
            Syntax::Es(EsSyntax::default()),
            EsVersion::EsNext,
            StringInput::from(&*fm),
            Some(&comments),
        );
        let mut parser = Parser::new_from(lexer);

        let module = parser.parse_module().map_err(|e| {
            let handler = Handler::with_emitter_writer(Box::new(std::io::sink()), Some(cm.clone()));
            let kind = format!("{:?}", e.kind());
            e.into_diagnostic(&handler).emit();
            CompilerError::parse_error(format!("{filename}: {kind}"))
        })?;

        let recovered: Vec<String> = parser
            .take_errors()
            .into_iter()
            .map(|e| format!("{:?}", e.kind()))
            .collect();
        if recovered.is_empty() {
            Ok(module)
        } else {
            Err(CompilerError::parse_error(format!("{filename}: {}", recovered.join(", "))))
        }
    }

    /// Lower syntax newer than `target`, newest year first, then inline the
    /// helpers those passes asked for. `es2015` is the floor of the target
    /// table, so the es2015 pass itself never runs.
    /// Must run inside `GLOBALS.set` and `HELPERS.set`.
    pub(super) fn downlevel(program: Program, target: EsTarget, unresolved_mark: Mark) -> Program {
        let Some(year) = target.year() else {
            return program;
        };
        let no_comments = None::<SingleThreadedComments>;
        let mut program = program;

        if year < 2022 {
            program = program.fold_with(&mut compat::es2022(
                no_comments.clone(),
                compat::es2022::Config::default(),
                unresolved_mark,
            ));
        }
        if year < 2021 {
            program = program.fold_with(&mut compat::es2021());
        }
        if year < 2020 {
            program = program.fold_with(&mut compat::es2020(compat::es2020::Config::default(), unresolved_mark));
        }
        if year < 2019 {
            program = program.fold_with(&mut compat::es2019());
        }
        if year < 2018 {
            program = program.fold_with(&mut compat::es2018(compat::es2018::Config::default()));
        }
        if year < 2017 {
            program = program.fold_with(&mut compat::es2017(
                compat::es2017::Config::default(),
                no_comments,
                unresolved_mark,
            ));
        }
        if year < 2016 {
            program = program.fold_with(&mut compat::es2016());
        }

        program.fold_with(&mut inject_helpers(unresolved_mark))
    }

    /// Resolve scopes, downlevel, minify when asked, then restore hygiene
    /// and parens. Must run inside `GLOBALS.set` and `HELPERS.set`.
    pub(super) fn optimize(cm: &Lrc<SourceMap>, module: Module, spec: &TranspileSpec) -> Program {
        let unresolved_mark = Mark::new();
        let top_level_mark = Mark::new();
        let program =
            Program::Module(module).fold_with(&mut resolver(unresolved_mark, top_level_mark, false));
        let mut program = downlevel(program, spec.target, unresolved_mark);

        if spec.minify {
            let keep = spec.keep_names;
            let options = MinifyOptions {
                compress: Some(CompressOptions {
                    ecma: es_version(spec.target),
                    module: true,
                    keep_fnames: keep,
                    keep_classnames: keep,
                    ..Default::default()
                }),
                mangle: Some(MangleOptions {
                    keep_fn_names: keep,
                    keep_class_names: keep,
                    top_level: None,
                    ..Default::default()
                }),
                ..Default::default()
            };
            let extra = ExtraOptions {
                unresolved_mark,
                top_level_mark,
                mangle_name_cache: None,
            };
            program = swc_ecma_minifier::optimize(program, cm.clone(), None, None, &options, &extra);
        }

        program.fold_with(&mut hygiene()).fold_with(&mut fixer(None))
    }

    pub(super) fn emit(cm: &Lrc<SourceMap>, program: &Program, spec: &TranspileSpec) -> Result<String, CompilerError> {
        let mut buf = Vec::new();
        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default()
                .with_minify(spec.minify)
                .with_target(es_version(spec.target)),
            cm: cm.clone(),
            comments: None,
            wr: JsWriter::new(cm.clone(), "\n", &mut buf, None),
        };
        emitter
            .emit_program(program)
            .map_err(|e| CompilerError::transform_error(format!("codegen: {e}")))?;
        drop(emitter);

        String::from_utf8(buf).map_err(|e| CompilerError::transform_error(format!("codegen produced invalid UTF-8: {e}")))
    }
}
