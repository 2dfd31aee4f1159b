//! Compile-time pseudo-intrinsics for JavaScript.
//!
//! Calls of the reserved function `__C_EXTENSION` are rewritten before code
//! generation:
//!
//! ```js
//! var line = __C_EXTENSION("__LINE__");          // 1
//! var file = __C_EXTENSION("__FILE__");          // "/src/app.js"
//! var built = __C_EXTENSION("__DATE__");         // "2024-03-07"
//! __C_EXTENSION("__DEBUG__", function () {       // dropped when optimizing
//!     console.log("state", state);
//! });
//! var tpl = __C_EXTENSION("__INLINE__", "/tpl/list.html", "html");
//! function render() {
//!     log(__C_EXTENSION("__METHOD__"));          // "render"
//! }
//! ```
//!
//! [`process`] runs the whole pipeline on source text; [`expand_program`]
//! works on a tree the host already parsed.

pub mod config;
pub mod driver;
pub mod error;
pub mod expand;
pub mod macros;
pub mod minify;
pub mod resolve;
pub mod walker;

pub use config::{BuildContext, FileContext, SourceKind, DEFAULT_MACRO_NAME};
pub use driver::{expand_program, process, process_or_original, ExpansionReport};
pub use error::{Error, Result};
pub use macros::MacroKind;

// -----------------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------------

#[cfg(feature = "plugin")]
mod plugin {
    use std::path::Path;

    use swc_core::{
        ecma::ast::Program,
        plugin::{
            metadata::TransformPluginMetadataContextKind, plugin_transform,
            proxies::TransformPluginProgramMetadata,
        },
    };
    use tracing::error;

    use crate::{expand_program, BuildContext, FileContext, SourceKind};

    fn file_context(metadata: &TransformPluginProgramMetadata) -> Option<FileContext> {
        let filename = metadata.get_context(&TransformPluginMetadataContextKind::Filename)?;
        let cwd = metadata.get_context(&TransformPluginMetadataContextKind::Cwd);

        let realpath = match &cwd {
            Some(cwd) if Path::new(&filename).is_relative() => Path::new(cwd).join(&filename),
            _ => Path::new(&filename).to_path_buf(),
        };
        let id = cwd
            .as_deref()
            .and_then(|cwd| realpath.strip_prefix(cwd).ok())
            .map(|rel| format!("/{}", rel.to_string_lossy().replace('\\', "/")))
            .unwrap_or_else(|| filename.replace('\\', "/"));
        Some(FileContext::new(id, realpath))
    }

    #[plugin_transform]
    pub fn process_transform(
        mut program: Program,
        metadata: TransformPluginProgramMetadata,
    ) -> Program {
        let build = match metadata.get_transform_plugin_config() {
            Some(json) => match BuildContext::from_json(&json) {
                Ok(build) => build,
                Err(err) => {
                    error!("{}", err);
                    return program;
                }
            },
            None => BuildContext::default(),
        };
        let Some(file) = file_context(&metadata) else {
            return program;
        };
        if file.kind() != SourceKind::Script {
            return program;
        }

        let original = program.clone();
        match expand_program(&mut program, &metadata.source_map, &file, &build) {
            Ok(_) => program,
            Err(err) => {
                error!("{}", err);
                original
            }
        }
    }
}
