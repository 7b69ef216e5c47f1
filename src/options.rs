use crate::backend::runtime::RuntimeLibrary;

/// Knobs for one compilation. The defaults reproduce the reference output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    pub runtime: RuntimeLibrary,
    /// Fold scalar literals and constant locals into interpolated text
    pub fold_constants: bool,
    /// Allow the inline print probe for programs that reduce to one print
    pub inline_print_probe: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            runtime: RuntimeLibrary::default(),
            fold_constants: true,
            inline_print_probe: true,
        }
    }
}
