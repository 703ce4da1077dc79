//! Back end of the compiler: constant folding over the AST, type checking
//! with implicit integer-to-real promotion, and expansion of the front
//! end's quad list into 64-bit assembly text.
//!
//! The passes run strictly in that order for every block; each one
//! finishes before the next starts.

pub mod codegen;
pub mod optimize;
pub mod semantics;

pub use codegen::Generator;
pub use optimize::optimize;
pub use semantics::{check, DiagKind, Diagnostic, Diagnostics};

/// Backend toggles threaded into the passes by the driver.
#[derive(Debug, Default, Copy, Clone)]
pub struct Options {
    /// Precede every prologue, epilogue and quad with a `# ...` comment
    /// line in the assembly output.
    pub trace: bool,
}
