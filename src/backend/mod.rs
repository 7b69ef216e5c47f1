//! The backend turns the analyzed entry function into JavaScript. Captured
//! variables are boxed, literals become runtime-library calls, `print` becomes
//! either a library call or an inline host probe, and everything is assembled
//! into one nullary `function() { ... }` unit.

pub mod assemble;
pub mod closure;
pub mod js;
pub mod literal;
pub mod lowering;
pub mod print;
pub mod runtime;
