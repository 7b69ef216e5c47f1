//! Analyses over the parsed entry function: capture classification, static
//! type hints and symbolic evaluation. Nothing here produces target code.

pub mod capture;
pub mod eval;
pub mod ty;
