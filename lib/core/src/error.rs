//! Error handling foundation for gatekeeper.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own error enums in its own error module and
//! reports them as `Report<E>`, so every layer keeps its own context.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
