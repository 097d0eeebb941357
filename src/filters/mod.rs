//! Rule families and the parsing shared between them.

pub mod css;
pub mod pattern;
pub mod rule;
pub mod script;
pub mod url;
