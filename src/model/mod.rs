/// Typed documents stored in the state tree.
pub mod entities;
/// Question bank types and answer matching.
pub mod question;
