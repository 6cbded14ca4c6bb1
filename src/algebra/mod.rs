//! Relational-algebra operators over open relations.

mod operators;
