// Domain layer - Core trim types, invariants and errors

pub mod errors;
pub mod model;
pub mod rules;
