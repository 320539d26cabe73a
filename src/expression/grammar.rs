use pest_derive::Parser;

/// Pest parser for a single pipeline token.
#[derive(Parser)]
#[grammar = "expression/grammar.pest"]
pub struct TokenParser;
