pub mod ast;
pub mod evaluator;
pub mod parser;
pub mod tokenizer;
