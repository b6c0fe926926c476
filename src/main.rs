use std::io::Write;

use clap::{Args, Parser, Subcommand};
use monkey::{
    evaluator::{Evaluator, Value},
    tokenizer::{TokenType, Tokenizer},
};

#[derive(Debug, Parser)]
#[command(version, about = "Tokenizer and tree-walking evaluator for the Monkey language")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Repl)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate one line at a time from stdin
    Repl,
    /// Evaluate a source file
    Run(RunArgs),
    /// Print the token stream of a source file
    Tokens(TokensArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    file: String,
    /// Report nesting deeper than this as an error instead of recursing
    #[arg(long)]
    max_depth: Option<usize>,
}

#[derive(Debug, Args)]
struct TokensArgs {
    file: String,
}

#[derive(Debug, thiserror::Error)]
enum InterpretError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] monkey::parser::ParseErrors),
    #[error("{0}")]
    Evaluation(Value),
}

fn main() {
    let args = Cli::parse();

    let result = match args.command() {
        Command::Repl => repl_command(),
        Command::Run(args) => run_command(args),
        Command::Tokens(args) => tokens_command(args),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn repl_command() -> Result<(), InterpretError> {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "anonymous".to_string());

    print!("{}", banner(&user));
    println!("EOF to exit. (Ctrl+D on *nix, Ctrl+Z on Windows)");

    let mut evaluator = Evaluator::default();
    let mut input = String::new();

    loop {
        print!(">> ");
        std::io::stdout().flush()?;

        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        match monkey::parser::parse(&input) {
            Ok(program) => println!("{}", evaluator.evaluate(&program)),
            Err(e) => print!("{}", e),
        }

        input.clear()
    }

    Ok(())
}

fn banner(user: &str) -> String {
    let mut builtins = monkey::evaluator::builtins::names().collect::<Vec<_>>();
    builtins.sort_unstable();

    format!(
        "Monkey {} ~ {}\nBuiltins: {}\n",
        env!("CARGO_PKG_VERSION"),
        user,
        builtins.join(", ")
    )
}

fn run_command(args: &RunArgs) -> Result<(), InterpretError> {
    let source = std::fs::read_to_string(&args.file)?;
    let program = monkey::parser::parse(&source)?;

    let mut evaluator = Evaluator::default();
    if let Some(max_depth) = args.max_depth {
        evaluator = evaluator.with_max_depth(max_depth);
    }

    let value = evaluator.evaluate(&program);
    if value.is_error() {
        return Err(InterpretError::Evaluation(value));
    }

    Ok(())
}

fn tokens_command(args: &TokensArgs) -> Result<(), InterpretError> {
    let source = std::fs::read_to_string(&args.file)?;
    let mut tokenizer = Tokenizer::new(&source);
    let mut line = None;
    loop {
        let token = tokenizer.next_token();
        if line != Some(token.line) {
            print!("{:4} ", token.line + 1);
            line = Some(token.line);
        } else {
            print!("   | ");
        }

        println!(
            "{:<12} {:>3} {}",
            format!("{:?}", token.token_type),
            token.column,
            token.literal
        );

        if token.token_type == TokenType::Eof {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_banner() {
        assert_eq!(
            banner("ada"),
            format!(
                "Monkey {} ~ ada\nBuiltins: len, print\n",
                env!("CARGO_PKG_VERSION")
            )
        );
    }
}
