use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use loxide::ast_printer::AstPrinter;
use loxide::interpreter::Interpreter;
use loxide::parser::Parser;
use loxide::resolver::Resolver;
use loxide::scanner::Scanner;
use loxide::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tokenizes a file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs a file as a Lox program
    Run { filename: PathBuf },
}

fn read_file(filename: &PathBuf) -> Result<Vec<u8>> {
    let buf = std::fs::read(filename).context(format!("Failed to read file {:?}", filename))?;

    info!("read {} bytes from {:?}", buf.len(), filename);

    Ok(buf)
}

/// Route log records to `app.log`: stripped module path, source line, and
/// a wall-clock timestamp per record.
fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("loxide::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));

            writeln!(
                buf,
                "{} [{}:{}] - {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // override with RUST_LOG
        .init();

    info!("logger initialized, writing to app.log");

    Ok(())
}

/// Scan the whole buffer up front, reporting every lexing error. Returns
/// the tokens plus whether any error was seen.
fn scan_all(src: &[u8]) -> (Vec<Token<'_>>, bool) {
    let mut tokens = Vec::new();
    let mut had_error = false;

    for result in Scanner::new(src) {
        match result {
            Ok(token) => tokens.push(token),

            Err(e) => {
                had_error = true;
                eprintln!("{}", e);
            }
        }
    }

    (tokens, had_error)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        // A disabled logger still satisfies the `log` facade.
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("cli arguments: {:?}", args);

    match args.command {
        Command::Tokenize { filename } => {
            let buf = read_file(&filename)?;
            let (tokens, had_error) = scan_all(&buf);

            for token in &tokens {
                println!("{}", token);
            }

            if had_error {
                std::process::exit(65);
            }
        }

        Command::Parse { filename } => {
            let buf = read_file(&filename)?;
            let (tokens, had_error) = scan_all(&buf);

            if had_error {
                std::process::exit(65);
            }

            let mut parser = Parser::new(&tokens);

            match parser.parse_expression() {
                Ok(expr) => {
                    debug!("parsed expression: {:?}", expr);

                    println!("{}", AstPrinter::print(&expr));
                }

                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(e.exit_code());
                }
            }
        }

        Command::Evaluate { filename } => {
            let buf = read_file(&filename)?;
            let (tokens, had_error) = scan_all(&buf);

            if had_error {
                std::process::exit(65);
            }

            let mut parser = Parser::new(&tokens);

            let expr = match parser.parse_expression() {
                Ok(expr) => expr,

                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(e.exit_code());
                }
            };

            let mut interpreter = Interpreter::new();

            match interpreter.evaluate(&expr) {
                Ok(value) => println!("{}", value),

                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(e.exit_code());
                }
            }
        }

        Command::Run { filename } => {
            let buf = read_file(&filename)?;
            let (tokens, had_error) = scan_all(&buf);

            if had_error {
                std::process::exit(65);
            }

            let mut parser = Parser::new(&tokens);

            let statements = match parser.parse() {
                Ok(statements) => statements,

                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(e.exit_code());
                }
            };

            info!("parsed {} statements", statements.len());

            let mut interpreter = Interpreter::new();

            if let Err(e) = Resolver::new(&mut interpreter).resolve(&statements) {
                eprintln!("{}", e);
                std::process::exit(e.exit_code());
            }

            if let Err(e) = interpreter.interpret(&statements) {
                eprintln!("{}", e);
                std::process::exit(e.exit_code());
            }
        }
    }

    Ok(())
}
