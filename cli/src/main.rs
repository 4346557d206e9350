mod simulate;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use engine::{EngineConfig, Renderer};
use talamo::Lesson;
use talamo::block::display::to_markup;
use talamo::parser::ParseError;

const SUBCOMMANDS: &[&str] = &["check", "dump", "render", "simulate", "test", "help"];

#[derive(Parser)]
#[command(name = "talamo", version, about = "Extended Markdown lesson tools")]
struct Cli {
    /// Disable colored diagnostic output
    #[arg(long, global = true)]
    no_color: bool,

    /// Raise log verbosity (-v warn, -vv debug, -vvv trace). RUST_LOG wins when set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Engine settings (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a lesson and report diagnostics
    Check(FileArgs),

    /// Print the parsed node sequence
    Dump(DumpArgs),

    /// Render a lesson to static HTML on stdout
    Render(FileArgs),

    /// Play one decision on a trading simulator
    Simulate(SimulateArgs),

    /// Run .test.md lesson tests
    Test(TestArgs),
}

#[derive(clap::Args)]
struct FileArgs {
    /// Lesson source file
    file: String,
}

#[derive(clap::Args)]
struct DumpArgs {
    /// Lesson source file
    file: String,

    /// Print the re-serialized markup instead of the node tree
    #[arg(long)]
    markup: bool,
}

#[derive(clap::Args)]
struct SimulateArgs {
    /// Lesson source file
    file: String,

    /// Which trading simulator to play, counting from 1
    #[arg(short, long, default_value_t = 1)]
    block: usize,

    /// Action to take (buy, sell, skip, market_buy, ...)
    #[arg(short, long)]
    action: String,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.md file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // `talamo lesson.md` is shorthand for `talamo check lesson.md`.
    let mut args: Vec<String> = std::env::args().collect();
    inject_default_command(&mut args);

    let cli = Cli::parse_from(&args);
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(error) => {
            eprintln!("error: {:#}", error);
            process::exit(1);
        }
    }
}

fn inject_default_command(args: &mut Vec<String>) {
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--config" {
            i += 2;
            continue;
        }
        if arg.starts_with('-') {
            i += 1;
            continue;
        }
        if !SUBCOMMANDS.contains(&arg) {
            args.insert(i, "check".to_string());
        }
        return;
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "warn",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config '{}'", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config '{}'", path.display()))
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "engine settings");
    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match cli.command {
        Command::Check(args) => {
            let source = SourceFile::load(&args.file)?;
            let lesson = source.parse();
            let mut diagnostics = lesson.diagnostics.clone();
            diagnostics.extend(lesson.nested_diagnostics(config.max_render_depth));
            source.emit(&diagnostics, color);
            if diagnostics.iter().any(ParseError::is_error) {
                return Ok(1);
            }
            let warnings = diagnostics.len();
            eprintln!(
                "ok: {} parsed ({} blocks, {} warning(s))",
                args.file,
                lesson.blocks.len(),
                warnings
            );
            Ok(0)
        }
        Command::Dump(args) => {
            let source = SourceFile::load(&args.file)?;
            let lesson = source.parse();
            source.emit(&lesson.diagnostics, color);
            if args.markup {
                print!("{}", to_markup(&lesson.into_nodes()));
            } else {
                for (i, block) in lesson.blocks.iter().enumerate() {
                    println!("[{}] {} @ {:?}", i, block.node.kind_name(), block.span);
                    println!("{:#?}", block.node);
                }
            }
            Ok(0)
        }
        Command::Render(args) => {
            let source = SourceFile::load(&args.file)?;
            let lesson = source.parse();
            source.emit(&lesson.diagnostics, color);
            print!("{}", Renderer::new(config).render_html(&lesson));
            Ok(0)
        }
        Command::Simulate(args) => {
            let source = SourceFile::load(&args.file)?;
            let lesson = source.parse();
            let node = simulate::simulator(&lesson, args.block)?;
            let outcome = simulate::decide(node, &args.action, &config)?;
            println!("action:   {}", args.action);
            println!("pips:     {}", outcome.pips);
            println!("correct:  {}", outcome.correct);
            if let Some(score) = outcome.score {
                println!("score:    {}", score);
            }
            println!("price:    {}", outcome.final_price);
            println!("feedback: {}", outcome.feedback);
            Ok(0)
        }
        Command::Test(args) => {
            let path = Path::new(&args.path);
            if args.list_categories {
                test_runner::list_categories(path);
                return Ok(0);
            }
            Ok(test_runner::run_tests(path, cli.no_color, &args.category, &config))
        }
    }
}

/// A lesson file registered with codespan for diagnostics.
struct SourceFile {
    files: SimpleFiles<String, String>,
    file_id: usize,
    source: String,
}

impl SourceFile {
    fn load(path: &str) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path).with_context(|| format!("cannot read '{}'", path))?;
        let mut files = SimpleFiles::new();
        let file_id = files.add(path.to_string(), source.clone());
        Ok(SourceFile {
            files,
            file_id,
            source,
        })
    }

    fn parse(&self) -> Lesson {
        let lesson = talamo::parser::Parser::new(self.source.clone(), self.file_id).parse();
        debug!(
            blocks = lesson.blocks.len(),
            diagnostics = lesson.diagnostics.len(),
            "parsed lesson"
        );
        lesson
    }

    fn emit(&self, diagnostics: &[ParseError], color: ColorChoice) {
        let writer = StandardStream::stderr(color);
        let config = term::Config::default();
        for error in diagnostics {
            let diagnostic = error.to_diagnostic();
            let _ = term::emit_to_write_style(&mut writer.lock(), &config, &self.files, &diagnostic);
        }
    }
}
