use clap::{Parser, ValueEnum};
use prodgen::{Context, Grammar, GrammarConfig, Registry};
use std::path::PathBuf;

/// Generate random text from a production-rule file
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the grammar file
    #[arg(
        help = "Path to the production-rule file",
        required_unless_present = "list_builtins"
    )]
    grammar_file: Option<PathBuf>,

    /// The starting non-terminal symbol
    #[arg(help = "Nonterminal to expand (defaults to the first one declared)")]
    start_symbol: Option<String>,

    /// Number of texts to generate
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Seed for reproducible output
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON file with generation settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the maximum expansion depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Print the parsed grammar instead of generating
    #[arg(long, value_enum)]
    dump: Option<DumpFormat>,

    /// List the registered terminal and builtin names, then exit
    #[arg(long)]
    list_builtins: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum DumpFormat {
    Text,
    Json,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => GrammarConfig::from_json_file(path)?,
        None => GrammarConfig::default(),
    };
    if let Some(depth) = cli.max_depth {
        config.max_recursion_depth = depth;
    }

    let registry = Registry::with_defaults();
    if cli.list_builtins {
        for name in registry.list_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let grammar_file = cli.grammar_file.ok_or("no grammar file given")?;
    let grammar = Grammar::from_file(&grammar_file, &registry)?.with_config(config);

    match cli.dump {
        Some(DumpFormat::Text) => {
            print!("{}", grammar);
            return Ok(());
        }
        Some(DumpFormat::Json) => {
            println!("{}", serde_json::to_string_pretty(&grammar.dump())?);
            return Ok(());
        }
        None => {}
    }

    let start = cli
        .start_symbol
        .unwrap_or_else(|| grammar.start_symbol().to_string());
    let mut ctx = match cli.seed {
        Some(seed) => Context::seeded(seed),
        None => Context::from_entropy(),
    };

    eprintln!(
        "Loaded {} nonterminals from {}",
        grammar.nonterminals().len(),
        grammar_file.display()
    );

    for _ in 0..cli.count {
        let generated = grammar.generate_from(&mut ctx, &start)?;
        println!("{}", generated);
    }

    Ok(())
}
