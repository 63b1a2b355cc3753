mod config;
mod test_runner;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use displayinframe::error::error_chain;
use displayinframe::host::{AccessRules, FileWiki, MemoryWiki, RenderRequest, Wiki};
use displayinframe::services::DocumentLoader;
use displayinframe::{InclusionError, RenderError};
use wiki::parser::ParseError;
use wiki::render::{to_html, to_plain_text};
use wiki::{Block, Syntax, UserReference};

use config::WikiConfig;

const SUBCOMMANDS: &[&str] = &["render", "check", "list", "macros", "test", "help"];

#[derive(Parser)]
#[command(name = "dif", version, about = "Render wiki pages with framed page displays")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// More log output (repeatable); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a page of a wiki directory
    Render(RenderArgs),

    /// Parse every page and report syntax errors
    Check(WikiArgs),

    /// List the pages of a wiki directory
    List(WikiArgs),

    /// List the available macros
    Macros,

    /// Run .test.md test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct WikiArgs {
    /// Wiki directory (one sub-folder per space)
    dir: PathBuf,

    /// Settings file to use instead of <dir>/wiki.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::Args)]
struct RenderArgs {
    #[command(flatten)]
    wiki: WikiArgs,

    /// Page reference, e.g. `Space.Page` or `xwiki:Space.Page`
    page: String,

    /// Render as this user
    #[arg(short, long)]
    user: Option<String>,

    /// Locale of the translation to render
    #[arg(short, long)]
    locale: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Format::Html)]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Html,
    Plain,
    /// Dump the rendered block tree
    Tree,
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
    // `dif <dir> <page>` is `dif render <dir> <page>`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().skip(1).position(|a| !a.starts_with('-')) {
        let pos = pos + 1;
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "render".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_tracing(cli.verbose);

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match cli.command {
        Command::Render(render_args) => do_render(render_args, color_choice),
        Command::Check(wiki_args) => do_check(wiki_args, color_choice),
        Command::List(wiki_args) => do_list(wiki_args),
        Command::Macros => do_macros(),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &WikiArgs) -> WikiConfig {
    let loaded = match &args.config {
        Some(path) => WikiConfig::load(path),
        None => WikiConfig::load_from_dir(&args.dir),
    };
    loaded.unwrap_or_else(|e| {
        eprintln!("error: {}", error_chain(&e));
        process::exit(1);
    })
}

fn do_render(args: RenderArgs, color_choice: ColorChoice) {
    let config = load_config(&args.wiki);
    let store = Arc::new(FileWiki::new(&args.wiki.dir, config.main_wiki.clone()));
    let wiki = Wiki::with_link_style(
        &config.main_wiki,
        config.link_style(),
        store,
        Arc::new(config.access_rules()),
    );

    let reference = match wiki.resolve(&args.page) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {}", error_chain(&e));
            process::exit(1);
        }
    };

    let request = RenderRequest {
        user: args
            .user
            .or(config.default_user)
            .map(UserReference::new)
            .unwrap_or_else(UserReference::guest),
        locale: args.locale.or(config.default_locale),
        target_syntax: match args.format {
            Format::Plain => Syntax::Plain,
            Format::Html | Format::Tree => Syntax::Html,
        },
    };

    let xdom = match wiki.render_page(&reference, &request) {
        Ok(xdom) => xdom,
        Err(InclusionError::Render {
            source: RenderError::Parse { errors, .. },
        }) => {
            // The renderer parses the page as file 0.
            let source = wiki
                .loader()
                .load(&reference)
                .map(|d| d.content_for(request.locale.as_deref()).to_string())
                .unwrap_or_default();
            let mut files = SimpleFiles::new();
            files.add(reference.to_string(), source);
            emit_parse_errors(color_choice, &files, &errors);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {}", error_chain(&e));
            process::exit(1);
        }
    };

    match args.format {
        Format::Html => println!("{}", to_html(&xdom.children)),
        Format::Plain => println!("{}", to_plain_text(&xdom.children)),
        Format::Tree => print_tree(&xdom.children, 0),
    }
}

fn do_check(args: WikiArgs, color_choice: ColorChoice) {
    let config = load_config(&args);
    let store = FileWiki::new(&args.dir, config.main_wiki);
    let references = store.list().unwrap_or_else(|e| {
        eprintln!("error: {}", error_chain(&e));
        process::exit(1);
    });

    let mut files = SimpleFiles::new();
    let mut failed = 0usize;
    for reference in &references {
        let document = match store.load(reference) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("error: {}", error_chain(&e));
                failed += 1;
                continue;
            }
        };
        let sources = std::iter::once((reference.to_string(), document.content.clone())).chain(
            document
                .translations
                .iter()
                .map(|(locale, content)| (format!("{} ({})", reference, locale), content.clone())),
        );
        for (name, source) in sources {
            let file_id = files.add(name, source.clone());
            if let Err(errors) = wiki::parser::Parser::new(source, file_id).parse() {
                emit_parse_errors(color_choice, &files, &errors);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        eprintln!("error: {} of {} pages failed to parse", failed, references.len());
        process::exit(1);
    }
    eprintln!("ok: {} pages parsed successfully", references.len());
}

fn do_list(args: WikiArgs) {
    let config = load_config(&args);
    let store = FileWiki::new(&args.dir, config.main_wiki);
    match store.list() {
        Ok(references) => {
            for reference in references {
                println!("{}", reference);
            }
        }
        Err(e) => {
            eprintln!("error: {}", error_chain(&e));
            process::exit(1);
        }
    }
}

fn do_macros() {
    let wiki = Wiki::new(
        "xwiki",
        Arc::new(MemoryWiki::new()),
        Arc::new(AccessRules::allow_all()),
    );
    for m in wiki.transformation().macros() {
        let descriptor = m.descriptor();
        println!(
            "{} ({}) priority={} categories=[{}]{}",
            descriptor.id,
            descriptor.name,
            descriptor.priority,
            descriptor.default_categories.join(", "),
            if descriptor.supports_inline { " inline" } else { "" }
        );
        println!("    {}", descriptor.description);
    }
}

fn emit_parse_errors(color_choice: ColorChoice, files: &SimpleFiles<String, String>, errors: &[ParseError]) {
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    for error in errors {
        let diagnostic = error.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, &diagnostic);
    }
}

fn print_tree(blocks: &[Block], indent: usize) {
    for block in blocks {
        println!("{}{}", "  ".repeat(indent), describe(block));
        print_tree(block.children(), indent + 1);
    }
}

fn describe(block: &Block) -> String {
    match block {
        Block::Section(_) => "section".to_string(),
        Block::Heading { level, id, content } => {
            format!("heading h{} #{} {:?}", level, id, wiki::block::plain_text(content))
        }
        Block::Paragraph(content) => format!("paragraph {:?}", wiki::block::plain_text(content)),
        Block::CodeBlock { language, .. } => {
            format!("code {}", language.as_deref().unwrap_or("-"))
        }
        Block::Quotation(_) => "quotation".to_string(),
        Block::List { start, .. } => match start {
            Some(n) => format!("list ordered from {}", n),
            None => "list".to_string(),
        },
        Block::ListItem(_) => "item".to_string(),
        Block::HorizontalLine => "horizontal line".to_string(),
        Block::Group { parameters, .. } => format!("group {}", attributes(parameters.iter())),
        Block::MetaData { metadata, .. } => format!("metadata {}", attributes(metadata.iter())),
        Block::Macro(marker) => format!("macro {}", marker.id),
        Block::Error { message, .. } => format!("error {:?}", message),
    }
}

fn attributes<K: AsRef<str>, V: AsRef<str>>(pairs: impl Iterator<Item = (K, V)>) -> String {
    pairs
        .map(|(k, v)| format!("{}={:?}", k.as_ref(), v.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
