use anyhow::{Context, Result};
use chapter_patcher::config::{
    check_plan, discover_plans, load_from_path, ApplicationError, Applicator, ApplyOptions,
    SubstitutionResult,
};
use chapter_patcher::dom::{Dom, Selector, Step, Substitution};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chapter-patcher")]
#[command(
    about = "Splice translated fragments into EPUB chapters by structural position",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply substitution plans to an unpacked book
    Apply {
        /// Path to the unpacked book (defaults to CHAPTER_PATCHER_BOOK, then the current directory)
        #[arg(short, long)]
        book: Option<PathBuf>,

        /// Specific plan file to apply (otherwise applies all in plans/)
        #[arg(short, long)]
        plans: Option<PathBuf>,

        /// Write patched chapters under this directory instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Check status of plans without applying
    Status {
        /// Path to the unpacked book
        #[arg(short, long)]
        book: Option<PathBuf>,

        /// Specific plan file to check (otherwise checks all in plans/)
        #[arg(short, long)]
        plans: Option<PathBuf>,
    },

    /// Print the source text of a node id ("2/1/0") or partition ("2/1/0-3")
    Extract { chapter: PathBuf, selector: String },

    /// List a chapter's tokens and check that they reproduce it byte for byte
    Tokens { chapter: PathBuf },

    /// Merge a plan's substitutions for one chapter into a single covering one
    Merge {
        chapter: PathBuf,

        /// Plan holding the substitutions
        #[arg(long)]
        plan: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            book,
            plans,
            output,
            dry_run,
            diff,
        } => cmd_apply(book, plans, output, dry_run, diff),

        Commands::Status { book, plans } => cmd_status(book, plans),

        Commands::Extract { chapter, selector } => cmd_extract(&chapter, &selector),

        Commands::Tokens { chapter } => cmd_tokens(&chapter),

        Commands::Merge { chapter, plan } => cmd_merge(&chapter, &plan),
    }
}

/// Helper: Discover all .toml plan files in a plans/ directory.
///
/// Discovery order:
/// 1. `<book>/plans` (plans kept alongside the unpacked book).
/// 2. `./plans` relative to the current working directory.
fn discover_plan_files(book: &Path) -> Result<Vec<PathBuf>> {
    let cwd_plans_dir = env::current_dir().ok().map(|cwd| cwd.join("plans"));
    let candidate_dirs = std::iter::once(book.join("plans")).chain(cwd_plans_dir);

    for plans_dir in candidate_dirs {
        let files = discover_plans(&plans_dir)?;
        if !files.is_empty() {
            return Ok(files);
        }
    }

    anyhow::bail!(
        "No .toml plan files found in either ./plans or {}/plans",
        book.display()
    )
}

/// Resolve the book root.
///
/// Priority order:
/// 1. Explicit --book flag
/// 2. CHAPTER_PATCHER_BOOK environment variable
/// 3. Current directory
fn resolve_book(cli_book: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_book {
        return path
            .canonicalize()
            .with_context(|| format!("book not found: {}", path.display()));
    }

    if let Ok(env_path) = env::var("CHAPTER_PATCHER_BOOK") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: CHAPTER_PATCHER_BOOK is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    let cwd = env::current_dir()?;
    println!("{}", format!("Using current directory: {}", cwd.display()).dimmed());
    Ok(cwd)
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_apply(
    book: Option<PathBuf>,
    plans: Option<PathBuf>,
    output: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let book = resolve_book(book)?;
    let plan_files = match plans {
        Some(path) => vec![path],
        None => discover_plan_files(&book)?,
    };

    println!("Book: {}", book.display());
    if let Some(output) = &output {
        println!("Output: {}", output.display());
    }
    println!();

    let options = ApplyOptions { output, dry_run };
    let mut applicator = Applicator::new(&book, options)?;

    let mut total_applied = 0;
    let mut total_already_applied = 0;
    let mut total_failed = 0;

    for plan_file in plan_files {
        println!("Loading plan from {}...", plan_file.display());
        let plan = load_from_path(&plan_file)?;
        if dry_run {
            println!("{}", "  [DRY RUN - showing what would be applied]".cyan());
        }

        let report = applicator.apply(&plan);

        for (substitution_id, result) in report.results {
            match result {
                Ok(SubstitutionResult::Applied { file }) => {
                    let verb = if dry_run { "Would apply to" } else { "Applied to" };
                    println!(
                        "{} {}: {} {}",
                        "✓".green(),
                        substitution_id,
                        verb,
                        file.display()
                    );
                    total_applied += 1;
                }
                Ok(SubstitutionResult::AlreadyApplied { file }) => {
                    println!(
                        "{} {}: Already applied to {}",
                        "⊙".yellow(),
                        substitution_id,
                        file.display()
                    );
                    total_already_applied += 1;
                }
                Ok(SubstitutionResult::Failed { file, reason }) => {
                    eprintln!("{} {}: Skipped - {}", "✗".red(), substitution_id, reason);
                    eprintln!("  File: {}", file.display());
                    total_failed += 1;
                }
                Err(e) => {
                    eprintln!("{} {}: Error - {}", "✗".red(), substitution_id, e);
                    total_failed += 1;

                    if let ApplicationError::Render { source, .. } = &e {
                        eprintln!("  {}", "CONFLICT: substitutions cannot be rendered together".red());
                        eprintln!("  Cause: {}", source);
                        eprintln!("  Action: set meta.merge_nested = true for nested partitions");
                    }
                }
            }
        }

        if show_diff {
            for chapter in &report.chapters {
                if chapter.original != chapter.rendered {
                    display_diff(&chapter.file, &chapter.original, &chapter.rendered);
                }
            }
        }

        println!();
    }

    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", total_applied).green());
    println!(
        "  {} already applied",
        format!("{}", total_already_applied).yellow()
    );
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_status(book: Option<PathBuf>, plans: Option<PathBuf>) -> Result<()> {
    let book = resolve_book(book)?;
    let plan_files = match plans {
        Some(path) => vec![path],
        None => discover_plan_files(&book)?,
    };

    println!("{}", "Plan Status Report".bold());
    println!("Book: {}", book.display());
    println!();

    let mut applied = Vec::new();
    let mut not_applied = Vec::new();
    let mut failing = Vec::new();

    for plan_file in plan_files {
        let plan = load_from_path(&plan_file)?;
        for (substitution_id, result) in check_plan(&plan, &book) {
            match result {
                Ok(SubstitutionResult::AlreadyApplied { .. }) => applied.push(substitution_id),
                Ok(SubstitutionResult::Applied { .. }) => not_applied.push(substitution_id),
                Ok(SubstitutionResult::Failed { reason, .. }) => {
                    failing.push((substitution_id, reason))
                }
                Err(e) => failing.push((substitution_id, e.to_string())),
            }
        }
    }

    if !applied.is_empty() {
        println!(
            "{} {} ({} substitutions)",
            "✓".green(),
            "APPLIED".green().bold(),
            applied.len()
        );
        for id in &applied {
            println!("  - {}", id);
        }
        println!();
    }

    if !not_applied.is_empty() {
        println!(
            "{} {} ({} substitutions)",
            "⊙".yellow(),
            "NOT APPLIED".yellow().bold(),
            not_applied.len()
        );
        for id in &not_applied {
            println!("  - {}", id);
        }
        println!();
    }

    if !failing.is_empty() {
        println!(
            "{} {} ({} substitutions)",
            "✗".red(),
            "FAILING".red().bold(),
            failing.len()
        );
        for (id, reason) in &failing {
            println!("  - {} ({})", id, reason.dimmed());
        }
        println!();
    }

    Ok(())
}

fn load_chapter(chapter: &Path) -> Result<Dom> {
    let text = fs::read_to_string(chapter)
        .with_context(|| format!("failed to read {}", chapter.display()))?;
    Dom::load(text).with_context(|| format!("failed to parse {}", chapter.display()))
}

fn cmd_extract(chapter: &Path, selector: &str) -> Result<()> {
    let dom = load_chapter(chapter)?;
    let selector: Selector = selector.parse()?;
    print!("{}", dom.extract_content(selector)?);
    Ok(())
}

fn cmd_tokens(chapter: &Path) -> Result<()> {
    let dom = load_chapter(chapter)?;
    let mut rendered = String::with_capacity(dom.text().len());

    for token in dom.tokens() {
        let marker = match token.step {
            Step::Open => "open ",
            Step::Close => "close",
        };
        let id = if token.node_id.is_root() {
            "<root>".to_string()
        } else {
            token.node_id.to_string()
        };
        println!(
            "{} {:<16} {:>8}..{:<8} {:?}",
            marker,
            id,
            token.span.start,
            token.span.end,
            token.content
        );
        rendered.push_str(token.content);
    }

    if rendered != dom.text() {
        eprintln!("{}", "✗ tokens do not reproduce the chapter".red());
        std::process::exit(1);
    }
    println!("{} {} nodes, round trip exact", "✓".green(), dom.node_count());
    Ok(())
}

fn cmd_merge(chapter: &Path, plan_file: &Path) -> Result<()> {
    let dom = load_chapter(chapter)?;
    let plan = load_from_path(plan_file)?;
    let substitutions = plan
        .substitutions
        .iter()
        .filter(|definition| chapter.ends_with(&definition.file))
        .map(|definition| definition.to_substitution())
        .collect::<Result<Vec<Substitution>, _>>()?;

    if substitutions.is_empty() {
        anyhow::bail!(
            "{} has no substitutions for {}",
            plan_file.display(),
            chapter.display()
        );
    }

    let merged = dom.merge_substitutions(&substitutions)?;
    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(())
}
