//! dartidl CLI.
//!
//! Generates Dart bindings from an IDL interface database snapshot.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};

use dartidl_compiler::{Generator, GeneratorConfig, StaleReason, SystemKind};

mod logging;
mod ui;

#[derive(Parser)]
#[command(name = "dartidl")]
#[command(version)]
#[command(about = "dartidl - generates Dart bindings from an IDL interface database")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate bindings into the output directory
    Generate(ConfigArgs),

    /// Regenerate in memory and report files on disk that are out of date
    Check(ConfigArgs),

    /// Print the interfaces in scope, parents first
    Order(ConfigArgs),

    /// Regenerate whenever the database changes
    Watch(ConfigArgs),
}

/// Options shared by every subcommand. Flags override the config file.
#[derive(Args)]
struct ConfigArgs {
    /// Generator configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database snapshot
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// System to run; repeat for several (interface, wrapping, native, js, dummy)
    #[arg(short, long = "system", value_name = "SYSTEM")]
    systems: Vec<SystemKind>,

    /// Dart library name
    #[arg(long)]
    library: Option<String>,

    /// Only emit interfaces annotated by one of these sources
    #[arg(long = "source-filter", value_name = "SOURCE")]
    source_filter: Vec<String>,

    /// Directory of hand-written interface files
    #[arg(long)]
    auxiliary_dir: Option<PathBuf>,

    /// Extra template search directory; repeatable
    #[arg(long = "templates", value_name = "DIR")]
    template_dirs: Vec<PathBuf>,

    /// Fail on types the database does not declare
    #[arg(long)]
    strict_types: bool,
}

impl ConfigArgs {
    fn resolve(&self) -> miette::Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::load(path)?,
            None => GeneratorConfig::default(),
        };

        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(output) = &self.output {
            config.out_dir = output.clone();
        }
        if !self.systems.is_empty() {
            config.systems = self.systems.clone();
        }
        if let Some(library) = &self.library {
            config.library_name = library.clone();
        }
        if !self.source_filter.is_empty() {
            config.source_filter = self.source_filter.clone();
        }
        if let Some(dir) = &self.auxiliary_dir {
            config.auxiliary_dir = Some(dir.clone());
        }
        config.template_dirs.extend(self.template_dirs.iter().cloned());
        config.strict_types |= self.strict_types;

        tracing::debug!(?config, "resolved configuration");
        Ok(config)
    }
}

fn main() -> miette::Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => generate(&args.resolve()?),
        Commands::Check(args) => {
            let up_to_date = check(&args.resolve()?)?;
            if !up_to_date {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Order(args) => order(&args.resolve()?),
        Commands::Watch(args) => watch(args.resolve()?),
    }
}

fn generate(config: &GeneratorConfig) -> miette::Result<()> {
    ui::header(env!("CARGO_PKG_VERSION"));
    let start = Instant::now();

    let spinner = ui::spinner("Generating bindings...");
    let result = Generator::new(config.clone()).generate();
    spinner.finish_and_clear();
    let result = result?;

    let systems: Vec<&str> = config.systems.iter().map(SystemKind::name).collect();
    ui::Panel::new(systems.join(", "))
        .stat("interfaces", result.interfaces)
        .stat("callbacks", result.callbacks)
        .stat("auxiliary", result.skipped)
        .stat("operations", result.operations)
        .stat("files", result.files)
        .print();

    ui::success(&format!("Wrote {}", config.out_dir.display()));
    ui::timing("Done", start.elapsed().as_millis());
    Ok(())
}

/// Returns `false` when any generated file is stale.
fn check(config: &GeneratorConfig) -> miette::Result<bool> {
    let spinner = ui::spinner("Checking generated sources...");
    let stale = Generator::new(config.clone()).check();
    spinner.finish_and_clear();
    let stale = stale?;

    if stale.is_empty() {
        ui::up_to_date();
        return Ok(true);
    }

    ui::stale_report(stale.iter().map(|file| {
        let reason = match file.reason {
            StaleReason::Missing => "missing",
            StaleReason::Changed => "changed",
        };
        (file.path.as_str(), reason)
    }));
    ui::dim(&format!(
        "{} file(s) out of date. Run `dartidl generate` to refresh them.",
        stale.len()
    ));
    Ok(false)
}

fn order(config: &GeneratorConfig) -> miette::Result<()> {
    for id in Generator::new(config.clone()).order()? {
        println!("{}", id);
    }
    Ok(())
}

/// Runs one generation pass, reporting failures without exiting.
fn regenerate(generator: &Generator, reason: &str) {
    let spinner = ui::spinner(reason);
    let start = Instant::now();
    match generator.generate() {
        Ok(result) => {
            spinner.finish_and_clear();
            ui::success(&format!(
                "Generated {} interface(s), {} file(s) in {}ms",
                result.interfaces,
                result.files,
                start.elapsed().as_millis()
            ));
        }
        Err(e) => {
            spinner.finish_and_clear();
            ui::error(&format!("{:?}", miette::Report::new(e)));
        }
    }
    println!();
}

fn watched_paths(config: &GeneratorConfig) -> Vec<(PathBuf, RecursiveMode)> {
    let database_mode = if config.database.is_dir() {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    let mut paths = vec![(config.database.clone(), database_mode)];
    let dirs = config.auxiliary_dir.iter().chain(&config.template_dirs);
    paths.extend(
        dirs.filter(|dir| dir.is_dir())
            .map(|dir| (dir.clone(), RecursiveMode::Recursive)),
    );
    paths
}

fn watch(config: GeneratorConfig) -> miette::Result<()> {
    ui::header(env!("CARGO_PKG_VERSION"));
    let generator = Generator::new(config);
    regenerate(&generator, "Generating bindings...");

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(500), move |result: DebounceEventResult| {
        match result {
            Ok(events) if !events.is_empty() => {
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "file watcher error"),
        }
    })
    .map_err(|e| miette::miette!("failed to create file watcher: {}", e))?;

    for (path, mode) in watched_paths(generator.config()) {
        debouncer
            .watcher()
            .watch(&path, mode)
            .map_err(|e| miette::miette!("failed to watch {}: {}", display(&path), e))?;
        ui::info(&format!("Watching {}", display(&path)));
    }

    println!();
    ui::info("Ready! Waiting for changes...");
    while rx.recv().is_ok() {
        println!();
        regenerate(&generator, "Change detected, regenerating...");
        ui::info("Ready! Waiting for changes...");
    }

    ui::dim("Stopping watch mode.");
    Ok(())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ConfigArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Generate(args)
            | Commands::Check(args)
            | Commands::Order(args)
            | Commands::Watch(args) => args,
        }
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "dartidl",
            "generate",
            "--database",
            "db.json",
            "--system",
            "native",
            "--system",
            "js",
            "--library",
            "dom",
            "--strict-types",
        ])
        .resolve()
        .unwrap();

        assert_eq!(config.database, PathBuf::from("db.json"));
        assert_eq!(config.systems, vec![SystemKind::Native, SystemKind::Js]);
        assert_eq!(config.library_name, "dom");
        assert!(config.strict_types);
        assert_eq!(config.out_dir, GeneratorConfig::default().out_dir);
    }

    #[test]
    fn test_unknown_system_is_rejected() {
        assert!(Cli::try_parse_from(["dartidl", "generate", "--system", "python"]).is_err());
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dartidl.json");
        std::fs::write(
            &path,
            r#"{ "database": "idl/db.json", "systems": ["interface", "wrapping"], "library_name": "html" }"#,
        )
        .unwrap();

        let config = parse(&["dartidl", "check", "--config", path.to_str().unwrap(), "--library", "svg"])
            .resolve()
            .unwrap();

        assert_eq!(config.database, dir.path().join("idl/db.json"));
        assert_eq!(config.systems, vec![SystemKind::Interface, SystemKind::Wrapping]);
        assert_eq!(config.library_name, "svg");
    }

    #[test]
    fn test_database_directory_is_watched_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let fragments = dir.path().join("idl");
        std::fs::create_dir_all(fragments.join("svg")).unwrap();
        let snapshot = dir.path().join("db.json");
        std::fs::write(&snapshot, "{}").unwrap();

        let config = GeneratorConfig {
            database: fragments.clone(),
            ..GeneratorConfig::default()
        };
        let paths = watched_paths(&config);
        assert_eq!(paths[0].0, fragments);
        assert!(matches!(paths[0].1, RecursiveMode::Recursive));

        let config = GeneratorConfig {
            database: snapshot,
            ..GeneratorConfig::default()
        };
        assert!(matches!(watched_paths(&config)[0].1, RecursiveMode::NonRecursive));
    }
}
