//! # dartidl Compiler
//!
//! This crate generates Dart bindings from an IDL interface database. One
//! pass over the database drives several independent back-ends ("systems"):
//! abstract interfaces, delegating wrappers, native bindings with their C++
//! glue, and JavaScript interop classes.
//!
//! ## Architecture
//!
//! ```text
//! Database snapshot (JSON)
//!        │
//!        ▼
//! ┌──────────────┐
//! │     IDL      │  Load, split accessors,
//! │ (JSON → DB)  │  merge supplementals
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Validate   │  Unidentified types,
//! │    (DB)      │  cycles & accessors
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Codegen    │  Filter → pre-order → emit
//! │ (DB → Dart)  │  per system
//! └──────┬───────┘
//!        │
//!        ▼
//!   OutputSink ──flush──▶ out_dir
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dartidl_compiler::{Generator, GeneratorConfig};
//!
//! let config = GeneratorConfig::load("dartidl.json".as_ref())?;
//! let result = Generator::new(config).generate()?;
//! println!("{} files", result.files);
//! ```

pub mod analysis;
pub mod codegen;
pub mod config;
pub mod diagnostic;
pub mod idl;
pub mod types;
pub mod validate;

pub use codegen::{OutputSink, StaleFile, StaleReason, SystemKind};
pub use config::GeneratorConfig;
pub use diagnostic::GeneratorError;
pub use idl::Database;

/// The main generator struct that orchestrates the generation pipeline.
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    /// Creates a new generator with the given configuration.
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates the bindings and writes them to the output directory.
    ///
    /// This runs the full pipeline:
    /// 1. Load the database snapshot
    /// 2. Normalise it (supplementals, unidentified types)
    /// 3. Validate its structure
    /// 4. Generate every configured system into memory
    /// 5. Write output files
    pub fn generate(&self) -> Result<GenerateResult, GeneratorError> {
        // Phase 1-3: Load, normalise and validate
        let database = self.prepare_database()?;

        // Phase 4: Generate
        let (sink, stats) = self.run(&database)?;

        // Phase 5: Write output
        let files = sink.flush(&self.config.out_dir)?;
        tracing::info!(files, out_dir = %self.config.out_dir.display(), "generation finished");

        Ok(GenerateResult {
            interfaces: stats.interfaces,
            callbacks: stats.callbacks,
            skipped: stats.skipped,
            operations: stats.operations,
            files,
        })
    }

    /// Regenerates in memory and lists files on disk that differ.
    pub fn check(&self) -> Result<Vec<StaleFile>, GeneratorError> {
        let database = self.prepare_database()?;
        let (sink, _) = self.run(&database)?;
        sink.stale_files(&self.config.out_dir)
    }

    /// Ids of the interfaces in scope, in emission order.
    pub fn order(&self) -> Result<Vec<String>, GeneratorError> {
        let database = self.prepare_database()?;
        Ok(codegen::emission_order(&database, &self.config)
            .into_iter()
            .map(|interface| interface.id.clone())
            .collect())
    }

    /// Normalises, validates and generates `database` without touching disk.
    pub fn generate_in_memory(&self, mut database: Database) -> Result<OutputSink, GeneratorError> {
        self.normalise(&mut database)?;
        validate::validate_database(&database)?;
        let (sink, _) = self.run(&database)?;
        Ok(sink)
    }

    fn prepare_database(&self) -> Result<Database, GeneratorError> {
        let mut database = idl::loader::load_database(&self.config.database)?;
        self.normalise(&mut database)?;
        validate::validate_database(&database)?;
        Ok(database)
    }

    fn normalise(&self, database: &mut Database) -> Result<(), GeneratorError> {
        let merged = database.merge_supplementals()?;
        if merged > 0 {
            tracing::debug!(merged, "merged supplemental interfaces");
        }

        if self.config.strict_types {
            let names = validate::unidentified_types(database);
            if !names.is_empty() {
                return Err(GeneratorError::UnresolvedTypes { names });
            }
        } else {
            let removed = validate::strip_unidentified_members(database);
            if removed > 0 {
                tracing::warn!(removed, "removed members with unidentified types");
            }
        }
        Ok(())
    }

    fn run(&self, database: &Database) -> Result<(OutputSink, codegen::GenerateStats), GeneratorError> {
        let mut sink = OutputSink::new();
        let stats = codegen::generate(database, &self.config, &mut sink)?;
        Ok((sink, stats))
    }
}

/// Result of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateResult {
    /// Number of interfaces generated.
    pub interfaces: usize,
    /// Number of callback typedefs generated.
    pub callbacks: usize,
    /// Number of interfaces replaced by auxiliary files.
    pub skipped: usize,
    /// Number of operation groups analyzed.
    pub operations: usize,
    /// Number of files written.
    pub files: usize,
}
