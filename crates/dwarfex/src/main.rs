use std::io::{self, Write};
use std::path::PathBuf;
use std::{fs, process};

use clap::{ArgGroup, Parser, Subcommand};
use dwarfex_core::classify::ExportClass;
use dwarfex_core::comments::{LocalSources, PathSubstitution};
use dwarfex_core::dwarf::{load_debug_info, DecodeOptions};
use dwarfex_core::export::{ExportOptions, Exporter};
use dwarfex_core::index::EntryIndex;
use dwarfex_core::select::SelectionMode;
use dwarfex_core::DwarfexResult;
use dwarfex_utils::{info, init_logging, init_logging_with_level, LogFormat, LogLevel};

/// Export DWARF type and variable descriptions from ELF binaries as JSON.
#[derive(Parser, Debug)]
#[command(name = "dwarfex")]
#[command(version)]
#[command(about = "Export DWARF type and variable descriptions from ELF binaries as JSON", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Write the selected descriptions and their dependencies as JSON
    #[command(group(ArgGroup::new("selection").required(true).args(["all", "classes", "names"])))]
    Export
    {
        /// ELF file with DWARF debug information
        elf: PathBuf,
        /// Export every top-level entry
        #[arg(short, long)]
        all: bool,
        /// Export every top-level entry of these classes (e.g. StructureType)
        #[arg(short = 'c', long = "class", num_args = 1..)]
        classes: Vec<ExportClass>,
        /// Export the entries with these names
        #[arg(short = 't', long = "type", num_args = 1..)]
        names: Vec<String>,
        /// Output file, `-` for stdout
        #[arg(short, long, default_value = "export.json")]
        output: String,
        /// Keep unnamed types at the top level
        #[arg(long)]
        include_unnamed: bool,
        /// Attach source comments to declarations, members and enumerators
        #[arg(long)]
        export_comments: bool,
        /// Rewrite source path prefixes before reading sources (repeatable)
        #[arg(long = "source-path-subst", num_args = 2, value_names = ["FROM", "TO"])]
        source_path_subst: Vec<String>,
        /// Skip entries that fail to decode instead of aborting
        #[arg(long)]
        skip_errors: bool,
        /// Export a selected typedef itself, not the struct it names
        #[arg(long)]
        no_unwrap_typedefs: bool,
    },
    /// Print the top-level entries with their class
    List
    {
        /// ELF file with DWARF debug information
        elf: PathBuf,
        /// Only list entries of these classes
        #[arg(short = 'c', long = "class", num_args = 1..)]
        classes: Vec<ExportClass>,
        /// Skip entries that fail to decode instead of aborting
        #[arg(long)]
        skip_errors: bool,
    },
}

fn main()
{
    let cli = Cli::parse();

    let logging = match cli.log_level {
        Some(level) => init_logging_with_level(level, LogFormat::from_env()),
        None => init_logging(),
    };
    if let Err(e) = logging {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Commands) -> DwarfexResult<()>
{
    match command {
        Commands::Export {
            elf,
            all,
            classes,
            names,
            output,
            include_unnamed,
            export_comments,
            source_path_subst,
            skip_errors,
            no_unwrap_typedefs,
        } => {
            let mode = if all {
                SelectionMode::All
            } else if !classes.is_empty() {
                SelectionMode::ByClass(classes)
            } else {
                SelectionMode::ByName(names)
            };
            let options = ExportOptions {
                mode,
                include_unnamed,
                export_comments,
                unwrap_typedefs: !no_unwrap_typedefs,
                path_substitutions: source_path_subst
                    .chunks_exact(2)
                    .map(|pair| PathSubstitution::new(&pair[0], &pair[1]))
                    .collect(),
            };

            info!("Loading debug information from {}", elf.display());
            let debug_info = load_debug_info(&elf, &DecodeOptions { skip_errors })?;
            let export = Exporter::new(&debug_info, options).run(&LocalSources);
            export.report.log_summary();

            let json = export.to_json()?;
            if output == "-" {
                println!("{json}");
            } else {
                fs::write(&output, json + "\n")?;
                info!("Wrote {} descriptions to {}", export.records.len(), output);
            }
            Ok(())
        }
        Commands::List {
            elf,
            classes,
            skip_errors,
        } => {
            let debug_info = load_debug_info(&elf, &DecodeOptions { skip_errors })?;
            let index = EntryIndex::new(&debug_info);

            let mut out = io::stdout().lock();
            for top in index.top_level() {
                let Some(class) = ExportClass::of(top.kind) else {
                    continue;
                };
                if !classes.is_empty() && !classes.contains(&class) {
                    continue;
                }
                let name = top.scoped_name.as_deref().unwrap_or("<unnamed>");
                writeln!(out, "{:<16} {name}", class.as_str())?;
            }
            Ok(())
        }
    }
}
