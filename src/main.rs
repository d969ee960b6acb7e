use std::path::Path;

use anyhow::{Context, Result};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use log::info;
use structopt::StructOpt;

use f90asr::asr::{verify, AsrDump, SymbolKind};
use f90asr::config::{parse_directives, SemaSettings};
use f90asr::diagnostics;
use f90asr::errors::CompileErrorKind;
use f90asr::modfile::{self, FsModuleLoader};
use f90asr::{ast, ast_to_asr, Analysis};

mod cli;

fn read_file_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn settings_for(args: &cli::Cli, source: Option<&str>) -> SemaSettings {
    let mut settings = SemaSettings {
        wall: args.wall,
        werror: args.werror,
        overload_policy: args.overload_policy,
        module_paths: args.module_paths.clone(),
        lower_array_intrinsics: !args.no_lower,
        default_implicit_typing: args.implicit_typing,
        ..SemaSettings::default()
    };
    if let Some(src) = source {
        settings.merge(parse_directives(src));
    }
    if settings.module_paths.is_empty() {
        settings.module_paths.push(".".into());
    }
    settings
}

/// Runs the semantic passes over one tree and reports every diagnostic.
/// Exits with status 1 when there is an error.
fn analyze(args: &cli::Cli, input: &Path) -> Result<Analysis> {
    let json = read_file_to_string(input)?;
    let unit: ast::TranslationUnit =
        serde_json::from_str(&json).with_context(|| format!("{} is not a valid syntax tree", input.display()))?;
    let source = match &args.source {
        Some(path) => Some(read_file_to_string(path)?),
        None => None,
    };
    let settings = settings_for(args, source.as_deref());
    let file_name = args
        .source
        .as_deref()
        .unwrap_or(input)
        .to_str()
        .unwrap_or("<unknown>")
        .to_string();
    let file = source.as_deref().map(|src| SimpleFile::new(file_name.as_str(), src));
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);

    let mut loader = FsModuleLoader::new(settings.module_paths.clone());
    let analysis = match ast_to_asr(&unit, &mut loader, &settings) {
        Ok(a) => a,
        Err(e) => {
            diagnostics::emit_semantic_error(&e, &mut stderr, file.as_ref());
            std::process::exit(1);
        }
    };
    let findings = diagnostics::classify(&analysis.lints, &settings);
    diagnostics::emit(&findings, &mut stderr, file.as_ref());
    if findings.iter().any(|f| f.kind == CompileErrorKind::Semantic) {
        std::process::exit(1);
    }
    Ok(analysis)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::Cli::from_args();

    match args.cmd.clone() {
        cli::Command::Check { input } => {
            let analysis = analyze(&args, &input)?;
            if analysis.lints.is_empty() && !args.quiet {
                println!("No problems found.");
            }
        }
        cli::Command::Asr { input, verify: check } => {
            let analysis = analyze(&args, &input)?;
            if check {
                if let Err(problems) = verify::verify(&analysis.asr) {
                    for p in &problems {
                        eprintln!("{}", p);
                    }
                    anyhow::bail!("the ASR of {} is inconsistent", input.display());
                }
            }
            print!("{}", AsrDump(&analysis.asr));
        }
        cli::Command::EmitMod { input, out } => {
            let analysis = analyze(&args, &input)?;
            std::fs::create_dir_all(&out).with_context(|| format!("failed to create {}", out.display()))?;
            let asr = &analysis.asr;
            let mut written = 0;
            for (_, id) in asr.scope(asr.root).iter() {
                let SymbolKind::Module(m) = &asr.symbol(id).kind else {
                    continue;
                };
                if m.intrinsic || m.loaded_from_mod {
                    continue;
                }
                let path = modfile::save_module(asr, id, &out)?;
                info!("wrote {}", path.display());
                if !args.quiet {
                    println!("Wrote module: {}", path.display());
                }
                written += 1;
            }
            if written == 0 && !args.quiet {
                println!("No modules in {}", input.display());
            }
        }
    }
    Ok(())
}
