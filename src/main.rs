//! uniongen CLI - Command-line interface
//!
//! Commands:
//!   generate - Synthesize union sources from a manifest
//!   validate - Validate a manifest
//!   list     - Report declarations and their layout
//!   schema   - Print the JSON schema of the manifest format

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use uniongen::*;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "generate" => cmd_generate(&args[2..]),
        "validate" => cmd_validate(&args[2..]),
        "list" => cmd_list(&args[2..]),
        "schema" => cmd_schema(),
        "version" | "--version" | "-v" => {
            println!("uniongen {}", VERSION);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            Err("Unknown command".into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"
uniongen - Declarative discriminated-union synthesis

USAGE:
    uniongen <COMMAND> [OPTIONS]

COMMANDS:
    generate <manifest.yaml>         Synthesize union sources from a manifest
    validate <manifest.yaml>         Validate a manifest
    list <manifest.yaml>             Report declarations and their layout
    schema                           Print the JSON schema of the manifest format
    version                          Print version

OPTIONS:
    --out <dir>                      Write generated files under <dir> (default: stdout)
    --json                           JSON output format (generate, list)
    --no-support                     Skip the runtime support sources
    --no-provenance                  Omit the provenance header
    --timestamp                      Include a generation timestamp (not reproducible)

EXAMPLES:
    uniongen generate unions.yaml --out Assets/Generated
    uniongen list unions.yaml
    uniongen validate unions.yaml
    uniongen schema > manifest.schema.json
"#
    );
}

fn cmd_generate(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Err("Usage: uniongen generate <manifest.yaml> [--out <dir>]".into());
    }

    let manifest = load_manifest(&args[0])?;
    for issue in manifest.validate() {
        eprintln!("{}", issue);
    }

    let options = GenerateOptions {
        provenance: !flag(args, "--no-provenance"),
        timestamp: flag(args, "--timestamp"),
        support: !flag(args, "--no-support"),
    };
    let files = generate_with(&manifest, &options);

    if let Some(dir) = parse_out_arg(args) {
        for file in &files {
            let path = dir.join(&file.path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(Error::Io)?;
            }
            fs::write(&path, &file.code).map_err(Error::Io)?;
            eprintln!("Written: {}", path.display());
        }
    } else if flag(args, "--json") {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else {
        for file in &files {
            println!("// FILE: {}", file.path);
            println!("{}", file.code);
        }
    }

    Ok(())
}

fn cmd_validate(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Err("Usage: uniongen validate <manifest.yaml>".into());
    }

    let manifest = load_manifest(&args[0])?;
    let issues = manifest.validate();

    if issues.is_empty() {
        println!("OK: {} declaration(s)", manifest.declarations.len());
        return Ok(());
    }

    for issue in &issues {
        println!("{}", issue);
    }

    let errors = issues.iter().filter(|i| !i.starts_with("Warning:")).count();
    if errors > 0 {
        Err(format!("{} error(s)", errors).into())
    } else {
        Ok(())
    }
}

fn cmd_list(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Err("Usage: uniongen list <manifest.yaml>".into());
    }

    let manifest = load_manifest(&args[0])?;
    let reports = report(&manifest);

    if flag(args, "--json") {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for entry in &reports {
        match &entry.status {
            DeclarationStatus::Union {
                variants,
                tag_width,
                payload_size,
                policy,
                path,
            } => {
                println!(
                    "{:<24} union  {} variant(s), {}-bit tag, {} byte payload, {} -> {}",
                    entry.name,
                    variants,
                    tag_width.bits(),
                    payload_size,
                    policy.label(),
                    path
                );
            }
            DeclarationStatus::Skipped { reason } => {
                println!("{:<24} skip   {}", entry.name, reason);
            }
        }
    }

    Ok(())
}

fn cmd_schema() -> Result<()> {
    let schema = schemars::schema_for!(Manifest);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn load_manifest(path: &str) -> Result<Manifest> {
    let content = fs::read_to_string(path).map_err(Error::Io)?;
    if path.ends_with(".json") {
        Manifest::from_json(&content)
    } else {
        Manifest::from_yaml(&content)
    }
}

fn flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn parse_out_arg(args: &[String]) -> Option<PathBuf> {
    for (i, arg) in args.iter().enumerate() {
        if arg == "--out" || arg == "-o" {
            if let Some(path) = args.get(i + 1) {
                return Some(PathBuf::from(path));
            }
        }
    }
    None
}
