use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use mscript_core::{serialize, CompileOutput, Session};
use serde_json::{json, Value};

use crate::{report_diagnostic, report_error, OutputFormat};

pub(crate) struct CompileArgs {
    pub files: Vec<PathBuf>,
    pub project_dir: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub stdout: bool,
    pub keep_abstract: bool,
}

/// `<out_dir or input dir>/<stem>.json`
fn output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_owned());
    let dir = match out_dir {
        Some(d) => d.to_path_buf(),
        None => input.parent().unwrap_or(Path::new("")).to_path_buf(),
    };
    dir.join(format!("{}.json", stem))
}

/// Serialize one compiled file and either print it or write it out.
/// Returns the written path, or `None` when printed.
fn emit(
    source: &Path,
    out: &CompileOutput,
    args: &CompileArgs,
) -> Result<Option<PathBuf>, String> {
    let name = source.display().to_string();
    let doc = serialize::to_json_string(&name, &out.nodes)
        .map_err(|e| format!("serialization error for {}: {}", name, e))?;
    if args.stdout {
        print!("{}", doc);
        return Ok(None);
    }
    let dest = output_path(source, args.out_dir.as_deref());
    fs::write(&dest, doc).map_err(|e| format!("cannot write {}: {}", dest.display(), e))?;
    Ok(Some(dest))
}

pub(crate) fn cmd_compile(args: &CompileArgs, output: OutputFormat, quiet: bool) {
    let paths: Vec<PathBuf> = args
        .files
        .iter()
        .map(|f| match &args.project_dir {
            Some(dir) => dir.join(f),
            None => f.clone(),
        })
        .collect();

    if let Some(dir) = &args.out_dir {
        if !args.stdout {
            if let Err(e) = fs::create_dir_all(dir) {
                report_error(
                    &format!("cannot create {}: {}", dir.display(), e),
                    output,
                    quiet,
                );
                process::exit(1);
            }
        }
    }

    let mut session = Session::new().keep_abstract(args.keep_abstract);
    let report = session.compile_batch(&paths);

    let mut failed = 0usize;
    let mut summary: Vec<Value> = Vec::new();
    for file in &report.files {
        let source = file.path.display().to_string();
        match &file.outcome {
            Ok(out) => {
                for warning in &out.warnings {
                    report_diagnostic(warning, output, quiet);
                }
                match emit(&file.path, out, args) {
                    Ok(written) => {
                        if let (Some(dest), OutputFormat::Text, false) = (&written, output, quiet)
                        {
                            println!("{} -> {}", source, dest.display());
                        }
                        summary.push(json!({
                            "source": source,
                            "output": written.map(|p| p.display().to_string()),
                            "warnings": out.warnings.len(),
                        }));
                    }
                    Err(msg) => {
                        report_error(&msg, output, quiet);
                        failed += 1;
                        summary.push(json!({ "source": source, "error": msg }));
                    }
                }
            }
            Err(e) => {
                report_diagnostic(e, output, quiet);
                failed += 1;
                summary.push(json!({ "source": source, "error": e.to_json_value() }));
            }
        }
    }

    let succeeded = report.files.len() - failed;
    match output {
        OutputFormat::Json if !args.stdout => {
            let doc = json!({
                "files": summary,
                "succeeded": succeeded,
                "failed": failed,
            });
            let pretty = serde_json::to_string_pretty(&doc)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text if !quiet => {
            eprintln!("Build: {} succeeded, {} failed", succeeded, failed);
        }
        _ => {}
    }

    if failed > 0 {
        process::exit(1);
    }
}
