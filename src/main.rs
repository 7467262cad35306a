use std::path::Path;
use std::process::ExitCode;

use parchment::{render, FsPartialLoader, Json, Result};

fn absolute_search_dir(template_path: &Path) -> std::path::PathBuf {
    let absolute = template_path
        .canonicalize()
        .unwrap_or_else(|_| template_path.to_path_buf());
    absolute
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from("."))
}

fn load_data(json_path: &Path) -> Result<Json> {
    let text = std::fs::read_to_string(json_path)?;
    let data = serde_json::from_str(&text)?;
    Ok(data)
}

fn run() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: {} <data.json> <template> [template ...]", args[0]);
        return ExitCode::FAILURE;
    }

    let json_path = Path::new(&args[1]);
    let data = match load_data(json_path) {
        Ok(data) => data,
        Err(e) => {
            log::error!("failed to load data from {json_path:?}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut out = String::new();
    let mut had_failure = false;
    let loader = FsPartialLoader;

    for template_arg in &args[2..] {
        let template_path = Path::new(template_arg);
        let text = match std::fs::read_to_string(template_path) {
            Ok(text) => text,
            Err(e) => {
                log::error!("failed to read template {template_path:?}: {e}");
                had_failure = true;
                continue;
            }
        };
        let search_dir = absolute_search_dir(template_path);
        if let Err(e) = render(&text, &data, &mut out, &search_dir, &loader) {
            log::error!("failed to render {template_path:?}: {e}");
            had_failure = true;
        }
    }

    print!("{out}");

    if had_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn main() -> ExitCode {
    run()
}
