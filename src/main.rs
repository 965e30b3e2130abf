//! Command line front end for inspecting a reference-data mirror.
//!
//! ```text
//! fieldref codes <code-list> [parent-item]
//! fieldref taxa <taxonomy> <criterion> <text> [max-results]
//! ```
//!
//! The database, survey and languages come from `fieldref.toml` and
//! `FIELDREF_*` environment variables. Results are printed as JSON.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fieldref::codelist::CodeListLoader;
use fieldref::error::{FieldrefError, Result};
use fieldref::interface::{ProgressListener, SearchCoordinator};
use fieldref::model::{CodeList, SearchCriterion, SearchRequest, Survey};
use fieldref::persist::Store;
use fieldref::settings::Settings;

const USAGE: &str = "usage:
    fieldref codes <code-list> [parent-item]
    fieldref taxa <taxonomy> <criterion> <text> [max-results]";

struct LogProgress;
impl ProgressListener for LogProgress {
    fn shown(&mut self, field: &str) {
        info!(%field, "searching");
    }
    fn dismissed(&mut self, field: &str) {
        info!(%field, "search finished");
    }
}

fn main() -> ExitCode {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = match args.first().map(String::as_str) {
        Some("codes") => codes(&settings, &args[1..]),
        Some("taxa") => taxa(&settings, &args[1..]),
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };
    match outcome {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| FieldrefError::Config(format!("{what} must be a number, got '{value}'")))
}

fn survey(settings: &Settings) -> Arc<Survey> {
    Arc::new(Survey::new(
        settings.survey,
        settings.work_mode,
        settings.languages.clone(),
    ))
}

fn codes(settings: &Settings, args: &[String]) -> Result<String> {
    let [list, rest @ ..] = args else {
        return Err(FieldrefError::Config(USAGE.to_owned()));
    };
    let code_list = CodeList::new(parse_number(list, "code list")?, list.clone(), survey(settings));
    let parent = rest
        .first()
        .map(|p| parse_number(p, "parent item"))
        .transpose()?;
    let loader = CodeListLoader::new(Store::open(&settings.database))
        .with_version_filter(settings.apply_version_filter);
    let items = loader.load_child_items(&code_list, parent, None)?;
    serde_json::to_string_pretty(&items).map_err(|e| FieldrefError::Query(e.to_string()))
}

fn taxa(settings: &Settings, args: &[String]) -> Result<String> {
    let [taxonomy, criterion, text, rest @ ..] = args else {
        return Err(FieldrefError::Config(USAGE.to_owned()));
    };
    let max_results = match rest.first() {
        Some(max) => parse_number(max, "max results")?,
        None => settings.max_results,
    };
    let request = SearchRequest::new(
        "cli",
        SearchCriterion::from(criterion.as_str()),
        settings.survey,
        taxonomy.clone(),
        text.clone(),
        max_results,
    );
    let mut coordinator = SearchCoordinator::new(Store::open(&settings.database))
        .with_timeout(settings.query_timeout())
        .with_progress(Box::new(LogProgress));
    let (sender, receiver) = std::sync::mpsc::channel();
    coordinator.start_search(request, move |_, outcome| {
        let _ = sender.send(outcome);
    });
    // the worker enforces the query timeout, this only bounds the wait
    let wait = settings.query_timeout().unwrap_or(Duration::from_secs(60)) + Duration::from_secs(1);
    if !coordinator.dispatch_next(wait) {
        return Err(FieldrefError::QueryTimeout {
            elapsed_ms: wait.as_millis(),
        });
    }
    let found = receiver
        .try_recv()
        .map_err(|e| FieldrefError::Query(e.to_string()))??;
    serde_json::to_string_pretty(&found).map_err(|e| FieldrefError::Query(e.to_string()))
}
