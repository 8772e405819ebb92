use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::api::dto::{CommandReq, LookupParams, LookupResponse, ScriptParams, SuggestParams, SuggestResponse};
use crate::application::{Analysis, AnalyzeUsecase, TutorSession};
use crate::config::AnalyzerConfig;
use crate::domain::decision::SuggestionEngine;
use crate::domain::language::Language;
use crate::domain::lookup;
use crate::domain::report::ReportOptions;
use crate::error::BeatcoachError;
use crate::infrastructure::{ExternalParser, JsonAstParser};
use crate::ports::SourceParser;

/// Shared by every connection thread.
pub struct ServerState {
    pub config: AnalyzerConfig,
    pub parser: Box<dyn SourceParser>,
    pub engine: SuggestionEngine,
}

impl ServerState {
    pub fn new(config: AnalyzerConfig) -> Self {
        let engine = SuggestionEngine::new(config.clone());
        Self { config, parser: Box::new(ExternalParser), engine }
    }
}

pub fn start_server(port: u16, config: AnalyzerConfig) -> Result<()> {
    let address = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&address).with_context(|| format!("Failed to bind to {}", address))?;
    info!(%address, "API server listening");
    serve(listener, Arc::new(ServerState::new(config)))
}

pub fn serve(listener: TcpListener, state: Arc<ServerState>) -> Result<()> {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    if let Err(e) = handle_connection(stream, &state) {
                        warn!(error = %e, "connection error");
                    }
                });
            }
            Err(e) => error!(error = %e, "accept error"),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, state: &ServerState) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match process_command(trimmed, state) {
            Ok(data) => json!({
                "status": "success",
                "data": data
            }),
            Err(e) => json!({
                "status": "error",
                "message": format!("{e:#}")
            }),
        };

        let response_str = serde_json::to_string(&response)?;
        stream.write_all(response_str.as_bytes())?;
        stream.write_all(b"\n")?;

        if let Ok(req) = serde_json::from_str::<CommandReq>(trimmed) {
            if req.command == "SHUTDOWN" {
                info!("shutdown requested");
                std::process::exit(0);
            }
        }
    }
    Ok(())
}

pub fn process_command(json_str: &str, state: &ServerState) -> Result<Value> {
    let req: CommandReq = serde_json::from_str(json_str).context("Invalid JSON format")?;

    match req.command.as_str() {
        "PING" => Ok(json!("PONG")),
        "ANALYZE" => handle_analyze(state, params(&req)?),
        "SUGGEST" => handle_suggest(state, params(&req)?),
        "LOOKUP" => handle_lookup(state, params(&req)?),
        "SHUTDOWN" => Ok(json!("Shutting down...")),
        _ => bail!("Unknown command: {}", req.command),
    }
}

fn params<T: DeserializeOwned>(req: &CommandReq) -> Result<T> {
    let value = req
        .params
        .clone()
        .ok_or_else(|| anyhow!("Missing params for {}", req.command))?;
    serde_json::from_value(value).with_context(|| format!("Invalid params for {}", req.command))
}

fn language(name: &str) -> Result<Language> {
    Language::from_str(name).ok_or_else(|| BeatcoachError::UnsupportedLanguage(name.to_string()).into())
}

fn analyze(state: &ServerState, script: &ScriptParams) -> Result<Analysis> {
    let language = language(&script.language)?;
    let parser: &dyn SourceParser = if script.pre_parsed { &JsonAstParser } else { state.parser.as_ref() };
    let mut usecase = AnalyzeUsecase::new(parser, &state.config);
    usecase.options = ReportOptions { features: true, variables: script.include_variables };
    Ok(usecase.run(language, &script.source, &script.timeline))
}

fn handle_analyze(state: &ServerState, script: ScriptParams) -> Result<Value> {
    let analysis = analyze(state, &script)?;
    Ok(serde_json::to_value(&analysis.report)?)
}

fn handle_suggest(state: &ServerState, params: SuggestParams) -> Result<Value> {
    let language = language(&params.script.language)?;
    if params.project.trim().is_empty() {
        bail!(BeatcoachError::InvalidRequest("project id must not be empty".into()));
    }
    for goal in params.goals {
        state.engine.add_goal(&params.project, goal);
    }

    let script = &params.script;
    let parser: &dyn SourceParser = if script.pre_parsed { &JsonAstParser } else { state.parser.as_ref() };
    let session = TutorSession::new(AnalyzeUsecase::new(parser, &state.config), &state.engine);
    let (analysis, recommendation) =
        session.on_execution(&params.project, language, &script.source, &script.timeline, &mut rand::thread_rng());

    Ok(serde_json::to_value(SuggestResponse { recommendation, overview: analysis.report.overview })?)
}

fn handle_lookup(state: &ServerState, params: LookupParams) -> Result<Value> {
    let analysis = analyze(state, &params.script)?;
    let results = lookup::lookup(&analysis.report.sound_profile, &params.key, params.output);
    Ok(serde_json::to_value(LookupResponse { results })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ServerState {
        let mut state = ServerState::new(AnalyzerConfig::default());
        state.parser = Box::new(JsonAstParser);
        state
    }

    #[test]
    fn test_ping_and_unknown_command() {
        let state = state();
        assert_eq!(process_command(r#"{"command": "PING"}"#, &state).unwrap(), json!("PONG"));
        let err = process_command(r#"{"command": "DANCE"}"#, &state).unwrap_err();
        assert!(err.to_string().contains("Unknown command"));
    }

    #[test]
    fn test_missing_params_and_bad_language() {
        let state = state();
        assert!(process_command(r#"{"command": "ANALYZE"}"#, &state).is_err());
        let req = r#"{"command": "ANALYZE", "params": {"language": "ruby", "source": "{}"}}"#;
        let err = process_command(req, &state).unwrap_err();
        assert!(err.to_string().contains("Unsupported language"));
    }

    #[test]
    fn test_suggest_requires_project() {
        let req = r#"{"command": "SUGGEST", "params": {"project": " ", "language": "python", "source": "{}"}}"#;
        let err = process_command(req, &state()).unwrap_err();
        assert!(err.to_string().contains("project id"));
    }
}
