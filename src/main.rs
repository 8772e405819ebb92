// Command-line entry point for Beatcoach.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use beatcoach::api::server;
use beatcoach::application::{AnalyzeUsecase, TutorSession};
use beatcoach::config::AnalyzerConfig;
use beatcoach::domain::decision::{Goal, SuggestionEngine};
use beatcoach::domain::language::Language;
use beatcoach::domain::report::ReportOptions;
use beatcoach::domain::timeline::Timeline;
use beatcoach::infrastructure::concurrency;
use beatcoach::infrastructure::project_loader::ProjectLoader;
use beatcoach::infrastructure::{ExternalParser, JsonAstParser, JsonReportExporter};
use beatcoach::ports::{ReportExporter, SourceParser};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Analyzer configuration (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one script and its rendered timeline
    Analyze {
        #[command(flatten)]
        script: ScriptArgs,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include the variable registry in the report
        #[arg(long)]
        variables: bool,
    },
    /// Analyze every script under a folder in parallel
    Batch {
        /// Folder to scan for .py and .js scripts
        #[arg(short = 'd', long)]
        folder: PathBuf,

        /// Folder for `<name>.report.json` files
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Analyze a script and print one recommendation
    Suggest {
        #[command(flatten)]
        script: ScriptArgs,

        /// Project id; defaults to the script's file stem
        #[arg(long)]
        project: Option<String>,

        /// Complexity goal as `category.feature=level` (repeatable)
        #[arg(long = "goal")]
        goals: Vec<String>,
    },
    /// Run the JSON-lines command server
    Serve {
        #[arg(short, long, default_value_t = 4599)]
        port: u16,
    },
}

#[derive(Args, Debug)]
struct ScriptArgs {
    /// Script file (.py or .js), or a foreign AST with --pre-parsed
    #[arg(short, long)]
    script: PathBuf,

    /// Rendered timeline JSON; defaults to `<stem>.timeline.json` next to the script
    #[arg(short, long)]
    timeline: Option<PathBuf>,

    /// Script language when it cannot be inferred from the extension
    #[arg(short, long)]
    language: Option<String>,

    /// The script file already holds the foreign AST as JSON
    #[arg(long)]
    pre_parsed: bool,
}

struct LoadedScript {
    name: String,
    language: Language,
    source: String,
    timeline: Timeline,
}

impl ScriptArgs {
    fn load(&self) -> Result<LoadedScript> {
        let language = match &self.language {
            Some(name) => Language::from_str(name).with_context(|| format!("Unsupported language: {name}"))?,
            None => Language::from_path(&self.script)
                .with_context(|| format!("Cannot infer language of {}; pass --language", self.script.display()))?,
        };
        let source = fs::read_to_string(&self.script)
            .with_context(|| format!("Failed to read {}", self.script.display()))?;
        let timeline = match &self.timeline {
            Some(path) => ProjectLoader::load_timeline(path)?,
            None => {
                let sibling = ProjectLoader::timeline_path_for(&self.script);
                if sibling.is_file() {
                    ProjectLoader::load_timeline(&sibling)?
                } else {
                    warn!(script = %self.script.display(), "no timeline found, analyzing code only");
                    Timeline::default()
                }
            }
        };
        let name = self
            .script
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(LoadedScript { name, language, source, timeline })
    }

    fn parser(&self) -> &'static dyn SourceParser {
        if self.pre_parsed {
            &JsonAstParser
        } else {
            &ExternalParser
        }
    }
}

fn parse_goal(text: &str) -> Result<Goal> {
    let (path, level) = text.split_once('=').with_context(|| format!("Goal must look like category.feature=level: {text}"))?;
    let (category, feature) = path
        .split_once('.')
        .with_context(|| format!("Goal must look like category.feature=level: {text}"))?;
    let level = level.trim().parse().with_context(|| format!("Invalid goal level in {text}"))?;
    Ok(Goal { category: category.trim().to_string(), feature: feature.trim().to_string(), level })
}

fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig> {
    match path {
        Some(path) => AnalyzerConfig::load(path).with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AnalyzerConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Analyze { script, output, variables } => {
            let loaded = script.load()?;
            let mut usecase = AnalyzeUsecase::new(script.parser(), &config);
            usecase.options = ReportOptions { features: true, variables };
            let analysis = usecase.run(loaded.language, &loaded.source, &loaded.timeline);

            let exporter = JsonReportExporter { pretty: true };
            match output {
                Some(path) => {
                    exporter.export(&analysis.report, &path)?;
                    info!(output = %path.display(), "report written");
                }
                None => println!("{}", exporter.render(&analysis.report)?),
            }
        }
        Command::Batch { folder, output } => {
            concurrency::init_thread_pool()?;
            let projects = ProjectLoader::discover(&folder)?;
            if projects.is_empty() {
                bail!("No .py or .js scripts found under {}", folder.display());
            }
            fs::create_dir_all(&output).with_context(|| format!("Failed to create {}", output.display()))?;

            let exporter = JsonReportExporter { pretty: true };
            let written: Result<Vec<PathBuf>> = projects
                .par_iter()
                .map(|project| -> Result<PathBuf> {
                    let usecase = AnalyzeUsecase::new(&ExternalParser, &config);
                    let analysis = usecase.run(project.language, &project.source, &project.timeline);
                    let path = output.join(format!("{}.report.json", project.name));
                    exporter.export(&analysis.report, &path)?;
                    Ok(path)
                })
                .collect();
            info!(reports = written?.len(), output = %output.display(), "batch analysis completed");
        }
        Command::Suggest { script, project, goals } => {
            let loaded = script.load()?;
            let project = project.unwrap_or(loaded.name);
            let engine = SuggestionEngine::new(config.clone());
            for goal in &goals {
                engine.add_goal(&project, parse_goal(goal)?);
            }
            let session = TutorSession::new(AnalyzeUsecase::new(script.parser(), &config), &engine);
            let (_, recommendation) = session.on_execution(
                &project,
                loaded.language,
                &loaded.source,
                &loaded.timeline,
                &mut rand::thread_rng(),
            );
            println!("{}", serde_json::to_string_pretty(&recommendation)?);
        }
        Command::Serve { port } => server::start_server(port, config)?,
    }

    Ok(())
}
