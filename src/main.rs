use clap::Parser;
use infostream::{
    ModelManager,
    Settings,
    Taxonomy,
    chunking,
    cli::{Cli, Command, SearchArgs},
    error,
    model_manager::HF_ENDPOINT_ENV_VAR,
    pipeline,
    search::{self, CategoryFilter, SearchRequest},
    web::{self, AppState},
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("INFOSTREAM_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let settings = resolve_settings(&cli)?;
    let models = resolve_models(&cli);

    match cli.command {
        Command::Serve(args) => {
            web::run_server(&args.bind, AppState::new(settings, models))?;
        }
        Command::Search(args) => {
            cmd_search(settings, &models, &args, cli.quiet)?;
        }
        Command::Categories(args) => cmd_categories(&settings, args.json)?,
        Command::Status(args) => cmd_status(&settings, &models, args.json)?,
        Command::Completions(_) => {}
    }

    Ok(())
}

fn resolve_settings(cli: &Cli) -> error::Result<Settings> {
    let taxonomy = match &cli.taxonomy {
        Some(path) => Taxonomy::load(path)?,
        None => Taxonomy::default(),
    };
    // Reject a bad pattern before anything is loaded.
    infostream::walker::compile_glob(&cli.glob)?;

    Ok(Settings {
        glob: cli.glob.clone(),
        taxonomy,
        show_default_category: cli.show_uncategorized,
        ..Settings::with_docs_dir(&cli.docs_dir)
    })
}

fn resolve_models(cli: &Cli) -> ModelManager {
    let models = match &cli.model {
        Some(id) => ModelManager::with_model_id(id.clone())
            .endpoint(std::env::var(HF_ENDPOINT_ENV_VAR).ok()),
        None => ModelManager::new(),
    };
    models.cache_dir(cli.cache_dir.clone())
}

fn cmd_search(
    mut settings: Settings,
    models: &ModelManager,
    args: &SearchArgs,
    quiet: bool,
) -> error::Result<()> {
    settings.fetch_k = args.fetch_k;
    settings.display_count = args.count;
    settings.show_progress = !args.json && !quiet;

    let archive = pipeline::build_archive(&settings, || models.load());
    if let pipeline::BuildStatus::Degraded(reason) = &archive.status {
        eprintln!("Warning: search unavailable: {reason}");
    }

    let request = SearchRequest::new(
        args.query.clone(),
        CategoryFilter::parse(args.category.as_deref()),
        &settings,
    )
    .triggered(true);
    let outcome = search::execute_search(&archive, &request)?;

    if args.json {
        search::format_json(&outcome, &request)?;
    } else {
        search::format_human(&outcome);
    }
    Ok(())
}

#[derive(Serialize)]
struct CategoryCount<'a> {
    label: &'a str,
    documents: usize,
    navigable: bool,
}

fn cmd_categories(settings: &Settings, json: bool) -> error::Result<()> {
    let documents = if settings.docs_dir.is_dir() {
        pipeline::scan_documents(settings)?
    } else {
        Vec::new()
    };
    let navigable = settings.display_categories();
    let labels = settings.taxonomy.labels();

    let counts: Vec<CategoryCount> = labels
        .iter()
        .map(|label| CategoryCount {
            label,
            documents: infostream::ingestion::count_in_category(
                &documents, label,
            ),
            navigable: navigable.contains(label),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string(&counts)?);
    } else {
        for c in &counts {
            let marker = if c.navigable { "" } else { " (hidden)" };
            println!("{:>6}  {}{marker}", c.documents, c.label);
        }
        println!("{:>6}  total", documents.len());
    }
    Ok(())
}

fn cmd_status(
    settings: &Settings,
    models: &ModelManager,
    json: bool,
) -> error::Result<()> {
    let exists = settings.docs_dir.is_dir();
    let documents = if exists {
        pipeline::scan_documents(settings)?
    } else {
        Vec::new()
    };
    let chunks = chunking::split_documents(&documents, settings.chunking).len();

    if json {
        let status = serde_json::json!({
            "docs_dir": settings.docs_dir.display().to_string(),
            "docs_dir_exists": exists,
            "glob": settings.glob,
            "model": models.model_id(),
            "hub_endpoint": models.hub_endpoint(),
            "documents": documents.len(),
            "chunks": chunks,
        });
        println!("{status}");
    } else {
        println!("Docs directory: {}", settings.docs_dir.display());
        if !exists {
            println!("  (missing; created on first search)");
        }
        println!("Glob: {}", settings.glob);
        println!("Model: {}", models.model_id());
        if let Some(endpoint) = models.hub_endpoint() {
            println!("Hub endpoint: {endpoint}");
        }
        println!("Documents: {}", documents.len());
        println!("Chunks: {chunks}");
    }
    Ok(())
}
