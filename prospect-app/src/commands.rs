use std::io::Read;

use anyhow::{Context, Result};
use prospect_config::ProspectConfig;
use prospect_core::{build_inferencer, build_orchestrator, DiscoveryOptions};
use prospect_extract::EmailExtractor;
use prospect_store::{ResultStore, SaveOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{Command, ExtractArgs, InferArgs, SearchArgs, StatsArgs};
use crate::{render, wiring};

pub async fn run(command: Command, cfg: ProspectConfig) -> Result<()> {
    match command {
        Command::Search(args) => search(args, cfg).await,
        Command::Extract(args) => extract(args),
        Command::Infer(args) => infer(args, cfg).await,
        Command::Stats(args) => stats(args, cfg).await,
        Command::Config => {
            print!("{}", cfg.to_redacted_yaml()?);
            Ok(())
        }
    }
}

async fn search(args: SearchArgs, cfg: ProspectConfig) -> Result<()> {
    let use_ai = args.ai || cfg.inference.use_ai;
    let assistant = wiring::build_assistant(&cfg, use_ai).await;
    let orchestrator = build_orchestrator(&cfg, assistant)?;

    let cancel = CancellationToken::new();
    wiring::cancel_on_signal(cancel.clone());

    let options = DiscoveryOptions {
        limit: args.limit.unwrap_or(cfg.search.limit),
        search_engine: args.engine.unwrap_or(cfg.search.engine),
        use_ai,
        demo: args.demo,
    };
    let outcome = orchestrator
        .search_and_extract(&args.profile, options, &cancel)
        .await;
    if let Err(e) = orchestrator.shutdown().await {
        warn!(target: "app", error = %e, "browser.shutdown_failed");
    }
    cancel.cancel();
    let report = outcome?;

    if args.save && !report.results.is_empty() {
        let store = wiring::open_store(&cfg).await?;
        let (mut inserted, mut duplicate, mut skipped) = (0, 0, 0);
        for r in &report.results {
            match store.save(r).await? {
                SaveOutcome::Inserted => inserted += 1,
                SaveOutcome::Duplicate => duplicate += 1,
                SaveOutcome::Skipped => skipped += 1,
            }
        }
        info!(target: "app", inserted, duplicate, skipped, "results.saved");
        if !args.json {
            eprintln!("saved {inserted}, already stored {duplicate}, demo rows not saved {skipped}");
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render::report(&report));
    }
    Ok(())
}

fn extract(args: ExtractArgs) -> Result<()> {
    let mut input = String::new();
    match &args.file {
        Some(path) => {
            input = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
        }
        None => {
            std::io::stdin()
                .read_to_string(&mut input)
                .context("reading stdin")?;
        }
    }

    let extractor = EmailExtractor::new().context("compiling email patterns")?;
    let provider = args.provider.as_deref();
    let emails = if args.text {
        extractor.extract_text(&input, provider)
    } else {
        extractor.extract(&input, provider)
    };
    for email in emails {
        println!("{email}");
    }
    Ok(())
}

async fn infer(args: InferArgs, cfg: ProspectConfig) -> Result<()> {
    let use_ai = args.ai || cfg.inference.use_ai;
    let assistant = wiring::build_assistant(&cfg, use_ai).await;
    let inferencer = build_inferencer(&cfg, assistant)?;
    let names = inferencer.infer_many(&args.emails, use_ai).await;

    if args.json {
        let rows: Vec<_> = args
            .emails
            .iter()
            .zip(&names)
            .map(|(email, name)| serde_json::json!({ "email": email, "inference": name }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", render::inferences(&args.emails, &names));
    }
    Ok(())
}

async fn stats(args: StatsArgs, cfg: ProspectConfig) -> Result<()> {
    let store = wiring::open_store(&cfg).await?;
    match args.profile {
        Some(profile) => {
            let rows = store.find_by_profile(&profile, args.limit).await?;
            let mut out = String::new();
            render::results(&mut out, &rows);
            if rows.is_empty() {
                out.push_str("no stored results for this profile\n");
            }
            print!("{out}");
        }
        None => {
            let total = store.count().await?;
            let by_profile = store.count_by_profile().await?;
            let by_engine = store.count_by_search_engine().await?;
            print!("{}", render::tallies(total, &by_profile, &by_engine));
        }
    }
    Ok(())
}
