use anyhow::{Context, Result};
use backend_client::{FixtureBackend, GenerativeBackend, GrpcBackendClient, SuggestionContext};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use interests::event::parse_content_type;
use interests::{
    parse_feedback_event, CandidateSuggestion, ContentType, FeedbackAction, FeedbackEvent,
    InMemoryInterestStore, InterestStore, JsonFileStore, RankedSuggestion, UserId,
};
use rand::Rng;
use server::{EngineConfig, SuggestionOrchestrator};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// suggest-engine - personalized ranking for generated recipe and FAQ suggestions
#[derive(Parser)]
#[command(name = "suggest-engine")]
#[command(about = "Learns per-user interests from feedback and re-ranks generated suggestions", long_about = None)]
struct Cli {
    /// Directory holding one interest document per user
    #[arg(short, long, default_value = "data/interests")]
    store_dir: PathBuf,

    /// Candidate fixture served when no backend address is given
    #[arg(short, long, default_value = "data/candidates.json")]
    fixture: PathBuf,

    /// Address of the generative backend (e.g. http://localhost:50061)
    #[arg(long)]
    backend_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a JSON-lines file of feedback events
    Feedback {
        /// File with one feedback event per line
        #[arg(long)]
        file: PathBuf,
    },

    /// Show a user's learned interests and confidence
    Profile {
        #[arg(long)]
        user_id: UserId,
    },

    /// Get ranked suggestions for a user
    Suggest {
        #[arg(long)]
        user_id: UserId,

        /// recipe or faq
        #[arg(long, default_value = "recipe", value_parser = parse_content_type)]
        content_type: ContentType,

        /// Description of the post's media
        #[arg(long, default_value = "")]
        media_context: String,

        /// Give up after this many milliseconds
        #[arg(long, default_value = "3000")]
        timeout_ms: u64,

        /// Show base score and bonus for each suggestion
        #[arg(long)]
        explain: bool,
    },

    /// Delete everything stored for a user (account deletion)
    Purge {
        #[arg(long)]
        user_id: UserId,
    },

    /// Run a synthetic feedback and ranking benchmark in memory
    Benchmark {
        /// Number of distinct users
        #[arg(long, default_value = "100")]
        users: usize,

        /// Number of feedback events to apply
        #[arg(long, default_value = "2000")]
        events: usize,

        /// Number of suggestion requests to make
        #[arg(long, default_value = "500")]
        requests: usize,

        /// Number of concurrent operations
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env().context("Reading PERSONALIZATION_* configuration")?;

    match &cli.command {
        Commands::Feedback { file } => {
            let orchestrator = build_orchestrator(&cli, config, false).await?;
            handle_feedback(&orchestrator, file).await?
        }
        Commands::Profile { user_id } => {
            let orchestrator = build_orchestrator(&cli, config, false).await?;
            handle_profile(&orchestrator, user_id).await
        }
        Commands::Suggest {
            user_id,
            content_type,
            media_context,
            timeout_ms,
            explain,
        } => {
            let orchestrator = build_orchestrator(&cli, config, true).await?;
            let context = SuggestionContext::new(*content_type, media_context.clone());
            handle_suggest(
                &orchestrator,
                user_id,
                context,
                Duration::from_millis(*timeout_ms),
                *explain,
            )
            .await
        }
        Commands::Purge { user_id } => {
            let orchestrator = build_orchestrator(&cli, config, false).await?;
            handle_purge(&orchestrator, user_id).await?
        }
        Commands::Benchmark {
            users,
            events,
            requests,
            concurrent,
        } => handle_benchmark(config, *users, *events, *requests, *concurrent).await?,
    }

    Ok(())
}

/// Wire the orchestrator to the file store and the chosen backend
async fn build_orchestrator(
    cli: &Cli,
    config: EngineConfig,
    needs_candidates: bool,
) -> Result<SuggestionOrchestrator> {
    let store: Arc<dyn InterestStore> = Arc::new(
        JsonFileStore::open(&cli.store_dir)
            .await
            .with_context(|| format!("Opening interest store at {}", cli.store_dir.display()))?,
    );

    let backend: Arc<dyn GenerativeBackend> = match (&cli.backend_addr, needs_candidates) {
        (Some(addr), _) => Arc::new(GrpcBackendClient::connect_lazy(addr.clone())?),
        (None, true) => Arc::new(
            FixtureBackend::load(&cli.fixture)
                .await
                .with_context(|| format!("Loading candidates from {}", cli.fixture.display()))?,
        ),
        (None, false) => Arc::new(FixtureBackend::default()),
    };

    Ok(SuggestionOrchestrator::new(config, store, backend))
}

/// Handle the 'feedback' command
async fn handle_feedback(orchestrator: &SuggestionOrchestrator, file: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Reading feedback events from {}", file.display()))?;
    let mut changes = orchestrator.subscribe();

    let start = Instant::now();
    let mut applied = 0usize;
    let mut rejected = 0usize;
    let mut unpersisted = 0usize;
    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let outcome = match parse_feedback_event(line) {
            Ok(event) => orchestrator.record_feedback(event).await.map(|_| ()),
            Err(e) => Err(e.into()),
        };
        match outcome {
            Ok(()) => applied += 1,
            Err(e) => {
                rejected += 1;
                println!("{} line {}: {}", "✗".red(), index + 1, e);
            }
        }
        while let Ok(change) = changes.try_recv() {
            if !change.persisted {
                unpersisted += 1;
            }
        }
    }

    println!(
        "{} Applied {} events in {:?}",
        "✓".green(),
        applied,
        start.elapsed()
    );
    if rejected > 0 {
        println!("{} Rejected {} malformed events", "!".yellow(), rejected);
    }
    if unpersisted > 0 {
        println!(
            "{} {} updates were kept in memory only (store write failed)",
            "!".yellow(),
            unpersisted
        );
    }
    Ok(())
}

/// Handle the 'profile' command
async fn handle_profile(orchestrator: &SuggestionOrchestrator, user_id: &str) {
    let interests = orchestrator.current_interests(user_id).await;
    let assessment = orchestrator.assess(&interests);

    println!("{}", format!("User: {}", user_id).bold().blue());
    println!("{}Confidence: {:.3}", "• ".green(), assessment.confidence);
    println!("{}Significant: {}", "• ".green(), assessment.significant);
    println!("{}Satisfaction: {:.3}", "• ".green(), interests.satisfaction_score);
    println!(
        "{}Feedback: {} positive, {} negative, {} views, {} expands",
        "• ".cyan(),
        interests.total_positive_feedback,
        interests.total_negative_feedback,
        interests.total_views,
        interests.total_expands
    );

    println!("Preferred keywords:");
    print_terms(&interests.preferred_keywords, &interests.keyword_relevance_scores, &interests.keyword_interaction_counts);
    println!("Preferred categories:");
    print_terms(&interests.preferred_categories, &interests.category_relevance_scores, &interests.category_interaction_counts);

    if !interests.recent_search_terms.is_empty() {
        println!("Recent searches: {}", interests.recent_search_terms.join(", "));
    }
    if !interests.favorite_vendors.is_empty() {
        println!("Favorite vendors: {}", interests.favorite_vendors.join(", "));
    }
    match interests.updated_at {
        Some(updated_at) => println!("Last updated: {}", updated_at.to_rfc3339()),
        None => println!("{}", "No feedback recorded yet".dimmed()),
    }
}

fn print_terms(terms: &[String], scores: &HashMap<String, f64>, counts: &HashMap<String, u32>) {
    if terms.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for term in terms {
        println!(
            "  - {}: relevance {:.2} ({} interactions)",
            term,
            scores.get(term).copied().unwrap_or(0.0),
            counts.get(term).copied().unwrap_or(0)
        );
    }
}

/// Handle the 'suggest' command
async fn handle_suggest(
    orchestrator: &SuggestionOrchestrator,
    user_id: &str,
    context: SuggestionContext,
    timeout: Duration,
    explain: bool,
) {
    let start = Instant::now();
    let ranked = orchestrator
        .request_suggestions(user_id, context, timeout)
        .await;

    if ranked.is_empty() {
        println!("{}", "No suggestions available".yellow());
        return;
    }
    print_suggestions(&ranked, explain);
    println!("{}", format!("Ranked in {:?}", start.elapsed()).dimmed());
}

/// Handle the 'purge' command
async fn handle_purge(orchestrator: &SuggestionOrchestrator, user_id: &str) -> Result<()> {
    orchestrator
        .purge_user(user_id)
        .await
        .with_context(|| format!("Purging interests for user {}", user_id))?;
    println!("{} Purged interests for user {}", "✓".green(), user_id);
    Ok(())
}

const BENCH_KEYWORDS: [&str; 24] = [
    "tomato", "basil", "garlic", "onion", "pepper", "lemon", "rice", "noodle", "miso", "ginger",
    "chili", "butter", "flour", "yeast", "cheese", "egg", "salmon", "tofu", "mushroom", "kale",
    "honey", "vanilla", "cumin", "lime",
];

const BENCH_CATEGORIES: [&str; 6] = ["produce", "bakery", "dairy", "seafood", "pantry", "spices"];

/// Handle the 'benchmark' command
async fn handle_benchmark(
    config: EngineConfig,
    users: usize,
    events: usize,
    requests: usize,
    concurrent: usize,
) -> Result<()> {
    let users = users.max(1);
    let concurrent = concurrent.max(1);

    let (candidates, feedback, request_users) = {
        let mut rng = rand::rng();
        let candidates: Vec<CandidateSuggestion> = (0..200)
            .map(|i| {
                let content_type = if i % 3 == 0 { ContentType::Faq } else { ContentType::Recipe };
                CandidateSuggestion::new(format!("cand-{i}"), content_type, rng.random::<f64>())
                    .with_keywords(random_keywords(&mut rng))
                    .with_category(BENCH_CATEGORIES[rng.random_range(0..BENCH_CATEGORIES.len())])
            })
            .collect();
        let feedback: Vec<FeedbackEvent> = (0..events)
            .map(|_| random_event(&mut rng, users))
            .collect();
        let request_users: Vec<UserId> = (0..requests)
            .map(|_| format!("user-{}", rng.random_range(0..users)))
            .collect();
        (candidates, feedback, request_users)
    };

    let orchestrator = Arc::new(SuggestionOrchestrator::new(
        config,
        Arc::new(InMemoryInterestStore::new()),
        Arc::new(FixtureBackend::new(candidates)),
    ));

    // Feedback phase
    let wall = Instant::now();
    let mut timings = Vec::with_capacity(feedback.len());
    for chunk in feedback.chunks(concurrent) {
        let mut handles = vec![];
        for event in chunk.iter().cloned() {
            let orchestrator = Arc::clone(&orchestrator);
            handles.push(tokio::spawn(async move {
                let start = Instant::now();
                orchestrator.record_feedback(event).await?;
                Ok::<_, anyhow::Error>(start.elapsed())
            }));
        }
        for handle in handles {
            timings.push(handle.await??);
        }
    }
    print_latencies("Feedback", timings, wall.elapsed());

    // Request phase
    let wall = Instant::now();
    let mut timings = Vec::with_capacity(request_users.len());
    let mut returned = 0usize;
    for chunk in request_users.chunks(concurrent) {
        let mut handles = vec![];
        for user_id in chunk.iter().cloned() {
            let orchestrator = Arc::clone(&orchestrator);
            handles.push(tokio::spawn(async move {
                let start = Instant::now();
                let context = SuggestionContext::new(ContentType::Recipe, "market haul");
                let ranked = orchestrator
                    .request_suggestions(&user_id, context, Duration::from_secs(3))
                    .await;
                (start.elapsed(), ranked.len())
            }));
        }
        for handle in handles {
            let (elapsed, count) = handle.await?;
            timings.push(elapsed);
            returned += count;
        }
    }
    print_latencies("Suggestions", timings, wall.elapsed());
    println!("Suggestions returned: {}", returned);

    let stats = orchestrator.cache_stats();
    println!(
        "Cache: {} entries, {} hits, {} misses ({:.1}% hit rate), {} evictions",
        stats.entries,
        stats.hits,
        stats.misses,
        stats.hit_rate() * 100.0,
        stats.evictions
    );
    Ok(())
}

fn random_keywords(rng: &mut impl Rng) -> Vec<String> {
    let count = rng.random_range(1..=4);
    (0..count)
        .map(|_| BENCH_KEYWORDS[rng.random_range(0..BENCH_KEYWORDS.len())].to_string())
        .collect()
}

fn random_event(rng: &mut impl Rng, users: usize) -> FeedbackEvent {
    let action = match rng.random_range(0..10) {
        0..=3 => FeedbackAction::View,
        4..=5 => FeedbackAction::Expand,
        6..=8 => FeedbackAction::Upvote,
        _ => FeedbackAction::Downvote,
    };
    FeedbackEvent {
        user_id: format!("user-{}", rng.random_range(0..users)),
        content_type: ContentType::Recipe,
        keywords: random_keywords(rng),
        category: Some(BENCH_CATEGORIES[rng.random_range(0..BENCH_CATEGORIES.len())].to_string()),
        action,
        timestamp: Utc::now(),
        search_term: None,
        vendor_id: rng
            .random_bool(0.2)
            .then(|| format!("vendor-{}", rng.random_range(0..20))),
    }
}

/// Print total, average and percentile latencies plus throughput
fn print_latencies(label: &str, mut timings: Vec<Duration>, wall: Duration) {
    if timings.is_empty() {
        println!("{}: no operations", label);
        return;
    }
    timings.sort();
    let percentile = |p: f64| {
        let index = ((timings.len() as f64 * p) as usize).min(timings.len() - 1);
        timings[index]
    };
    let total: Duration = timings.iter().sum();
    let average = total / timings.len() as u32;

    println!("{}", format!("{} benchmark:", label).bold().blue());
    println!("  Operations: {}", timings.len());
    println!("  Wall time: {:?}", wall);
    println!("  Average latency: {:?}", average);
    println!("  P50 latency: {:?}", percentile(0.50));
    println!("  P95 latency: {:?}", percentile(0.95));
    println!("  P99 latency: {:?}", percentile(0.99));
    println!(
        "  Throughput: {:.2} ops/second",
        timings.len() as f64 / wall.as_secs_f64().max(f64::EPSILON)
    );
}

/// Format and print ranked suggestions
fn print_suggestions(ranked: &[RankedSuggestion], explain: bool) {
    println!("{}", "Suggestions:".bold().blue());
    for (index, item) in ranked.iter().enumerate() {
        let suggestion = &item.suggestion;
        let title = ["title", "question"]
            .iter()
            .find_map(|field| suggestion.payload.get(*field).and_then(|v| v.as_str()))
            .unwrap_or(suggestion.id.as_str());
        println!(
            "{}. {} [{}] - Score: {:.2}",
            (index + 1).to_string().green(),
            title,
            suggestion.content_type,
            item.final_score
        );
        if explain {
            println!(
                "   base {:.2} + bonus {:.3}; keywords: {}; category: {}",
                suggestion.base_relevance_score,
                item.applied_bonus,
                suggestion.keywords.join(", "),
                suggestion.category.as_deref().unwrap_or("-")
            );
        }
    }
}
