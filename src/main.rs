use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use curator_core::{
    AppConfig, CoreError, ErrorExt, ErrorReporter, Interaction, Platform, Post, PostId, SortKey,
    ViewMode, DEFAULT_CONFIG_PATH,
};
use database::StoreBackend;
use feed_engine::{FeedSession, FilterOutcome, MatchTier, SessionSettings};
use llm_interface::ExpanderBackend;
use post_source::{PostSource, SourceBackend};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "feedcurator")]
#[command(about = "Rank, filter and rate a social media feed")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "FEEDCURATOR_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct ViewArgs {
    /// rank, date, likes or comments
    #[arg(long, default_value = "rank")]
    sort: SortKey,

    /// all or followed
    #[arg(long, default_value = "all")]
    view: ViewMode,

    /// twitter, instagram, facebook or unknown
    #[arg(long)]
    platform: Option<Platform>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the feed
    Feed(ViewArgs),
    /// Filter the feed by a free-text query
    Search {
        query: String,
        #[command(flatten)]
        view: ViewArgs,
    },
    Like { id: String },
    Dislike { id: String },
    /// Clear a like or dislike
    Reset { id: String },
    /// Leave written feedback on a post
    Feedback { id: String, text: String },
    /// List search suggestions
    Suggestions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Loaded configuration from {}", cli.config.display());

    if let Err(e) = run(cli.command, &config).await {
        ErrorReporter::new().report(&e);
        return Err(anyhow!(e.user_friendly_message()));
    }
    Ok(())
}

async fn run(command: Commands, config: &AppConfig) -> Result<(), CoreError> {
    let store = StoreBackend::from_config(&config.storage).await?;
    let expander = ExpanderBackend::from_config(config)?;
    let session = FeedSession::open(store, expander, SessionSettings::from_config(config)).await;

    if matches!(command, Commands::Suggestions) {
        for suggestion in session.suggestions().await {
            println!("{suggestion}");
        }
        return Ok(());
    }

    let source = SourceBackend::from_config(&config.posts)?;
    tracing::info!("Fetching posts from {}", source.location());
    let report = session.reload(source.fetch().await?).await?;
    if report.dropped > 0 {
        println!(
            "Loaded {} posts, skipped {} malformed records",
            report.loaded, report.dropped
        );
    }

    match command {
        Commands::Feed(view) => {
            apply_view(&session, &view).await;
            print_feed(&session.render().await);
        }
        Commands::Search { query, view } => {
            apply_view(&session, &view).await;
            if let Some(outcome) = session.search(&query).await {
                print_outcome(&outcome);
            }
            print_feed(&session.render().await);
        }
        Commands::Like { id } => rate(&session, &id, Interaction::Liked).await?,
        Commands::Dislike { id } => rate(&session, &id, Interaction::Disliked).await?,
        Commands::Reset { id } => rate(&session, &id, Interaction::Neutral).await?,
        Commands::Feedback { id, text } => {
            let feedback = session.record_feedback(&PostId::new(id), &text).await?;
            println!("Thanks, feedback saved for post {}", feedback.post_id);
        }
        Commands::Suggestions => {}
    }
    Ok(())
}

async fn apply_view<S, E>(session: &FeedSession<S, E>, view: &ViewArgs)
where
    S: database::KeyValueStore,
    E: llm_interface::SemanticExpander,
{
    session.set_sort(view.sort).await;
    session.set_view_mode(view.view).await;
    session.set_platform(view.platform).await;
}

async fn rate<S, E>(
    session: &FeedSession<S, E>,
    id: &str,
    interaction: Interaction,
) -> Result<(), CoreError>
where
    S: database::KeyValueStore,
    E: llm_interface::SemanticExpander,
{
    let post_id = PostId::new(id);
    session.record(&post_id, interaction).await?;
    println!("Post {} is now {}", post_id, interaction);
    Ok(())
}

fn print_outcome(outcome: &FilterOutcome) {
    match outcome.tier {
        MatchTier::All => {}
        MatchTier::Keyword => println!("{} posts match \"{}\"", outcome.ids.len(), outcome.query),
        MatchTier::Semantic => println!(
            "Related terms: {} ({} posts)",
            outcome.related_terms.join(", "),
            outcome.ids.len()
        ),
        MatchTier::NoMatch => println!("No matches for \"{}\"", outcome.query),
    }
}

fn print_feed(posts: &[Post]) {
    if posts.is_empty() {
        println!("No posts match your criteria");
        return;
    }

    for post in posts {
        let author = post.username.as_deref().unwrap_or("unknown");
        let marker = match post.interaction {
            Interaction::Liked => " [liked]",
            Interaction::Disliked => " [disliked]",
            Interaction::Neutral => "",
        };
        println!(
            "#{} {:.1} @{} ({}){}",
            post.id,
            post.rank_score,
            author,
            post.platform(),
            marker
        );
        println!("    {}", post.text);

        let count = |value: Option<u64>| value.map_or("-".to_string(), |v| v.to_string());
        let mut details = format!(
            "    likes {} | comments {} | shares {} | views {}",
            count(post.metrics.likes),
            count(post.metrics.comments),
            count(post.metrics.shares),
            count(post.metrics.views)
        );
        if !post.keywords.is_empty() {
            details.push_str(&format!(" | {}", post.keywords.join(", ")));
        }
        println!("{details}");
    }
}
