use clap::{Parser, Subcommand};
use goal_match_engine::store::{CardFilter, PageRequest};
use goal_match_engine::{ContactMethod, GoalType, MatchEngine, NewGoalCard, SkillLevel, Vibe};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "goal-match-cli")]
#[command(about = "Goal card matchmaking CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database path
    #[arg(short, long, default_value = "goalcards.db")]
    db: String,

    /// Acting user id
    #[arg(short, long, default_value = "cli")]
    user: String,
}

#[derive(clap::Args)]
struct CardArgs {
    /// BUILD, LEARN or SOLVE
    #[arg(long, default_value = "BUILD")]
    goal: String,

    /// BEGINNER, INTERMEDIATE or ADVANCED
    #[arg(long, default_value = "BEGINNER")]
    skill: String,

    /// CASUAL, FOCUSED or INTENSE
    #[arg(long, default_value = "CASUAL")]
    vibe: String,

    /// Tech tag (repeatable, 1-5)
    #[arg(short, long = "tag", required = true)]
    tags: Vec<String>,

    /// Short description (max 150 characters)
    #[arg(long)]
    description: String,

    /// DISCORD, TELEGRAM or LINKEDIN
    #[arg(long, default_value = "DISCORD")]
    contact_method: String,

    #[arg(long)]
    contact: String,

    /// Timezone label, e.g. "GMT+5:30"
    #[arg(long)]
    timezone: Option<String>,

    /// Availability slot (repeatable), e.g. MON_EVENING
    #[arg(long = "slot")]
    slots: Vec<String>,
}

impl CardArgs {
    fn into_card(self) -> NewGoalCard {
        NewGoalCard {
            goal_type: GoalType::from(self.goal.as_str()),
            skill_level: SkillLevel::from(self.skill.as_str()),
            vibe: Vibe::from(self.vibe.as_str()),
            tech_tags: self.tags,
            description: self.description,
            contact_method: ContactMethod::from(self.contact_method.as_str()),
            contact_handle: self.contact,
            email: None,
            timezone: self.timezone,
            availability: if self.slots.is_empty() { None } else { Some(self.slots) },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Post a card and show its matches
    Post(CardArgs),

    /// Preview matches without posting
    Matches(CardArgs),

    /// Show the score breakdown of one stored card against another
    Explain {
        card_id: Uuid,
        candidate_id: Uuid,
    },

    /// List recent cards
    List {
        #[arg(long)]
        goal: Option<String>,

        #[arg(long)]
        skill: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "10")]
        per_page: u32,
    },

    /// Issue a relist token for one of your cards
    RelistToken { card_id: Uuid },

    /// Redeem a relist token
    Relist { token: String },

    /// Delete one of your cards
    Delete { card_id: Uuid },

    /// Get store statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let engine = MatchEngine::new(&cli.db).await?;

    match cli.command {
        Commands::Post(args) => {
            let submitted = engine.submit_card(&cli.user, args.into_card()).await?;

            println!("Posted: {}", submitted.card.id);
            println!("   {}", submitted.card.summary());
            print_matches(&submitted.matches);
        }

        Commands::Matches(args) => {
            let response = engine.preview_matches(args.into_card()).await?;
            print_matches(&response);
        }

        Commands::Explain { card_id, candidate_id } => {
            let b = engine.explain(card_id, candidate_id).await?;

            println!("Score breakdown:");
            println!("   Skill:        {}", b.skill);
            println!("   Vibe:         {}", b.vibe);
            println!("   Goal type:    {}", b.goal_type);
            println!("   Tags:         {}", b.tags);
            println!("   Timezone:     {}", b.timezone);
            println!("   Availability: {}", b.availability);
            println!("   Total:        {}", b.total());
        }

        Commands::List { goal, skill, tag, page, per_page } => {
            let filter = CardFilter {
                goal_type: goal.as_deref().map(GoalType::from),
                skill_level: skill.as_deref().map(SkillLevel::from),
                tech_tag: tag,
                max_age_days: Some(engine.options().max_age_days),
                ..Default::default()
            };
            let page = engine.list_cards(&filter, &PageRequest::new(page, per_page)).await?;

            println!("Page {}/{} ({} cards)", page.page, page.total_pages().max(1), page.total);
            for card in &page.items {
                println!(
                    "   {} {} {}",
                    card.created_at.format("%Y-%m-%d %H:%M"),
                    card.id,
                    card.summary()
                );
            }
        }

        Commands::RelistToken { card_id } => {
            let token = engine.issue_relist_token(card_id, &cli.user).await?;
            println!("Token: {}", token.token);
            println!("   Expires: {}", token.expires_at.format("%Y-%m-%d %H:%M:%S"));
        }

        Commands::Relist { token } => {
            let card_id = engine.relist(&token).await?;
            println!("Relisted card {}", card_id);
        }

        Commands::Delete { card_id } => {
            engine.delete_card(card_id, &cli.user).await?;
            println!("Deleted card {}", card_id);
        }

        Commands::Stats => {
            let stats = engine.stats().await?;

            println!("Store Statistics:");
            println!("   Total cards: {}", stats.total_cards);
            println!("   Active cards: {}", stats.active_cards);
            println!("   Relist tokens: {}", stats.relist_tokens);

            if let Some(oldest) = stats.oldest_card {
                println!("   Oldest card: {}", oldest.format("%Y-%m-%d %H:%M:%S"));
            }

            if let Some(newest) = stats.newest_card {
                println!("   Newest card: {}", newest.format("%Y-%m-%d %H:%M:%S"));
            }
        }
    }

    Ok(())
}

fn print_matches(response: &goal_match_engine::MatchResponse) {
    if response.degraded {
        println!("\nCould not load candidates, no matches available right now.");
        return;
    }

    if response.is_empty() {
        println!("\nNo matches yet ({} candidates checked).", response.candidate_pool_size);
        return;
    }

    println!("\nMatches:");
    for (i, m) in response.matches.iter().enumerate() {
        println!(
            "   {}. [{}] {} ({} {})",
            i + 1,
            m.match_score,
            m.card.summary(),
            m.card.contact_method,
            m.card.contact_handle
        );
    }
}
