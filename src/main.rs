//! goalcoach command line.
//!
//! Parses arguments, initializes logging and app state, then runs one subcommand.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use goalcoach::agent_core::NewGoal;
use goalcoach::commands::{chat, goals, settings};
use goalcoach::AppState;

#[derive(Parser, Debug)]
#[command(name = "goalcoach", version)]
#[command(about = "Goal coaching assistant backed by configurable LLM providers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a goal and start onboarding
    New {
        /// Goal title; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Chat about a goal, one message per stdin line
    Chat { goal_id: String },
    /// List goals
    Goals,
    /// List a goal's tasks
    Tasks { goal_id: String },
    /// List open tasks due today
    Today,
    /// List provider configs
    Providers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = goalcoach::init_tracing() {
        eprintln!("warning: file logging disabled: {e}");
    }

    let state = AppState::initialize().context("failed to initialize goalcoach")?;

    match cli.command {
        Commands::New { title } => new_goal(&state, &title.join(" ")).await,
        Commands::Chat { goal_id } => chat_loop(&state, &goal_id).await,
        Commands::Goals => {
            for goal in goals::list_goals(&state).map_err(|e| anyhow!(e))? {
                println!("{}  [{}]  {}", goal.id, goal.status.as_str(), goal.title);
            }
            Ok(())
        }
        Commands::Tasks { goal_id } => {
            let tasks = goals::list_tasks_for_goal(&state, &goal_id).map_err(|e| anyhow!(e))?;
            for task in tasks {
                println!("{}  [{}]  {}", task.id, task.status.as_str(), task.title);
            }
            Ok(())
        }
        Commands::Today => {
            for task in goals::list_todays_tasks(&state).map_err(|e| anyhow!(e))? {
                println!("{}  [{}]  {}", task.id, task.status.as_str(), task.title);
            }
            Ok(())
        }
        Commands::Providers => {
            for config in settings::list_provider_configs(&state).map_err(|e| anyhow!(e))? {
                let marker = if config.is_default { "*" } else { " " };
                let active = if config.is_active { "" } else { " (inactive)" };
                println!(
                    "{marker} {}  {}  {}{active}",
                    config.name, config.provider, config.default_model
                );
            }
            Ok(())
        }
    }
}

async fn new_goal(state: &AppState, title: &str) -> anyhow::Result<()> {
    let goal = goals::create_goal(
        state,
        NewGoal {
            title: title.to_string(),
            ..Default::default()
        },
    )
    .map_err(|e| anyhow!(e))?;
    println!("goal {}", goal.id);

    let reply = chat::start_onboarding(state, &goal.id, &goal.title)
        .await
        .map_err(|e| anyhow!(e))?;
    println!("[{}] {}", reply.agent_type, reply.content);
    Ok(())
}

async fn chat_loop(state: &AppState, goal_id: &str) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request = chat::ChatRequest {
            message: line,
            goal_id: goal_id.to_string(),
        };
        match chat::send_message(state, request).await {
            Ok(reply) => {
                println!("[{}] {}", reply.agent_type, reply.content);
                if !reply.persisted {
                    eprintln!("warning: this exchange was not saved to history");
                }
            }
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}
