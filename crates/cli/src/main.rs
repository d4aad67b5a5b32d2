mod config;
mod error;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Parser, Subcommand};
use runtime::{Agent, Assistant, ChatCompletionsProvider, SessionStore, TurnOutcome};
use storage::RecordStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "eatlog.toml";
const DEFAULT_SESSION: &str = "default";
const EXIT_WORDS: [&str; 3] = ["退出", "exit", "quit"];

const SYSTEM_PROMPT: &str = "\
你是一个智能饮食记录助手，既能进行友好闲聊，也能帮助记录饮食信息。

当用户提到吃了什么、花了多少钱、在哪一天时，使用 record_thing 记录，需要 date、eat、money 三个参数。
信息不完整时先询问用户，信息完整后只调用一次，避免重复记录。
当用户不知道吃什么或想换口味时，使用 recommend_food 推荐。
查询记录、消费和统计时，使用 get_all_records、get_records_by_date、get_total_spending、get_eating_stats。
需要读写文件时，使用 read_file、write_file、list_directory；需要了解工具使用情况时，使用 get_function_stats。

保持友好、自然的对话风格，不要问用户是要记录还是闲聊。";

#[derive(Parser)]
#[command(name = "eatlog")]
#[command(about = "A conversational meal and spending log", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Session ID to chat in
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,
        /// Start a fresh session with a random ID
        #[arg(long, conflicts_with = "session")]
        new: bool,
    },
    /// List recorded meals
    Records {
        /// Only show meals for this date
        #[arg(short, long)]
        date: Option<String>,
        /// Show only the last N meals
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show eating and tool usage statistics
    Stats,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?.with_env()?;
    init_tracing(config.log_level.as_deref());

    match cli.command {
        Some(Commands::Chat { session, new }) => {
            let session = if new {
                uuid::Uuid::new_v4().to_string()
            } else {
                session
            };
            cmd_chat(&config, &session).await
        }
        None => cmd_chat(&config, DEFAULT_SESSION).await,
        Some(Commands::Records { date, limit }) => cmd_records(&config, date.as_deref(), limit),
        Some(Commands::Stats) => cmd_stats(&config),
    }
}

/// RUST_LOG overrides the configured level; the default is quiet.
fn init_tracing(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("warn")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn cmd_chat(config: &Config, session_id: &str) -> Result<()> {
    println!("eatlog v{}", env!("CARGO_PKG_VERSION"));

    let provider = ChatCompletionsProvider::builder(config.api_key()?)
        .base_url(&config.model.base_url)
        .model(&config.model.model)
        .max_tokens(config.model.max_tokens)
        .temperature(config.model.temperature)
        .fidelity(config.model.tool_fidelity)
        .disable_thinking(config.model.disable_thinking)
        .build();

    let db_path = config.database_path(&data_dir());
    let store = tools::shared(RecordStore::open(&db_path)?);
    let registry = tools::default_registry(store)?;

    let system_prompt = config
        .agent
        .system_prompt
        .clone()
        .unwrap_or_else(|| default_system_prompt(&Local::now().format("%Y-%m-%d").to_string()));
    let agent = Agent::new(provider, registry)
        .with_system_prompt(system_prompt)
        .with_max_iterations(config.agent.max_iterations);
    let assistant = Assistant::new(agent, SessionStore::new(config.sessions.to_runtime()));

    let stats = assistant.stats();
    println!("Records stored at: {}", db_path.display());
    println!("Model: {}", config.model.model);
    println!("Tools: {}", stats.tool_count);
    println!("Active sessions: {}", stats.session_count);
    println!("Session: {session_id}");
    println!("Type '退出', 'exit' or 'quit' (or Ctrl+D) to leave.\n");
    info!(session = %session_id, tools = stats.tool_count, "chat started");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            println!("请输入内容。\n");
            continue;
        }
        if is_exit_word(input) {
            break;
        }

        let report = assistant.process_detailed(session_id, input).await;
        if report.outcome == TurnOutcome::IterationLimit {
            warn!(session = %session_id, rounds = report.rounds, "turn hit the iteration limit");
        }
        println!("\n{}\n", report.text);
    }

    assistant.shutdown();
    println!("\n再见！");
    Ok(())
}

fn cmd_records(config: &Config, date: Option<&str>, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let meals = match date {
        Some(date) => store.meals_by_date(date)?,
        None => store.recent_meals(limit)?,
    };

    if meals.is_empty() {
        println!("No records found.");
        return Ok(());
    }

    println!("{:<12}  {:<24}  MONEY", "DATE", "FOOD");
    println!("{}", "-".repeat(48));
    for meal in meals.iter().take(limit) {
        println!("{:<12}  {:<24}  {}", meal.date, meal.food, meal.money);
    }

    Ok(())
}

fn cmd_stats(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let eating = store.eating_report()?;
    let calls = store.function_call_report()?;

    println!("Meals recorded:     {}", eating.total_records);
    println!("Total spending:     {:.2}", eating.total_spending);
    println!("Average per day:    {:.2}", eating.avg_daily_spending);

    if !eating.top_foods.is_empty() {
        println!("\nMost eaten:");
        for food in &eating.top_foods {
            println!("  {:<24}  {}", food.food, food.count);
        }
    }

    println!("\nTool calls:         {}", calls.total_calls);
    for (name, count) in &calls.function_breakdown {
        println!("  {name:<24}  {count}");
    }

    Ok(())
}

/// Exit words match regardless of case, so `EXIT` and `Quit` also leave.
fn is_exit_word(input: &str) -> bool {
    let lowered = input.to_lowercase();
    EXIT_WORDS.contains(&lowered.as_str())
}

fn default_system_prompt(today: &str) -> String {
    format!("{SYSTEM_PROMPT}\n\n今天的日期是 {today}。")
}

fn open_store(config: &Config) -> Result<RecordStore> {
    let db_path = config.database_path(&data_dir());

    if !db_path.exists() {
        return Err(Error::DatabaseNotFound { path: db_path });
    }

    Ok(RecordStore::open(&db_path)?)
}

fn data_dir() -> PathBuf {
    dirs_data_dir().unwrap_or_else(|| Path::new(".eatlog").to_path_buf())
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library/Application Support/eatlog"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("eatlog"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("eatlog"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}
