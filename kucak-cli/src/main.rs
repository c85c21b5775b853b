use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kucak_rag::openai::{
    DEFAULT_CHAT_MODEL, DEFAULT_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, OpenAIChatModel, OpenAIConfig,
    OpenAIEmbeddingProvider,
};
use kucak_rag::pinecone::{IndexSpec, PineconeConfig, PineconeIndex};
use kucak_rag::{Answer, ChatSession, ChatType, Domain, DomainFilters, RagConfig, RagPipeline};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kucak", version, about = "Ask the Kucak-AI maternal and infant health assistant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single question
    Ask {
        #[command(flatten)]
        conn: Connection,
        #[command(flatten)]
        query: QueryArgs,
        /// The question to answer
        question: String,
    },
    /// Interactive session reading one question per line from stdin
    Chat {
        #[command(flatten)]
        conn: Connection,
        #[command(flatten)]
        query: QueryArgs,
        /// User the session belongs to
        #[arg(long, default_value = "local")]
        user: String,
    },
    /// Create the Pinecone index if it does not exist and print its host
    InitIndex {
        #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
        pinecone_api_key: String,
        #[arg(long, default_value = "kucak-ai-health")]
        name: String,
        /// Pod environment, e.g. us-east-1-aws
        #[arg(long, env = "PINECONE_ENVIRONMENT")]
        environment: String,
    },
}

#[derive(Args)]
struct Connection {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: String,
    #[arg(long, env = "OPENAI_BASE_URL")]
    openai_base_url: Option<String>,
    #[arg(long, env = "KUCAK_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,
    #[arg(long, env = "KUCAK_EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_DIMENSIONS)]
    embedding_dimensions: usize,
    #[arg(long, env = "KUCAK_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pinecone_api_key: String,
    #[arg(long, env = "PINECONE_INDEX_HOST")]
    pinecone_host: String,
    /// Pipeline settings as JSON (fields of RagConfig; missing fields use defaults)
    #[arg(long, env = "KUCAK_RAG_CONFIG")]
    config: Option<String>,
}

#[derive(Args)]
struct QueryArgs {
    /// pregnancy or infant_care
    #[arg(long, default_value = "pregnancy")]
    domain: Domain,
    /// Gestation week
    #[arg(long)]
    week: Option<u32>,
    /// Baby age in weeks
    #[arg(long)]
    age_weeks: Option<u32>,
}

impl QueryArgs {
    fn filters(&self) -> DomainFilters {
        DomainFilters { pregnancy_week: self.week, baby_age_weeks: self.age_weeks }
    }

    fn chat_type(&self) -> ChatType {
        match self.domain {
            Domain::Pregnancy => ChatType::Pregnancy,
            Domain::InfantCare => ChatType::Newborn,
        }
    }
}

fn build_pipeline(conn: &Connection) -> Result<RagPipeline> {
    let config = match &conn.config {
        Some(json) => parse_config(json)?,
        None => RagConfig::default(),
    };

    let http_timeout = config.embedding_timeout.max(config.generation_timeout);
    let mut openai =
        OpenAIConfig::new(&conn.openai_api_key).with_timeout(http_timeout + Duration::from_secs(1));
    if let Some(base_url) = &conn.openai_base_url {
        openai = openai.with_base_url(base_url);
    }

    let embedder = OpenAIEmbeddingProvider::new(openai.clone())?
        .with_model(&conn.embedding_model, conn.embedding_dimensions);
    let chat = OpenAIChatModel::new(openai)?.with_model(&conn.chat_model);
    let index = PineconeIndex::new(
        PineconeConfig::new(&conn.pinecone_api_key, &conn.pinecone_host)
            .with_timeout(config.query_timeout + Duration::from_secs(1)),
    )?;

    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(embedder))
        .vector_index(Arc::new(index))
        .chat_model(Arc::new(chat))
        .build()?;
    Ok(pipeline)
}

fn parse_config(json: &str) -> Result<RagConfig> {
    let config: RagConfig = serde_json::from_str(json).context("invalid KUCAK_RAG_CONFIG")?;
    config.validate()?;
    Ok(config)
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text());
    if !answer.suggested_actions().is_empty() {
        println!();
        for action in answer.suggested_actions() {
            println!("! {action}");
        }
    }
    if !answer.references().is_empty() {
        println!();
        println!("References:");
        for reference in answer.references() {
            println!("  - {reference}");
        }
    }
}

async fn chat(pipeline: RagPipeline, query: QueryArgs, user: String) -> Result<()> {
    let mut session = ChatSession::new(user, None, query.chat_type());
    let filters = query.filters();
    info!(session_id = %session.session_id, title = %session.title, "chat session started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else { break };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        match pipeline.answer(question, query.domain, &filters).await {
            Ok(answer) => {
                print_answer(&answer);
                session.record_exchange(question, &answer);
            }
            Err(e) => eprintln!("error: {e}"),
        }
        println!();
    }

    info!(
        session_id = %session.session_id,
        messages = session.messages.len(),
        "chat session ended"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Ask { conn, query, question } => {
            let pipeline = build_pipeline(&conn)?;
            let answer = pipeline.answer(&question, query.domain, &query.filters()).await?;
            print_answer(&answer);
        }
        Command::Chat { conn, query, user } => {
            let pipeline = build_pipeline(&conn)?;
            chat(pipeline, query, user).await?;
        }
        Command::InitIndex { pinecone_api_key, name, environment } => {
            let spec = IndexSpec::health(name, environment);
            let host = PineconeIndex::create_index(&pinecone_api_key, &spec).await?;
            println!("{host}");
        }
    }
    Ok(())
}
