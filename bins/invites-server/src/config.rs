use clap::{Args, Parser, Subcommand};

use pubsub_client::PubSubConfig;

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "invites-server", about = "Приём голосов по приглашениям: HTTP → Pub/Sub → лог")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Принимать голоса по HTTP и публиковать их в Pub/Sub topic
    Intake(IntakeArgs),
    /// Принимать push-доставки из Pub/Sub и логировать их
    Trigger(TriggerArgs),
    /// Обе функции в одном процессе через in-process topic
    Local(LocalArgs),
}

#[derive(Args, Clone, Debug)]
pub struct HttpArgs {
    /// Порт HTTP сервера
    #[arg(long, default_value_t = 8080, env = "PORT")]
    pub port: u16,
}

#[derive(Args, Clone)]
pub struct IntakeArgs {
    #[command(flatten)]
    pub http: HttpArgs,

    /// Cloud project с topic'ом
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    pub project: String,

    /// Topic, в который публикуются голоса
    #[arg(long, env = "PUBSUB_TOPIC_ID")]
    pub topic: String,

    /// Переопределить REST endpoint Pub/Sub
    #[arg(long, env = "PUBSUB_ENDPOINT")]
    pub endpoint: Option<String>,

    /// host:port эмулятора Pub/Sub (без авторизации)
    #[arg(long, env = "PUBSUB_EMULATOR_HOST")]
    pub emulator_host: Option<String>,

    /// Bearer token; по умолчанию берётся у metadata server
    #[arg(long, env = "PUBSUB_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
}

impl IntakeArgs {
    /// Ids уходят в URL как есть, поэтому пробелы по краям — ошибка,
    /// а не повод молча обрезать.
    pub fn validate(&self) -> Result<(), ServerError> {
        check_id("topic", "PUBSUB_TOPIC_ID", &self.topic)?;
        check_id("project", "GOOGLE_CLOUD_PROJECT", &self.project)
    }

    pub fn pubsub_config(&self) -> PubSubConfig {
        PubSubConfig {
            project_id: self.project.clone(),
            endpoint: self.endpoint.clone(),
            emulator_host: self.emulator_host.clone(),
            access_token: self.access_token.clone(),
            metadata_url: None,
        }
    }
}

fn check_id(context: &'static str, var: &str, value: &str) -> Result<(), ServerError> {
    let detail = if value.trim().is_empty() {
        format!("{var} is empty")
    } else if value.trim() != value {
        format!("{var} has leading or trailing whitespace: {value:?}")
    } else {
        return Ok(());
    };
    Err(ServerError::Config { context, detail })
}

#[derive(Args, Clone, Debug)]
pub struct TriggerArgs {
    #[command(flatten)]
    pub http: HttpArgs,
}

#[derive(Args, Clone, Debug)]
pub struct LocalArgs {
    #[command(flatten)]
    pub http: HttpArgs,

    /// Имя in-process topic'а
    #[arg(long, env = "PUBSUB_TOPIC_ID", default_value = "invites")]
    pub topic: String,

    /// Размер буфера подписки
    #[arg(long, default_value_t = 1024)]
    pub buffer: usize,
}
