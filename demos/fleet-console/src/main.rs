use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use fleetgate::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum ConsoleError {
    #[error(transparent)]
    Fleet(#[from] FleetError),
    #[error("{0}")]
    Api(String),
    #[error("not logged in; run `fleet-console login` first")]
    NotLoggedIn,
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<ApiError> for ConsoleError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::SessionInvalidated => Self::NotLoggedIn,
            other => Self::Api(other.message()),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "fleet-console", about = "Fleet backend console client")]
struct Cli {
    #[arg(long, env = "FLEETGATE_API_URL", default_value = "http://localhost:8000")]
    base_url: String,

    /// Where the session is kept between runs.
    #[arg(long, env = "FLEETGATE_SESSION_FILE", default_value = ".fleet-session.json")]
    session_file: PathBuf,

    #[arg(long, env = "FLEETGATE_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shows who is logged in.
    Whoami,
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "FLEETGATE_PASSWORD")]
        password: String,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "FLEETGATE_PASSWORD")]
        password: String,
    },
    Logout,
    List {
        kind: Kind,
        #[arg(long)]
        skip: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Show {
        kind: Kind,
        id: i64,
    },
    Create {
        kind: Kind,
        /// JSON object describing the new item.
        body: String,
    },
    Update {
        kind: Kind,
        id: i64,
        /// JSON object with the fields to replace.
        body: String,
    },
    Delete {
        kind: Kind,
        id: i64,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Kind {
    Buses,
    Routes,
}

impl From<Kind> for Resource {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Buses => Resource::Buses,
            Kind::Routes => Resource::Routes,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,fleetgate=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ConsoleError> {
    let config = ClientConfig::from_env()?
        .with_base_url(cli.base_url)
        .with_session_file(cli.session_file)
        .with_request_timeout(Duration::from_secs(cli.timeout_secs));
    let client = FleetClient::builder().config(config).build()?;

    // Stands in for the router: a rejected session sends the user to login.
    let mut events = client.session_events();
    let navigator = tokio::spawn(async move {
        while let Ok(SessionEvent::Invalidated { login_path }) = events.recv().await {
            eprintln!("session expired, please log in again ({login_path})");
        }
    });

    let state = client.start().await;
    tracing::debug!(%state, "session restored");
    let result = dispatch(&client, state, cli.command).await;

    client.shutdown().await;
    navigator.abort();
    result
}

async fn dispatch(
    client: &FleetClient<fleetgate::transport::ReqwestTransport>,
    state: AuthState,
    command: Command,
) -> Result<(), ConsoleError> {
    match command {
        Command::Whoami => match state.user() {
            Some(user) => println!("{} ({})", user.email, user.id),
            None => println!("not logged in"),
        },
        Command::Login { email, password } => {
            let user = client.auth().login(&email, &password).await?;
            println!("logged in as {}", user.email);
        }
        Command::Register { email, password } => {
            let user = client
                .auth()
                .register(&NewUser::new(email, password))
                .await?;
            println!("registered {}; now run `fleet-console login`", user.email);
        }
        Command::Logout => {
            client.auth().logout().map_err(FleetError::from)?;
            println!("logged out");
        }
        Command::List { kind, skip, limit } => {
            require_login(&state)?;
            let items = client
                .resources()
                .list(kind.into(), Page { skip, limit })
                .await?;
            print_json(&serde_json::Value::Array(items))?;
        }
        Command::Show { kind, id } => {
            require_login(&state)?;
            let item = client.resources().get(kind.into(), id).await?;
            print_json(&item)?;
        }
        Command::Create { kind, body } => {
            require_login(&state)?;
            let body: serde_json::Value = serde_json::from_str(&body)?;
            let created = client.resources().create(kind.into(), &body).await?;
            print_json(&created)?;
        }
        Command::Update { kind, id, body } => {
            require_login(&state)?;
            let body: serde_json::Value = serde_json::from_str(&body)?;
            let updated = client.resources().update(kind.into(), id, &body).await?;
            print_json(&updated)?;
        }
        Command::Delete { kind, id } => {
            require_login(&state)?;
            client.resources().delete(kind.into(), id).await?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

fn require_login(state: &AuthState) -> Result<(), ConsoleError> {
    if state.is_authenticated() {
        Ok(())
    } else {
        Err(ConsoleError::NotLoggedIn)
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), ConsoleError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
