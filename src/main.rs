mod cli;

use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{AuthCommand, Cli, Commands, HistoryCommand, RequestArgs};
use imgpro::auth::{ImgAuth, StdoutNavigator};
use imgpro::catalog::{self, EndpointFilter};
use imgpro::client::{ClientOptions, ImgApi};
use imgpro::config::Config;
use imgpro::db::Database;
use imgpro::history::format_timestamp;
use imgpro::response::{format_file_size, ResponseRecord};
use imgpro::storage::Storage;
use imgpro::types::{ImportOptions, ListMediaOptions, MediaUpdate, UploadOptions};
use imgpro::Playground;

fn init_tracing(verbose: bool) {
    let default = if verbose { "imgpro=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.database_url.is_some() { config.database_url = cli.database_url.clone(); }

    let db = Database::open(config.database_url.as_deref()).await.context("opening local store")?;
    let store: Arc<dyn Storage> = Arc::new(db);

    let mut playground = Playground::new(store.clone())
        .with_environment(config.environment.unwrap_or_default());
    playground.load().await?;
    // A one-off --env doesn't touch the saved environment. --api-url beats it.
    let api_url = cli.api_url.clone().or_else(|| config.api_url_for_run(cli.run_env));
    playground = playground.with_api_url(api_url);

    let api = ImgApi::new(
        store.clone(),
        ClientOptions { api_url: Some(playground.api_url()), hostname: None },
    );
    let auth = ImgAuth::new(store, Arc::new(StdoutNavigator)).with_urls(config.auth_url(), playground.api_url());

    match cli.command {
        Commands::Auth { action } => match action {
            AuthCommand::Status => {
                if auth.is_authenticated().await? {
                    println!("authenticated against {}", auth.api_url);
                } else {
                    bail!("not authenticated");
                }
            }
            AuthCommand::Login => auth.login()?,
            AuthCommand::Logout => auth.logout().await?,
            AuthCommand::SetToken { token } => {
                playground.save_token(token.trim()).await?;
                println!("token saved");
            }
            AuthCommand::Whoami => match auth.get_user().await? {
                Some(user) => println!("token id: {}", user.token_id),
                None => bail!("no token stored"),
            },
        },
        Commands::Env { environment } => match environment {
            Some(env) => {
                playground.set_environment(env).await?;
                println!("{env} ({})", env.api_url());
            }
            None => println!("{} ({})", playground.environment(), playground.api_url()),
        },
        Commands::Endpoints { auth, public } => {
            for e in catalog::filtered(EndpointFilter { auth, public }) {
                let lock = if e.requires_auth { "auth" } else { "public" };
                println!("{:<14} {:<7} {:<22} {:<7} {}", e.id, e.method, e.path, lock, e.description);
            }
        }
        Commands::Show { endpoint } => {
            let e = catalog::find(&endpoint).ok_or_else(|| anyhow!("unknown endpoint `{endpoint}`"))?;
            println!("{} {}  ({})", e.method, e.path, e.id);
            println!("{}", e.description);
            if !e.parameters.is_empty() {
                println!("\nparameters:");
                for p in &e.parameters {
                    let req = if p.required { "*" } else { " " };
                    println!("  {req}{:<14} {:<8} {}", p.name, p.kind, p.description.unwrap_or(""));
                    if !p.options.is_empty() {
                        println!("   {:<14} one of: {}", "", p.options.join(", "));
                    }
                }
            }
            if !e.scenarios.is_empty() {
                println!("\nscenarios:");
                for s in &e.scenarios {
                    println!("  {:<22} {:<7} {}", s.id, s.outcome, s.description);
                }
            }
            if let Some(body) = e.example_body() {
                println!("\nexample body:\n{}", serde_json::to_string_pretty(&body)?);
            }
        }
        Commands::Send { request, no_history, mock_errors } => {
            prepare(&mut playground, &request).await?;
            playground.options.save_to_history = !no_history;
            playground.options.mock_errors = mock_errors;
            let record = playground.execute_request().await?;
            print_response(record);
            if !record.is_success() {
                bail!("request failed with status {}", record.status);
            }
        }
        Commands::Code { request, lang } => {
            prepare(&mut playground, &request).await?;
            playground.code_language = lang;
            println!("{}", playground.generate_code(lang)?);
        }
        Commands::History { action } => match action {
            HistoryCommand::List => {
                let now = chrono::Utc::now();
                for (i, h) in playground.history().entries().iter().enumerate() {
                    println!("{i:>3}  {:<6} {:>3}  {:<20} {}  {}", h.method, h.status, format_timestamp(h.timestamp, now), h.path, h.url);
                }
            }
            HistoryCommand::Show { index } => {
                let entry = playground.history().nth(index).ok_or_else(|| anyhow!("no history entry {index}"))?;
                println!("{}", serde_json::to_string_pretty(entry)?);
            }
            HistoryCommand::Replay { index } => {
                let entry = playground.history().nth(index).cloned().ok_or_else(|| anyhow!("no history entry {index}"))?;
                if !playground.load_from_history(&entry) {
                    bail!("no endpoint serves {} {}", entry.method, entry.path);
                }
                let record = playground.execute_request().await?;
                print_response(record);
            }
            HistoryCommand::Clear { yes } => {
                if playground.clear_history(|| yes || confirm("Clear all history?")).await? {
                    println!("history cleared");
                }
            }
        },
        Commands::Upload { file, description, public } => {
            let resp = api
                .upload_path(&file, UploadOptions { description, public })
                .await
                .with_context(|| format!("uploading {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        Commands::Import { url, description, tags, ttl, public } => {
            let resp = api.import_media(&url, &ImportOptions { description, tags, ttl, public }).await?;
            println!("{}", serde_json::to_string_pretty(&resp)?);
        }
        Commands::List { limit, cursor } => {
            let list = api.list_media(&ListMediaOptions { limit, cursor }).await?;
            for m in &list.data {
                println!("{:<14} {:>5}x{:<5} {:>10}  {}", m.id, m.width, m.height, format_file_size(m.filesize), m.name);
            }
            if let Some(next) = list.next_cursor.filter(|_| list.has_more) {
                println!("more: --cursor {next}");
            }
        }
        Commands::Get { id } => {
            println!("{}", serde_json::to_string_pretty(&api.get_media(&id).await?)?);
        }
        Commands::Update { id, name, description, tags, public } => {
            let update = MediaUpdate { name, description, tags, public };
            if update.is_empty() {
                bail!("nothing to update; pass at least one of --name, --description, --tags, --public");
            }
            println!("{}", serde_json::to_string_pretty(&api.update_media(&id, &update).await?)?);
        }
        Commands::Delete { id } => {
            let resp = api.delete_media(&id).await?;
            println!("deleted {id}: {}", resp.success);
        }
    }
    Ok(())
}

/// Load the request described on the command line into the playground.
async fn prepare(playground: &mut Playground, args: &RequestArgs) -> Result<()> {
    playground.select_endpoint(&args.endpoint)?;
    if let Some(scenario) = &args.scenario {
        playground.load_scenario(scenario)?;
    }
    for (name, value) in &args.params {
        playground.set_param(name, value)?;
    }
    if args.example && !playground.load_example_body()? {
        bail!("endpoint `{}` has no example body", args.endpoint);
    }
    if let Some(body) = &args.body {
        playground.request_body = body.clone();
    }
    if let Some(path) = &args.body_file {
        playground.request_body = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading body file {}", path.display()))?;
    }
    for (k, v) in &args.form_fields {
        playground.add_form_field(k.as_str(), v.as_str());
    }
    for (k, v) in &args.headers {
        playground.add_header(k.as_str(), v.as_str());
    }
    playground.body_format = args.format;
    Ok(())
}

fn print_response(record: &ResponseRecord) {
    eprintln!(
        "{} {} [{}]  {} ms  {}",
        record.status,
        record.status_text,
        record.status_class(),
        record.time,
        format_file_size(record.size as u64)
    );
    println!("{}", record.body.render());
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer).is_ok() && matches!(answer.trim(), "y" | "Y" | "yes")
}
