use anyhow::Result;
use clap::Parser;
use dialoguer::{Confirm, Password};
use serde_json::json;
use std::io::Read;
use std::sync::Arc;

use paraphrase_client::api::history::{self, HistoryFilter, DEFAULT_PAGE_SIZE};
use paraphrase_client::api::models::{Platform, SettingsUpdate};
use paraphrase_client::auth::{Navigator, SqliteSessionStore, User};
use paraphrase_client::config::{CliArgs, Command, Config, SubscriptionAction};
use paraphrase_client::languages::{self, LANGUAGE_COLUMNS};
use paraphrase_client::{ApiClient, ApiError};

/// A CLI run has no pages to leave; tell the user to log in again
struct CliNavigator;

impl Navigator for CliNavigator {
    fn hard_navigate(&self, path: &str) {
        tracing::warn!(path = path, "Session cleared after failed token refresh");
        eprintln!("Your session has expired. Log in again with `paraphrase-client login`.");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    let config = Config::from_args(&args)?;

    // Logs go to stderr so command output stays pipeable
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!(api_url = %config.api_url, session_db = %config.session_db_file.display(), "Starting");

    let store = Arc::new(SqliteSessionStore::open(&config.session_db_file)?);
    let client = ApiClient::from_config(&config, store, Arc::new(CliNavigator))?;

    // Restore any stored session before running the command
    client.session().bootstrap()?;

    match run(&client, &config, args.command).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("Error: {}", e);
            std::process::exit(exit_code(&e));
        }
    }
}

/// 2 tells scripts the stored session is gone and a login is needed
fn exit_code(error: &ApiError) -> i32 {
    match error {
        ApiError::SessionExpired => 2,
        _ => 1,
    }
}

fn prompt_error(e: dialoguer::Error) -> ApiError {
    ApiError::Internal(e.into())
}

fn require_user(client: &ApiClient) -> Result<User, ApiError> {
    client.session().current_user().ok_or(ApiError::NotAuthenticated)
}

fn read_password(given: Option<String>, confirm: bool) -> Result<String, ApiError> {
    if let Some(password) = given {
        return Ok(password);
    }

    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    prompt.interact().map_err(prompt_error)
}

async fn run(client: &ApiClient, config: &Config, command: Command) -> Result<(), ApiError> {
    match command {
        Command::Login { email, password } => {
            let password = read_password(password, false)?;
            let user = client.login(&email, &password).await?;
            println!("Logged in as {} <{}>", user.name, user.email);
        }

        Command::Register {
            name,
            email,
            password,
        } => {
            let password = read_password(password, true)?;
            let user = client.register(&name, &email, &password).await?;
            println!("Registered and logged in as {} <{}>", user.name, user.email);
        }

        Command::Logout => {
            client.logout()?;
            println!("Logged out");
        }

        Command::Whoami => match client.session().current_user() {
            Some(user) => println!("{} <{}> (id {})", user.name, user.email, user.id),
            None => println!("Not logged in"),
        },

        Command::Paraphrase {
            text,
            language,
            style,
        } => {
            require_user(client)?;
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .map_err(|e| ApiError::Internal(e.into()))?;
                    buf
                }
            };

            let language = languages::find_language(&language)
                .ok_or_else(|| ApiError::Validation(format!("Unsupported language: {}", language)))?;
            if !languages::is_supported_style(&style) {
                return Err(ApiError::Validation(format!("Unsupported style: {}", style)));
            }

            // Plan limits depend on the subscription
            match client.subscription().await {
                Ok(_) => {}
                Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired),
                Err(e) => tracing::warn!(error = %e, "Could not load subscription, using free tier limits"),
            }

            let result = match client.paraphrase(&text, language.value, &style).await {
                Ok(result) => result,
                Err(e) => {
                    track(client, "paraphrase_error", json!({ "error": e.to_string() })).await;
                    return Err(e);
                }
            };
            println!("{}", result.paraphrased);

            track(
                client,
                "paraphrase",
                json!({
                    "textLength": text.chars().count(),
                    "language": result.language,
                    "style": style,
                }),
            )
            .await;
        }

        Command::History {
            language,
            style,
            page,
        } => {
            require_user(client)?;
            let filter = HistoryFilter {
                language,
                style,
                ..Default::default()
            };
            let entries = filter.apply(client.history().await?);
            let pages = history::page_count(entries.len(), DEFAULT_PAGE_SIZE);

            if entries.is_empty() {
                println!("No history");
                return Ok(());
            }

            for entry in history::paginate(&entries, page, DEFAULT_PAGE_SIZE) {
                println!(
                    "#{} [{} / {}] {}",
                    entry.id,
                    entry.language,
                    entry.style,
                    entry.created_at.format("%Y-%m-%d %H:%M")
                );
                println!("  original:    {}", entry.original_text);
                println!("  paraphrased: {}", entry.paraphrased_text);
            }
            println!("Page {} of {}", page.max(1), pages);
        }

        Command::Stats => {
            require_user(client)?;
            let stats = client.stats().await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).map_err(|e| ApiError::Internal(e.into()))?
            );
        }

        Command::Languages { used } => {
            if used {
                require_user(client)?;
                for language in client.used_languages().await? {
                    println!("{}", language);
                }
            } else {
                let ordered = languages::ordered_languages(config.country_code.as_deref().unwrap_or(""));
                for row in ordered.chunks(LANGUAGE_COLUMNS) {
                    let cells: Vec<String> = row.iter().map(|l| format!("{:<14}", l.label)).collect();
                    println!("{}", cells.join(" ").trim_end());
                }
            }
        }

        Command::Settings {
            name,
            email,
            change_password,
        } => {
            require_user(client)?;
            let mut update = SettingsUpdate {
                name,
                email,
                ..Default::default()
            };
            if change_password {
                update.current_password = Some(
                    Password::new()
                        .with_prompt("Current password")
                        .interact()
                        .map_err(prompt_error)?,
                );
                update.new_password = Some(read_password(None, true)?);
            }

            client.update_settings(&update).await?;
            println!("Settings updated");
        }

        Command::Subscription { action } => {
            require_user(client)?;
            match action.unwrap_or(SubscriptionAction::Show) {
                SubscriptionAction::Show => match client.subscription().await? {
                    Some(sub) => {
                        println!("Plan:   {}", sub.plan_id);
                        println!("Status: {:?}", sub.status);
                        println!(
                            "{}: {}",
                            if sub.cancel_at_period_end { "Ends" } else { "Renews" },
                            sub.current_period_end.format("%Y-%m-%d")
                        );
                    }
                    None => println!("No subscription"),
                },
                SubscriptionAction::Cancel => {
                    let confirmed = Confirm::new()
                        .with_prompt("Cancel your subscription?")
                        .default(false)
                        .interact()
                        .map_err(prompt_error)?;
                    if confirmed {
                        client.cancel_subscription().await?;
                        println!("Subscription canceled");
                    }
                }
                SubscriptionAction::Trial => match client.activate_trial().await? {
                    Some(sub) => println!(
                        "Trial active until {}",
                        sub.current_period_end.format("%Y-%m-%d")
                    ),
                    None => println!("Trial activated"),
                },
            }
        }

        Command::Checkout { plan, ios } => {
            require_user(client)?;
            let platform = if ios { Platform::Ios } else { Platform::Web };
            let session = client.create_checkout_session(&plan, platform).await?;
            println!("{}", session.url);
        }
    }

    Ok(())
}

/// Usage tracking never fails the command
async fn track(client: &ApiClient, action: &str, metadata: serde_json::Value) {
    if let Err(e) = client.track_activity(action, metadata).await {
        tracing::debug!(action = action, error = %e, "Failed to record activity");
    }
}
