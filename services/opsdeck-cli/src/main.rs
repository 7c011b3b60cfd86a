//! OpsDeck command-line client
//!
//! Thin terminal frontend over the authenticated gateway: sign in once,
//! then every command rides the stored token pair. Expired access tokens
//! are refreshed and replayed transparently; when the refresh token itself
//! is rejected the command fails with a prompt to log in again.

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use opsdeck_api::{audit, billing, configs, cost, policies, projects, users};
use opsdeck_auth::CredentialStore;
use opsdeck_gateway::Gateway;

use crate::config::Config;

const USAGE: &str = "\
usage: opsdeck [--config PATH] <command> [args]

session:
  login <email>                          password from OPSDECK_PASSWORD
  register <email> <name>                password from OPSDECK_PASSWORD
  logout
  whoami

projects:
  projects                               list projects
  project create <name> <provider> [description]
  project show <id>
  project rename <id> <name>

configurations:
  configs <project-id>                   list configs in a project
  config create <project-id> <title> <type>
  config show <id>
  config delete <id>
  config push <config-id> <file>         upload a new version
  versions <config-id>                   list versions
  version show <id>
  version diff <id> [base]               base is \"prev\" or a version number

policies:
  policies [project-id]
  policy create <name> <scope> <type> <rule-file> [project-id]
  policy delete <id>
  policy validate <rule-file> <content-file> <type>

cost optimizer:
  accounts                               list linked cloud accounts
  account link <name> <provider> <credentials-file> [region]
  account show <id>
  account unlink <id>
  analyze <account-id>                   run a cost analysis
  analyses                               list past analyses
  analysis show <id>
  recommendation <id> <apply|dismiss>

billing:
  subscription
  subscribe <plan>
  unsubscribe

admin:
  users
  user role <id> <role>

audit:
  audit [--actor <id>] [--action <name>] [--limit <n>]
";

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays clean JSON for piping
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        match e.downcast_ref::<opsdeck_gateway::Error>() {
            Some(opsdeck_gateway::Error::SessionExpired) => {
                eprintln!("error: session expired; run `opsdeck login <email>` to sign in again");
            }
            _ => eprintln!("error: {e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let config_flag = args.iter().position(|a| a == "--config");
    let cli_config_path = config_flag.and_then(|i| {
        args.remove(i);
        if i < args.len() { Some(args.remove(i)) } else { None }
    });

    if args.is_empty() || args[0] == "--help" || args[0] == "help" {
        print!("{USAGE}");
        return Ok(());
    }

    let config_path = Config::resolve_path(cli_config_path.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let credentials = Arc::new(
        CredentialStore::load(config.credentials.path.clone())
            .await
            .with_context(|| {
                format!(
                    "failed to load credentials from {}",
                    config.credentials.path.display()
                )
            })?,
    );

    let gateway = Gateway::new(config.api.base_url.clone(), credentials, http).await;

    let argv: Vec<&str> = args.iter().map(String::as_str).collect();
    match argv.as_slice() {
        // --- session ---
        ["login", email] => {
            let password = Config::password()
                .context("set OPSDECK_PASSWORD to provide the login password")?;
            let profile = gateway.login(email, password.expose()).await?;
            print_json(&profile)
        }
        ["register", email, name] => {
            let password = Config::password()
                .context("set OPSDECK_PASSWORD to provide the account password")?;
            let profile = gateway.register(email, name, password.expose()).await?;
            print_json(&profile)
        }
        ["logout"] => {
            gateway.logout().await;
            info!("credentials cleared");
            Ok(())
        }
        ["whoami"] => print_json(&gateway.whoami().await?),

        // --- projects ---
        ["projects"] => print_json(&projects::list(&gateway).await?),
        ["project", "create", name, provider, rest @ ..] => {
            let project = projects::create(
                &gateway,
                &projects::ProjectCreate {
                    name: (*name).to_string(),
                    description: rest.first().map(|s| (*s).to_string()),
                    cloud_provider: (*provider).to_string(),
                },
            )
            .await?;
            print_json(&project)
        }
        ["project", "show", id] => print_json(&projects::get(&gateway, parse_id(id)?).await?),
        ["project", "rename", id, name] => {
            let update = projects::ProjectUpdate {
                name: Some((*name).to_string()),
                ..Default::default()
            };
            print_json(&projects::update(&gateway, parse_id(id)?, &update).await?)
        }

        // --- configurations ---
        ["configs", project_id] => {
            print_json(&configs::list(&gateway, parse_id(project_id)?).await?)
        }
        ["config", "create", project_id, title, config_type] => {
            let created = configs::create(
                &gateway,
                parse_id(project_id)?,
                &configs::ConfigCreate {
                    title: (*title).to_string(),
                    config_type: (*config_type).to_string(),
                    tags: Vec::new(),
                },
            )
            .await?;
            print_json(&created)
        }
        ["config", "show", id] => print_json(&configs::get(&gateway, parse_id(id)?).await?),
        ["config", "delete", id] => {
            configs::delete(&gateway, parse_id(id)?).await?;
            Ok(())
        }
        ["config", "push", config_id, file] => {
            let content = read_file(file)?;
            print_json(&configs::create_version(&gateway, parse_id(config_id)?, &content).await?)
        }
        ["versions", config_id] => {
            print_json(&configs::list_versions(&gateway, parse_id(config_id)?).await?)
        }
        ["version", "show", id] => {
            print_json(&configs::get_version(&gateway, parse_id(id)?).await?)
        }
        ["version", "diff", id, rest @ ..] => {
            let base = rest.first().copied().unwrap_or("prev");
            print_json(&configs::diff_version(&gateway, parse_id(id)?, base).await?)
        }

        // --- policies ---
        ["policies"] => print_json(&policies::list(&gateway, None).await?),
        ["policies", project_id] => {
            print_json(&policies::list(&gateway, Some(parse_id(project_id)?)).await?)
        }
        ["policy", "create", name, scope, policy_type, rule_file, rest @ ..] => {
            let project_id = rest.first().map(|s| parse_id(s)).transpose()?;
            let policy = policies::create(
                &gateway,
                &policies::PolicyCreate {
                    name: (*name).to_string(),
                    scope: (*scope).to_string(),
                    policy_type: (*policy_type).to_string(),
                    rule: read_file(rule_file)?,
                    project_id,
                },
            )
            .await?;
            print_json(&policy)
        }
        ["policy", "delete", id] => {
            policies::delete(&gateway, parse_id(id)?).await?;
            Ok(())
        }
        ["policy", "validate", rule_file, content_file, config_type] => {
            let validation = policies::validate(
                &gateway,
                &policies::PolicyValidateRequest {
                    rule: read_file(rule_file)?,
                    content: read_file(content_file)?,
                    config_type: (*config_type).to_string(),
                },
            )
            .await?;
            print_json(&validation)
        }

        // --- cost optimizer ---
        ["accounts"] => print_json(&cost::list_accounts(&gateway).await?),
        ["account", "link", name, provider, credentials_file, rest @ ..] => {
            let raw = read_file(credentials_file)?;
            let creds: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("{credentials_file} is not valid JSON"))?;
            let account = cost::link_account(
                &gateway,
                &cost::CloudAccountCreate {
                    name: (*name).to_string(),
                    provider: (*provider).to_string(),
                    credentials: creds,
                    region: rest.first().map(|s| (*s).to_string()),
                },
            )
            .await?;
            print_json(&account)
        }
        ["account", "show", id] => print_json(&cost::get_account(&gateway, parse_id(id)?).await?),
        ["account", "unlink", id] => {
            cost::unlink_account(&gateway, parse_id(id)?).await?;
            Ok(())
        }
        ["analyze", account_id] => {
            print_json(&cost::analyze(&gateway, parse_id(account_id)?).await?)
        }
        ["analyses"] => print_json(&cost::list_analyses(&gateway).await?),
        ["analysis", "show", id] => {
            print_json(&cost::get_analysis(&gateway, parse_id(id)?).await?)
        }
        ["recommendation", id, action @ ("apply" | "dismiss")] => {
            let action = action.to_uppercase();
            print_json(&cost::update_recommendation(&gateway, parse_id(id)?, &action).await?)
        }

        // --- billing ---
        ["subscription"] => print_json(&billing::subscription(&gateway).await?),
        ["subscribe", plan] => {
            let subscription = billing::subscribe(
                &gateway,
                &billing::SubscriptionCreate {
                    plan: plan.to_uppercase(),
                    payment_method_id: None,
                },
            )
            .await?;
            print_json(&subscription)
        }
        ["unsubscribe"] => print_json(&billing::cancel(&gateway).await?),

        // --- admin ---
        ["users"] => print_json(&users::list(&gateway).await?),
        ["user", "role", id, role] => {
            print_json(&users::update_role(&gateway, parse_id(id)?, role).await?)
        }

        // --- audit ---
        ["audit", rest @ ..] => {
            let filter = parse_audit_filter(rest)?;
            print_json(&audit::list(&gateway, &filter).await?)
        }

        _ => bail!("unknown command: {}\n\n{USAGE}", args.join(" ")),
    }
}

fn parse_audit_filter(args: &[&str]) -> Result<audit::AuditFilter> {
    let mut filter = audit::AuditFilter::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .with_context(|| format!("{flag} requires a value"))?;
        match *flag {
            "--actor" => filter.actor_id = Some(parse_id(value)?),
            "--action" => filter.action = Some((*value).to_string()),
            "--limit" => {
                filter.limit = Some(value.parse().with_context(|| {
                    format!("--limit expects a number, got {value}")
                })?)
            }
            other => bail!("unknown audit flag: {other}"),
        }
    }
    Ok(filter)
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("{raw} is not a valid id"))
}

fn read_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
