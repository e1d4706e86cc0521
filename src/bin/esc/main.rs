mod cli;
mod output;

use std::process::ExitCode;

use esc_sdk::models::EnvironmentDiagnostic;
use esc_sdk::{Configuration, EscApi, EscClient};

use output::ValueOptions;

#[tokio::main]
async fn main() -> ExitCode {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("ESC_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            for error in e.chain() {
                eprintln!("{error}")
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: cli::Cli) -> anyhow::Result<ExitCode> {
    let mut config = Configuration::from_env();
    if let Some(ref url) = cli.backend_url {
        config = config.with_backend_url(url);
    }
    if config.access_token.is_none() {
        tracing::warn!("PULUMI_ACCESS_TOKEN is not set; requests will be unauthenticated");
    }

    let client = EscClient::new(EscApi::new(&config)?);

    match cli.command {
        cli::Command::Env(command) => env(&client, command).await,
    }
}

async fn env(client: &EscClient, command: cli::EnvCommand) -> anyhow::Result<ExitCode> {
    use cli::EnvCommand::*;

    match command {
        Ls { org } => {
            for env in client.list_all_environments(&org).await? {
                match env.project {
                    Some(project) => println!("{}/{}", project, env.name),
                    None => println!("{}", env.name),
                }
            }
        }
        Init { org, env } => {
            client.create_environment(&org, &env).await?;
            eprintln!("Environment created.");
        }
        Get {
            org,
            env,
            show_secrets,
            value,
        } => {
            let resp = if show_secrets {
                client.decrypt_environment(&org, &env).await?
            } else {
                client.get_environment(&org, &env).await?
            };
            let Some(format) = value else {
                print!("{}", resp.yaml);
                return Ok(ExitCode::SUCCESS);
            };

            let check = client.check_environment_yaml(&org, &resp.yaml).await?;
            if !check.is_valid() {
                return report(check.diagnostics());
            }
            let options = ValueOptions {
                format,
                show_secrets,
                pretend: true,
            };
            output::write_environment(&mut std::io::stdout(), check.properties.as_ref(), options)?;
        }
        Update { org, env, file } => {
            let yaml = output::read_input(&file, std::io::stdin())?;
            let diags = client.update_environment_yaml(&org, &env, &yaml).await?;
            if diags.is_empty() {
                eprintln!("Environment updated.");
            }
            return report(diags.diagnostics());
        }
        Check { org, file } => {
            let yaml = output::read_input(&file, std::io::stdin())?;
            let check = client.check_environment_yaml(&org, &yaml).await?;
            if check.is_valid() {
                eprintln!("Environment definition is valid.");
            }
            return report(check.diagnostics());
        }
        Rm { org, env } => {
            client.delete_environment(&org, &env).await?;
            eprintln!("Environment deleted.");
        }
        Open {
            org,
            env,
            property,
            format,
            pretend,
        } => {
            output::check_property_format(format, property.as_deref())?;
            return open(client, &org, &env, property.as_deref(), format, pretend).await;
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn open(
    client: &EscClient,
    org: &str,
    env: &str,
    property: Option<&str>,
    format: cli::OpenFormat,
    pretend: bool,
) -> anyhow::Result<ExitCode> {
    let session = client.open_environment(org, env).await?;
    if let Some(ref diags) = session.diagnostics {
        if !diags.is_empty() {
            return report(diags);
        }
    }

    if let Some(path) = property {
        let resp = client
            .read_open_environment_property(org, env, &session.id, path)
            .await?;
        output::write_value(&mut std::io::stdout(), format, &resp.value)?;
        return Ok(ExitCode::SUCCESS);
    }

    let resp = client.read_open_environment(org, env, &session.id).await?;
    let options = ValueOptions {
        format,
        show_secrets: true,
        pretend,
    };
    output::write_environment(&mut std::io::stdout(), resp.environment.properties.as_ref(), options)?;

    Ok(ExitCode::SUCCESS)
}

fn report(diagnostics: &[EnvironmentDiagnostic]) -> anyhow::Result<ExitCode> {
    if output::write_diagnostics(&mut std::io::stderr(), diagnostics)? {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
