//! `roster` - CLI for the student records service
//!
//! This binary runs the resource API, or acts as a client of a running one
//! to list, show, add, edit and delete students.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use roster::cli::{Cli, Command, ConfigCommand, RemoteArgs, ServeCommand};
use roster::{api, init_logging, view, Config, StudentClient, StudentList};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, serve_cmd).await,
        Command::List { remote } => handle_list(&config, &remote).await,
        Command::Show { remote, cmd } => {
            let client = client_for(&config, &remote)?;
            let student = client.get(&cmd.id).await?;
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&student)?);
            } else {
                print!("{}", view::render_detail(&student));
            }
            Ok(())
        }
        Command::Add { remote, cmd } => {
            let client = client_for(&config, &remote)?;
            let student = client.create(&cmd.into()).await?;
            println!("Created {}", student.id);
            print!("{}", view::render_detail(&student));
            Ok(())
        }
        Command::Edit { remote, cmd } => {
            let client = client_for(&config, &remote)?;
            let student = client.update(&cmd.id, &cmd.patch()).await?;
            print!("{}", view::render_detail(&student));
            Ok(())
        }
        Command::Delete { remote, cmd } => {
            let mut list = StudentList::new(client_for(&config, &remote)?);
            list.load().await;
            let result = list.delete(&cmd.id).await;
            print!("{}", view::render_table(list.students()));
            result.with_context(|| format!("failed to delete {}", cmd.id))
        }
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

async fn handle_serve(mut config: Config, cmd: ServeCommand) -> anyhow::Result<()> {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    if let Some(database) = cmd.database {
        config.store.database_path = Some(database);
    }
    config.validate()?;
    api::serve(&config).await
}

async fn handle_list(config: &Config, remote: &RemoteArgs) -> anyhow::Result<()> {
    let mut list = StudentList::new(client_for(config, remote)?);
    if !list.load().await {
        anyhow::bail!("could not load students from {}", list.client().base_url());
    }
    print!("{}", view::render_table(list.students()));
    Ok(())
}

fn client_for(config: &Config, remote: &RemoteArgs) -> roster::Result<StudentClient> {
    let base_url = remote.url.as_deref().unwrap_or(&config.client.base_url);
    StudentClient::new(base_url)
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Host:               {}", config.server.host);
                println!("  Port:               {}", config.server.port);
                println!();
                println!("[Store]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Pool size:          {}", config.store.pool_size);
                println!();
                println!("[Client]");
                println!("  Base URL:           {}", config.client.base_url);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
