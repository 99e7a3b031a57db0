use anyhow::Context;
use banp_feed::credentials::usable_token;
use banp_feed::{
    Candidate, CredentialProvider, DecisionResult, EnvToken, FeedConfig, FeedError, FeedSession,
    FileToken, HttpMatchApi, MatchApi, Page, Response, StaticToken,
};
use clap::{Arg, Command};
use log::LevelFilter;
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() {
    let matches = Command::new("banp-feed")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Browse match recommendations and answer them from the terminal")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("banp-feed.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .value_name("TOKEN")
                .help("Bearer token (overrides auth.token_file and auth.token_env)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("matches")
                .long("matches")
                .help("List established matches and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("auto")
                .long("auto")
                .value_name("RESPONSE")
                .help("Answer every candidate with this response (like/unlike) instead of prompting")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .value_name("N")
                .help("Stop after N decisions in --auto mode")
                .value_parser(clap::value_parser!(usize))
                .default_value("10"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("banp-feed.yaml");

    let verbose = matches.get_flag("verbose");
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Trace)
        .init();
    log::set_max_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    let config = match FeedConfig::load_or_default(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    if !verbose {
        log::set_max_level(config.log_level());
    }

    let credentials = credential_provider(&config, matches.get_one::<String>("token"));
    let api: Arc<dyn MatchApi> = match HttpMatchApi::new(
        &config.api.base_url,
        config.api.timeout_seconds,
        &config.api.user_agent,
    ) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            eprintln!("Error creating API client: {e}");
            process::exit(1);
        }
    };

    let result = if matches.get_flag("matches") {
        list_matches(api, credentials, config.feed.matches_page_size).await
    } else if let Some(auto) = matches.get_one::<String>("auto") {
        let response = match auto.parse::<Response>() {
            Ok(response) => response,
            Err(e) => {
                eprintln!("{e}");
                process::exit(2);
            }
        };
        let limit = matches.get_one::<usize>("limit").copied().unwrap_or(10);
        run_auto(api, credentials, config.feed.page_size, response, limit).await
    } else {
        run_interactive(api, credentials, config.feed.page_size).await
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn credential_provider(config: &FeedConfig, token: Option<&String>) -> Arc<dyn CredentialProvider> {
    if let Some(token) = token {
        Arc::new(StaticToken::new(token.clone()))
    } else if let Some(path) = &config.auth.token_file {
        Arc::new(FileToken::new(path))
    } else {
        Arc::new(EnvToken::new(config.auth.token_env.clone()))
    }
}

async fn list_matches(
    api: Arc<dyn MatchApi>,
    credentials: Arc<dyn CredentialProvider>,
    page_size: u32,
) -> anyhow::Result<()> {
    let token = usable_token(credentials.as_ref())
        .await
        .ok_or(FeedError::MissingCredential)?;
    let entries = api
        .fetch_matches(
            &token,
            Page {
                number: 1,
                size: page_size,
            },
        )
        .await
        .context("Failed to fetch matches")?;

    if entries.is_empty() {
        println!("No matches found");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{:<24} {:<32} discord: {}",
            entry.name,
            entry.email.as_deref().unwrap_or("-"),
            entry.discord.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn run_auto(
    api: Arc<dyn MatchApi>,
    credentials: Arc<dyn CredentialProvider>,
    page_size: u32,
    response: Response,
    limit: usize,
) -> anyhow::Result<()> {
    let mut session = FeedSession::new(api, credentials, page_size);
    session.start().await?;

    for _ in 0..limit {
        let Some(candidate) = session.current_candidate() else {
            print_no_content();
            return Ok(());
        };
        print_candidate(candidate);

        match session.decide(response).await? {
            DecisionResult::Matched(candidate) => {
                print_match(&candidate);
                // The matched candidate stays current; stop instead of re-answering it
                return Ok(());
            }
            DecisionResult::Exhausted => {
                print_no_content();
                return Ok(());
            }
            DecisionResult::Advanced | DecisionResult::Unchanged => {}
        }
    }
    Ok(())
}

async fn run_interactive(
    api: Arc<dyn MatchApi>,
    credentials: Arc<dyn CredentialProvider>,
    page_size: u32,
) -> anyhow::Result<()> {
    let mut session = FeedSession::new(api, credentials, page_size);
    session.start().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Some(candidate) = session.current_candidate() else {
            print_no_content();
            return Ok(());
        };
        print_candidate(candidate);
        println!("[y] like  [n] unlike  [r] retry loading  [q] quit");

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let input = line.trim();
        if input.eq_ignore_ascii_case("q") {
            return Ok(());
        }
        if input.eq_ignore_ascii_case("r") {
            report(session.refill().await);
            continue;
        }

        let response = match input.parse::<Response>() {
            Ok(response) => response,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match session.decide(response).await {
            Ok(DecisionResult::Matched(candidate)) => print_match(&candidate),
            Ok(DecisionResult::Exhausted) => {
                print_no_content();
                return Ok(());
            }
            Ok(DecisionResult::Advanced | DecisionResult::Unchanged) => {}
            Err(FeedError::MissingCredential) => return Err(FeedError::MissingCredential.into()),
            Err(e) => println!("⚠️  {e}"),
        }
    }
}

fn report(result: Result<DecisionResult, FeedError>) {
    match result {
        Ok(DecisionResult::Exhausted) => print_no_content(),
        Ok(DecisionResult::Unchanged) => println!("Nothing to reload"),
        Ok(_) => {}
        Err(e) => println!("⚠️  {e}"),
    }
}

fn print_candidate(candidate: &Candidate) {
    println!();
    println!("{}", candidate.name);
    println!("{} · {}yo", candidate.gender.label(), candidate.age());
    if !candidate.games.is_empty() {
        let games: Vec<&str> = candidate.games.iter().map(|g| g.name.as_str()).collect();
        println!("plays: {}", games.join(", "));
    }
    if let Some(image) = &candidate.image {
        println!("photo: {image}");
    }
}

fn print_match(candidate: &Candidate) {
    println!("🎉 Congratulations! You have a new match to play with {}!", candidate.name);
}

fn print_no_content() {
    println!("No more recommendations for now.\nCheck back later!");
}

fn generate_default_config(path: &str) {
    let config = FeedConfig::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}
