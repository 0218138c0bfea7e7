//! Terminal chat over a threadgraph session.
//!
//! Commands: `/new`, `/threads`, `/switch <thread id>`, `/quit`. Anything else
//! is sent to the assistant and the answer is streamed back.

use anyhow::Context as _;
use futures::StreamExt;
use std::io::Write;
use threadgraph::prelude::*;
use threadgraph::{AppConfig, Command};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threadgraph=info,threadgraph_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::from_env().context("reading configuration")?;
    let executor = threadgraph::build(&config)
        .await
        .context("opening checkpoint store")?;
    let mut session = ChatSession::open(executor)
        .await
        .context("loading threads")?;

    println!("thread {} (type /quit to exit)", session.thread_id());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Command::parse(line) {
            Command::Quit => break,
            Command::New => println!("thread {}", session.new_chat()),
            Command::Threads => {
                let current = session.thread_id().to_string();
                for thread_id in session.refresh().await? {
                    let marker = if *thread_id == current { "*" } else { " " };
                    println!("{} {}", marker, thread_id);
                }
            }
            Command::Switch(thread_id) => {
                for message in session.switch_to(thread_id).await? {
                    println!("{}> {}", message.role, message.content);
                }
            }
            Command::Usage(usage) => println!("{}", usage),
            Command::Send(text) => stream_turn(&session, text).await,
        }
    }
    Ok(())
}

async fn stream_turn(session: &ChatSession, text: &str) {
    let mut stream = session.send_streaming(text);
    let mut started = false;
    while let Some(event) = stream.next().await {
        match event {
            Ok(TurnEvent::Delta { content, .. }) => {
                if !started {
                    print!("assistant> ");
                    started = true;
                }
                print!("{}", content);
                let _ = std::io::stdout().flush();
            }
            Ok(TurnEvent::Message(message)) => {
                for call in &message.tool_calls {
                    println!("[calling {} {}]", call.name, call.args);
                }
                if message.role == Role::Assistant && started {
                    println!();
                    started = false;
                }
            }
            Err(e) => {
                println!();
                eprintln!("turn failed: {}", e);
            }
        }
    }
}
