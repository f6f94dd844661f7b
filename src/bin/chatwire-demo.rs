//! Minimal terminal chat client
//!
//! Connects to a broker, joins one topic, prints inbound messages, and
//! publishes each stdin line. Useful for poking at a broker by hand:
//!
//! ```text
//! RUST_LOG=chatwire_client=debug chatwire-demo ws://127.0.0.1:4222 general
//! ```

use chatwire::{ChatClient, ClientConfig};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:4222".to_string());
    let topic = std::env::args().nth(2).unwrap_or_else(|| "general".to_string());

    let client = ChatClient::new(ClientConfig::default())?;
    client.on_message(|msg| {
        println!("[{}] {}: {}", msg.topic, msg.username, msg.content);
    });

    if !client.connect(&url, None, None).await? {
        eprintln!("could not connect to {url}");
        return Ok(());
    }
    let _sub = client.subscribe(&topic).await;
    println!(
        "connected to {url} as {}; type a message, ctrl-d to quit",
        client.username()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !client.publish(&topic, line).await {
            eprintln!("message not sent (disconnected?)");
        }
    }

    client.disconnect().await;
    Ok(())
}
