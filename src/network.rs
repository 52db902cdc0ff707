use crate::commands::*;
use crate::container::Container;
use crate::models::UserId;
use crate::panel::LootPanel;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Outgoing message channels of the connected players
pub type Writers = Arc<RwLock<HashMap<UserId, UnboundedSender<String>>>>;

/// One line of a backpack listing.
pub fn slot_line(slot: usize, shortname: &str, amount: i32, skin: u64) -> String {
    format!("[{}] {} x{} (skin {})\n", slot, shortname, amount, skin)
}

/// Shows backpacks to players over their connection.
pub struct ChannelPanel {
    writers: Writers,
}

impl ChannelPanel {
    pub fn new(writers: Writers) -> Self {
        Self { writers }
    }

    fn send(&self, user: UserId, msg: String) {
        if let Ok(writers) = self.writers.read()
            && let Some(tx) = writers.get(&user)
        {
            let _ = tx.send(msg);
        }
    }
}

impl LootPanel for ChannelPanel {
    fn attach(&mut self, owner: UserId, container: &Container) {
        let mut msg = format!(
            "Backpack opened ({}/{} slots)\n",
            container.len(),
            container.capacity()
        );
        for (slot, item) in container.iter().enumerate() {
            msg.push_str(&slot_line(slot, &item.shortname, item.amount, item.skin));
        }
        self.send(owner, msg);
    }

    fn detach(&mut self, owner: UserId) {
        self.send(owner, "Backpack closed\n".to_string());
    }
}

/// Starts the TCP server and serves connections until ctrl-c, then unloads
/// the plugin so every open backpack is saved.
pub async fn start_server(addr: &str, state: SharedBackpacks, writers: Writers) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server is running on {}", listener.local_addr()?);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };
                tracing::debug!("Connection from {}", peer);
                let state = Arc::clone(&state);
                let writers = Arc::clone(&writers);
                tokio::spawn(async move {
                    handle_client(socket, state, writers).await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    if let Err(e) = state.lock().await.unload() {
        tracing::error!("Some backpacks could not be saved: {}", e);
    }
    Ok(())
}

/// Handles a single client connection: reads commands, processes them, and sends responses.
pub async fn handle_client(socket: TcpStream, state: SharedBackpacks, writers: Writers) {
    let (reader, writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    let mut user_id: Option<UserId> = None;

    // Create a channel for sending messages to this client
    let (tx, mut rx): (UnboundedSender<String>, UnboundedReceiver<String>) = unbounded_channel();

    // Task for sending messages from the channel to the writer
    tokio::spawn(async move {
        let mut writer = writer;
        while let Some(msg) = rx.recv().await {
            if writer.write_all(msg.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let _ = tx.send("Welcome to the Backpack Server!\n".to_string());
    let _ = tx.send(
        "Commands: LOGIN <id>, BACKPACK, DEPOSIT <item> <amount> [skin], TAKE <slot>, CLOSE, SHOW, QUIT\n"
            .to_string(),
    );

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Read error: {}", e);
                break;
            }
        }
        let cmd = line.trim();
        let mut parts = cmd.split_whitespace();
        match parts.next().map(str::to_ascii_uppercase).as_deref() {
            Some("LOGIN") => {
                if let Some(id) = parts.next() {
                    handle_login(id, &state, &writers, &tx, &mut user_id).await;
                } else {
                    let _ = tx.send("Usage: LOGIN <id>\n".to_string());
                }
            }
            Some("BACKPACK") => {
                handle_backpack(&user_id, &state, &tx).await;
            }
            Some("DEPOSIT") => {
                let shortname = parts.next();
                let amount = parts.next().and_then(|a| a.parse::<i32>().ok());
                let skin = parts.next().map(str::parse::<u64>);
                match (shortname, amount, skin) {
                    (Some(shortname), Some(amount), None) => {
                        handle_deposit(&user_id, shortname, amount, 0, &state, &tx).await;
                    }
                    (Some(shortname), Some(amount), Some(Ok(skin))) => {
                        handle_deposit(&user_id, shortname, amount, skin, &state, &tx).await;
                    }
                    _ => {
                        let _ = tx.send("Usage: DEPOSIT <item> <amount> [skin]\n".to_string());
                    }
                }
            }
            Some("TAKE") => {
                if let Some(Ok(slot)) = parts.next().map(str::parse::<usize>) {
                    handle_take(&user_id, slot, &state, &tx).await;
                } else {
                    let _ = tx.send("Usage: TAKE <slot>\n".to_string());
                }
            }
            Some("CLOSE") => {
                handle_close(&user_id, &state, &tx).await;
            }
            Some("SHOW") => {
                handle_show(&user_id, &state, &tx).await;
            }
            Some("QUIT") => {
                let _ = tx.send("Bye!\n".to_string());
                break;
            }
            Some(_) => {
                let _ = tx.send(format!("Unknown command: {}\n", cmd));
            }
            None => {}
        }
    }

    handle_disconnect(&user_id, &state, &writers).await;
}
