use crate::backpacks::{Backpacks, PendingOpen};
use crate::models::UserId;
use crate::network::{Writers, slot_line};
use crate::permissions::PERM_USE;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// The plugin as shared between connections
pub type SharedBackpacks = Arc<Mutex<Backpacks>>;

/// Handles login. Binds the connection to a player and runs the connect hook.
pub async fn handle_login(
    id: &str,
    state: &SharedBackpacks,
    writers: &Writers,
    tx: &UnboundedSender<String>,
    user_id: &mut Option<UserId>,
) {
    if user_id.is_some() {
        let _ = tx.send("Already logged in\n".to_string());
        return;
    }
    let Ok(user) = id.parse::<UserId>() else {
        let _ = tx.send("Player id must be a number\n".to_string());
        return;
    };

    {
        let Ok(mut writers) = writers.write() else {
            let _ = tx.send("Server error\n".to_string());
            return;
        };
        if writers.contains_key(&user) {
            let _ = tx.send("Player already connected\n".to_string());
            return;
        }
        writers.insert(user, tx.clone());
    }
    *user_id = Some(user);

    let has_backpack = {
        let mut backpacks = state.lock().await;
        if backpacks.config().grant_on_connect {
            backpacks.permissions_mut().grant(user, PERM_USE);
        }
        backpacks.on_player_connected(user)
    };
    tracing::info!("Player {} connected", user);

    if has_backpack {
        let _ = tx.send(format!("Welcome {}. Type BACKPACK to open your backpack.\n", user));
    } else {
        let _ = tx.send(format!("Welcome {}.\n", user));
    }
}

/// Handles the backpack command. The backpack opens after the configured delay.
pub async fn handle_backpack(user_id: &Option<UserId>, state: &SharedBackpacks, tx: &UnboundedSender<String>) {
    let Some(user) = *user_id else {
        let _ = tx.send("You must log in first\n".to_string());
        return;
    };

    let (pending, delay) = {
        let mut backpacks = state.lock().await;
        (backpacks.backpack_command(user), backpacks.open_delay())
    };
    if let Some(pending) = pending {
        schedule_open(Arc::clone(state), pending, delay);
    }
}

/// Completes a pending open once `delay` has passed.
pub fn schedule_open(state: SharedBackpacks, pending: PendingOpen, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let mut backpacks = state.lock().await;
        match backpacks.complete_open(pending) {
            Ok(Some(_)) => {}
            Ok(None) => tracing::debug!("Open for {} was cancelled", pending.user),
            Err(e) => tracing::warn!("Failed to open backpack of {}: {}", pending.user, e),
        }
    })
}

/// Handles moving a new item into the open backpack.
pub async fn handle_deposit(
    user_id: &Option<UserId>,
    shortname: &str,
    amount: i32,
    skin: u64,
    state: &SharedBackpacks,
    tx: &UnboundedSender<String>,
) {
    let Some(user) = *user_id else {
        let _ = tx.send("You must log in first\n".to_string());
        return;
    };

    let result = state.lock().await.deposit(user, shortname, amount, skin);
    match result {
        Ok(slot) => {
            let _ = tx.send(format!("Put {} x{} in slot {}\n", shortname, amount, slot));
        }
        Err(e) => {
            let _ = tx.send(format!("Deposit error: {}\n", e));
        }
    }
}

/// Handles taking an item out of the open backpack.
pub async fn handle_take(user_id: &Option<UserId>, slot: usize, state: &SharedBackpacks, tx: &UnboundedSender<String>) {
    let Some(user) = *user_id else {
        let _ = tx.send("You must log in first\n".to_string());
        return;
    };

    let result = state.lock().await.take(user, slot);
    match result {
        Ok(item) => {
            let _ = tx.send(format!("Took {} x{}\n", item.shortname, item.amount));
        }
        Err(e) => {
            let _ = tx.send(format!("Take error: {}\n", e));
        }
    }
}

/// Handles the player closing their loot panel.
pub async fn handle_close(user_id: &Option<UserId>, state: &SharedBackpacks, tx: &UnboundedSender<String>) {
    let Some(user) = *user_id else {
        let _ = tx.send("You must log in first\n".to_string());
        return;
    };

    let result = state.lock().await.on_loot_end(user, user);
    match result {
        Ok(true) => {}
        Ok(false) => {
            let _ = tx.send("Your backpack is not open\n".to_string());
        }
        Err(e) => {
            tracing::error!("Failed to save backpack of {}: {}", user, e);
            let _ = tx.send("Could not save your backpack, it stays open\n".to_string());
        }
    }
}

/// Shows the contents of the open backpack.
pub async fn handle_show(user_id: &Option<UserId>, state: &SharedBackpacks, tx: &UnboundedSender<String>) {
    let Some(user) = *user_id else {
        let _ = tx.send("You must log in first\n".to_string());
        return;
    };

    let contents = state.lock().await.contents(user);
    match contents {
        Some(records) if records.is_empty() => {
            let _ = tx.send("Your backpack is empty\n".to_string());
        }
        Some(records) => {
            let mut lines = String::new();
            for (slot, record) in records.iter().enumerate() {
                lines.push_str(&slot_line(slot, &record.shortname, record.amount, record.skin));
            }
            let _ = tx.send(lines);
        }
        None => {
            let _ = tx.send("Your backpack is not open\n".to_string());
        }
    }
}

/// Runs the disconnect hook and forgets the connection.
pub async fn handle_disconnect(user_id: &Option<UserId>, state: &SharedBackpacks, writers: &Writers) {
    let Some(user) = *user_id else {
        return;
    };

    if let Err(e) = state.lock().await.on_player_disconnected(user) {
        tracing::error!("Failed to save backpack of {} on disconnect: {}", user, e);
    }
    if let Ok(mut writers) = writers.write() {
        writers.remove(&user);
    }
    tracing::info!("Player {} disconnected", user);
}
