//! 交互式文本菜单
//!
//! 阻塞式 stdin 菜单。挖矿会话在后台任务中运行，菜单侧等待
//! Ctrl+C 或会话自然结束。

use crate::config::Config;
use crate::error::RigError;
use crate::mining::{MiningConfig, MiningManager, MiningMode, MiningState};
use crate::utils::format_quantity;
use crate::valuation::Rates;
use crate::wallet::{
    Ledger, Resource, Wallet, WalletStore, DONATION_WALLET_ID, WORLD_DEBT_WALLET_ID,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct MenuContext {
    pub store: Arc<WalletStore>,
    pub ledger: Arc<Ledger>,
    pub rates: Rates,
    pub config: Config,
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return String::new();
    }
    line.trim().to_string()
}

fn read_decimal(prompt: &str) -> Option<Decimal> {
    let raw = read_line(prompt);
    match raw.parse::<Decimal>() {
        Ok(value) => Some(value),
        Err(_) => {
            println!("❌ Invalid number format: '{}'", raw);
            None
        }
    }
}

/// 主菜单
pub async fn main_menu(ctx: &MenuContext) -> Result<(), RigError> {
    loop {
        println!("\n=== CapMiner Rig Menu ===");
        println!("1. Start Kinetic Mining (Select Rig)");
        println!("2. Start Wi-Fi Mining (Select Rig)");
        println!("3. Start SHA Capsule Mining (Select Rig)");
        println!("4. Start Cache Mining (Select Rig)");
        println!("5. Create New Rig / Wallet");
        println!("6. View Wallets & Rigs / Wallet Actions");
        println!("7. Exit");

        let choice = read_line("Enter option (1-7): ");
        let mode = match choice.as_str() {
            "1" => Some(MiningMode::Kinetic),
            "2" => Some(MiningMode::Wifi),
            "3" => Some(MiningMode::Sha),
            "4" => Some(MiningMode::Cache),
            _ => None,
        };

        if let Some(mode) = mode {
            if let Some(wallet_id) = select_wallet(ctx, true) {
                if let Err(e) = run_mining_session(ctx, &wallet_id, mode).await {
                    println!("❌ {}", e);
                }
            }
            continue;
        }

        match choice.as_str() {
            "5" => create_wallet_flow(ctx),
            "6" => {
                if let Some(wallet_id) = select_wallet(ctx, false) {
                    wallet_menu(ctx, &wallet_id);
                }
            }
            "7" => {
                println!("Exiting... 👋");
                break;
            }
            _ => println!("⚠️ Invalid selection."),
        }
    }
    Ok(())
}

/// 启动挖矿会话并等待 Ctrl+C 或会话结束
pub async fn run_mining_session(
    ctx: &MenuContext,
    wallet_id: &str,
    mode: MiningMode,
) -> Result<(), RigError> {
    let manager = MiningManager::new(
        ctx.store.clone(),
        ctx.rates.clone(),
        MiningConfig::from(&ctx.config),
    );
    manager.start(wallet_id, mode).await?;
    println!("⛏️ Mining started (press Ctrl+C to stop early)");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\n⛔ Stopping mining session...");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                if !manager.is_running().await {
                    break;
                }
            }
        }
    }

    manager.stop().await?;
    if let MiningState::Error(message) = manager.state().await {
        println!("❌ Mining session ended with an error: {}", message);
    }

    let stats = manager.stats().await;
    println!(
        "Session summary: {} ticks | +{} Capsule MB | +{} kWh | {} SHA boosts",
        stats.ticks,
        format_quantity(stats.total_capsule_mb),
        format_quantity(stats.total_kwh),
        stats.sha_boosts
    );
    Ok(())
}

/// 列出钱包并让用户选择；`mining_only` 排除系统钱包
fn select_wallet(ctx: &MenuContext, mining_only: bool) -> Option<String> {
    let wallets = match ctx.store.list() {
        Ok(wallets) => wallets,
        Err(e) => {
            println!("❌ {}", e);
            return None;
        }
    };

    let candidates: Vec<&Wallet> = wallets
        .iter()
        .filter(|w| !mining_only || !w.is_system())
        .collect();

    if candidates.is_empty() {
        println!("⚠️ No wallets/rigs found. Create one first (Option 5 in main menu).");
        return None;
    }

    println!("\nSelect a Rig/Wallet or type a Wallet ID:");
    for (i, wallet) in candidates.iter().enumerate() {
        println!("{}. {} ({})", i + 1, wallet.rig_id, wallet.wallet_id);
    }

    let choice = read_line("Enter number or Wallet ID: ");
    if let Ok(index) = choice.parse::<usize>() {
        if index >= 1 && index <= candidates.len() {
            return Some(candidates[index - 1].wallet_id.clone());
        }
    }
    if candidates.iter().any(|w| w.wallet_id == choice) {
        return Some(choice);
    }

    println!("⚠️ Invalid selection.");
    None
}

fn create_wallet_flow(ctx: &MenuContext) {
    let rig_id = read_line("Enter Rig ID (display label): ");
    let wallet_id = read_line("Enter Wallet ID: ");

    let rig = if rig_id.is_empty() {
        None
    } else {
        Some(rig_id.as_str())
    };
    match ctx.store.create(&wallet_id, rig) {
        Ok(wallet) => {
            println!(
                "✅ Created wallet/rig: {} ({}) with node {}",
                wallet.rig_id, wallet.wallet_id, wallet.node_id
            );
            let btc = read_line("Enter a BTC payout address (optional): ");
            if !btc.is_empty() {
                let mut wallet = wallet;
                wallet.btc_address = btc;
                match ctx.store.save(&wallet) {
                    Ok(()) => println!("✅ BTC address set to {}", wallet.btc_address),
                    Err(e) => println!("❌ {}", e),
                }
            }
        }
        Err(e) => println!("🛑 {}", e),
    }
}

fn prompt_resource() -> Option<Resource> {
    println!("Select resource:");
    for (i, resource) in Resource::ALL.iter().enumerate() {
        println!("  {}. {}", i + 1, resource.label());
    }
    let choice = read_line("Enter option: ");
    match choice.parse::<usize>() {
        Ok(index) if index >= 1 && index <= Resource::ALL.len() => Some(Resource::ALL[index - 1]),
        _ => {
            println!("⚠️ Invalid selection.");
            None
        }
    }
}

/// 钱包操作菜单
fn wallet_menu(ctx: &MenuContext, wallet_id: &str) {
    loop {
        let wallet = match ctx.store.load(wallet_id) {
            Ok(wallet) => wallet,
            Err(e) => {
                println!("❌ {}", e);
                break;
            }
        };

        show_dashboard(ctx, &wallet);

        println!("\n--- Wallet Actions ---");
        println!("  1. Send Resource");
        println!("  2. Send USD Value");
        println!("  3. Donate Resource to Creator (Gain Hash Power)");
        println!("  4. View Receive Info (Wallet/Node IDs)");
        println!("  5. Export Rig Info to File");
        println!("  6. World Debt Payment Plan 🌎");
        println!("  7. Set BTC Payout Address");
        println!("  8. Cash Out Watts Token");
        if wallet.wallet_id == DONATION_WALLET_ID {
            println!("  9. View Withdrawal Requests (Admin Only)");
        }
        println!(" 10. Back to Main Menu");

        match read_line("Enter option: ").as_str() {
            "1" => send_resource_flow(ctx, &wallet),
            "2" => send_usd_flow(ctx, &wallet),
            "3" => donate_flow(ctx, &wallet),
            "4" => {
                println!("\n--- Receive Info ---");
                println!("Wallet ID (for receiving resources): {}", wallet.wallet_id);
                println!("Node ID (for network interactions): {}", wallet.node_id);
                println!("Share these to receive transfers.");
            }
            "5" => export_rig_info(ctx, &wallet),
            "6" => {
                if wallet.is_system() {
                    println!("🛑 System wallets cannot access the World Debt Payment Plan.");
                } else {
                    world_debt_menu(ctx, &wallet);
                }
            }
            "7" => {
                let btc = read_line("Enter your BTC wallet address for payouts: ");
                let mut wallet = wallet;
                wallet.btc_address = btc;
                match ctx.store.save(&wallet) {
                    Ok(()) => println!("✅ BTC address set to {}", wallet.btc_address),
                    Err(e) => println!("❌ {}", e),
                }
            }
            "8" => match ctx.ledger.cash_out(wallet_id) {
                Ok(request) => println!(
                    "✅ Cash-out request for ${} queued → {}",
                    format_quantity(request.amount_usd),
                    request.btc_address
                ),
                Err(e) => println!("⚠️ {}", e),
            },
            "9" if wallet.wallet_id == DONATION_WALLET_ID => show_withdrawal_requests(ctx),
            "10" => break,
            _ => println!("⚠️ Invalid option."),
        }
    }
}

fn send_resource_flow(ctx: &MenuContext, wallet: &Wallet) {
    let Some(resource) = prompt_resource() else {
        return;
    };
    let target = read_line(&format!("Enter target Wallet ID to send {}: ", resource.label()));
    if target.is_empty() {
        println!("⚠️ No target wallet given.");
        return;
    }
    let Some(amount) = read_decimal("Amount to send: ") else {
        return;
    };

    match ctx
        .ledger
        .transfer(&wallet.wallet_id, &target, resource, amount)
    {
        Ok(()) => println!(
            "✅ Sent {} {} to {}",
            format_quantity(amount),
            resource.label(),
            target
        ),
        Err(e) => println!("⚠️ {}", e),
    }
}

fn send_usd_flow(ctx: &MenuContext, wallet: &Wallet) {
    let total = ctx.rates.total_usd(wallet);
    println!("USD-backed balance: ${}", format_quantity(total));

    let target = read_line("Enter target Wallet ID: ");
    if target.is_empty() {
        println!("⚠️ No target wallet given.");
        return;
    }
    let Some(amount) = read_decimal("USD amount to send: ") else {
        return;
    };

    match ctx.ledger.transfer_usd(&wallet.wallet_id, &target, amount) {
        Ok(()) => println!("✅ Sent ${} in value to {}", format_quantity(amount), target),
        Err(e) => println!("⚠️ {}", e),
    }
}

fn donate_flow(ctx: &MenuContext, wallet: &Wallet) {
    let Some(resource) = prompt_resource() else {
        return;
    };
    let Some(amount) = read_decimal(&format!("Amount of {} to donate: ", resource.label())) else {
        return;
    };

    match ctx.ledger.donate(&wallet.wallet_id, resource, amount) {
        Ok(hash_gain) => {
            println!("🙏 Donated {} {}.", format_quantity(amount), resource.label());
            println!("🚀 Gained {} Hash Power!", format_quantity(hash_gain));
        }
        Err(e) => println!("⚠️ {}", e),
    }
}

fn world_debt_menu(ctx: &MenuContext, wallet: &Wallet) {
    let total = ctx.rates.total_usd(wallet);
    let paid = wallet.world_debt_paid_usd;
    let remaining = ctx
        .ledger
        .config()
        .initial_world_debt_usd
        .saturating_sub(paid);

    println!("\n🌎 World Debt Payment Plan 🌎");
    println!("Your Wallet ID: {}", wallet.wallet_id);
    println!("Your Node ID: {}", wallet.node_id);
    println!("💰 Your Total USD Value: ${}", format_quantity(total));
    println!("🌍 Your Debt Paid:       ${}", format_quantity(paid));
    println!("🌍 Remaining Global Debt: ${}", format_quantity(remaining));

    let confirm = read_line("Type YES to contribute, or press Enter to cancel: ");
    if confirm != "YES" {
        println!("🛑 Cancelled.");
        return;
    }

    let Some(amount) = read_decimal("Amount to contribute (USD): ") else {
        return;
    };
    match ctx.ledger.contribute_world_debt(&wallet.wallet_id, amount) {
        Ok(()) => {
            println!("✅ Contributed ${} to the World Debt Wallet.", format_quantity(amount));
            println!("🌍 Your node has been logged as a symbolic contributor.");
        }
        Err(e) => println!("⚠️ {}", e),
    }
}

fn show_withdrawal_requests(ctx: &MenuContext) {
    match ctx.ledger.withdrawal_requests() {
        Ok(requests) if requests.is_empty() => println!("No withdrawal requests pending."),
        Ok(requests) => {
            println!("\n--- Pending Withdrawal Requests ---");
            for request in requests {
                println!("Wallet ID: {}", request.wallet_id);
                println!("Node ID: {}", request.node_id);
                println!("BTC Address: {}", request.btc_address);
                println!("Amount: ${}", format_quantity(request.amount_usd));
                println!("Requested: {}", request.requested_at);
                println!("-----------------------------");
            }
        }
        Err(e) => println!("❌ {}", e),
    }
}

/// 矿机仪表盘
pub fn show_dashboard(ctx: &MenuContext, wallet: &Wallet) {
    let total_usd = ctx.rates.total_usd(wallet);
    let effective = wallet.effective_hash_power();

    println!("\n--- Capsule Rig Dashboard — {} ---", wallet.rig_id);
    println!("Wallet ID: {}", wallet.wallet_id);
    println!("🌐 Node ID: {}", wallet.node_id);
    println!(
        "🌠 Hash Power (Permanent): {}",
        format_quantity(wallet.rig_hash_power)
    );
    println!("🚀 Hash Power (Effective): {}", format_quantity(effective));
    println!("💾 Capsule MB: {}", format_quantity(wallet.capsule_value_mb));
    println!("📦 Cache MB: {}", format_quantity(wallet.cache_value_mb));
    println!("⚡ Real kWh: {}", format_quantity(wallet.real_kwh));
    println!(
        "📡 Bandwidth: {} MB/s",
        format_quantity(wallet.bandwidth_mbps)
    );
    println!(
        "🧲 Torrent Payloads: {} MB",
        format_quantity(wallet.torrent_value_mb)
    );
    println!(
        "🔋 Watts Token: {} USD",
        format_quantity(wallet.watts_token)
    );
    println!("💵 Total USD Value: ${}", format_quantity(total_usd));

    if wallet.wallet_id == WORLD_DEBT_WALLET_ID {
        println!(
            "🌎 Total Debt Paid: ${} (this wallet's USD value)",
            format_quantity(total_usd)
        );
    } else if wallet.wallet_id != DONATION_WALLET_ID {
        println!(
            "🌎 World Debt Contributed: ${}",
            format_quantity(wallet.world_debt_paid_usd)
        );
    }
    println!("{}", "-".repeat(40));
}

/// 导出矿机信息文件
fn export_rig_info(ctx: &MenuContext, wallet: &Wallet) {
    let info = serde_json::json!({
        "wallet_id": wallet.wallet_id,
        "rig_id": wallet.rig_id,
        "node_id": wallet.node_id.to_string(),
        "capsule_value_mb": wallet.capsule_value_mb.to_f64().unwrap_or(0.0),
        "cache_value_mb": wallet.cache_value_mb.to_f64().unwrap_or(0.0),
        "real_kwh": wallet.real_kwh.to_f64().unwrap_or(0.0),
        "bandwidth_MBps": wallet.bandwidth_mbps.to_f64().unwrap_or(0.0),
        "torrent_value_mb": wallet.torrent_value_mb.to_f64().unwrap_or(0.0),
        "watts_token": wallet.watts_token.to_f64().unwrap_or(0.0),
        "rig_hash_power": wallet.rig_hash_power.to_f64().unwrap_or(0.0),
        "world_debt_paid_usd": wallet.world_debt_paid_usd.to_f64().unwrap_or(0.0),
        "btc_address": wallet.btc_address,
        "total_usd_value": ctx.rates.total_usd(wallet).to_f64().unwrap_or(0.0),
        "exported_at": chrono::Utc::now().to_rfc3339(),
    });

    let path = ctx
        .store
        .dir()
        .join(format!("rig_info_{}.json", wallet.wallet_id));
    match serde_json::to_vec_pretty(&info)
        .map_err(|e| e.to_string())
        .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()))
    {
        Ok(()) => println!("✅ Rig info exported to {}", path.display()),
        Err(e) => {
            warn!("Rig info export failed: {}", e);
            println!("❌ Error writing file: {}", e);
        }
    }
}
