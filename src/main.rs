use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use capminer_rs::config::{Args, Command, Config};
use capminer_rs::logging::{init_logging, LogConfig};
use capminer_rs::menu::{self, MenuContext};
use capminer_rs::wallet::ledger::LedgerConfig;
use capminer_rs::wallet::{Ledger, WalletStore};

#[tokio::main]
async fn main() {
    // 解析命令行参数
    let args = Args::parse();

    // 加载配置
    let mut config = match Config::load_or_default(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return;
        }
    };
    if let Some(dir) = &args.wallet_dir {
        config.wallet.dir = dir.clone();
    }
    if let Some(level) = &args.log_level {
        config.general.log_level = level.clone();
    }

    // 初始化日志系统；guard 要活到进程结束
    let _log_guard = match init_logging(&LogConfig {
        level: config.general.log_level.clone(),
        file_path: config.general.log_file.clone(),
        colored: true,
    }) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return;
        }
    };

    info!("🚀 Starting CapMiner-RS v{}", env!("CARGO_PKG_VERSION"));
    if std::path::Path::new(&args.config).exists() {
        info!("📋 Configuration loaded from: {}", args.config);
    } else {
        info!("📋 Config file {} not found, using defaults", args.config);
    }

    // 打开钱包存储并确保系统钱包就绪
    let store = match WalletStore::open(
        config.wallet.dir.clone(),
        config.mining.base_hash_power,
        config.wallet.encrypt,
    ) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("❌ Failed to open wallet store: {}", e);
            return;
        }
    };
    if let Err(e) = store.init_system_wallets() {
        error!("❌ Failed to initialize system wallets: {}", e);
        return;
    }

    let rates = config.rates.clone();
    let ledger = Arc::new(Ledger::new(
        store.clone(),
        rates.clone(),
        LedgerConfig::from(&config),
    ));

    let ctx = MenuContext {
        store,
        ledger,
        rates,
        config,
    };

    match args.command {
        Some(Command::Mine { wallet, mode }) => {
            if let Err(e) = menu::run_mining_session(&ctx, &wallet, mode).await {
                error!("❌ Mining session failed: {}", e);
            }
        }
        Some(Command::Create { wallet, rig }) => match ctx.store.create(&wallet, rig.as_deref()) {
            Ok(created) => println!(
                "✅ Created wallet/rig: {} ({}) with node {}",
                created.rig_id, created.wallet_id, created.node_id
            ),
            Err(e) => error!("🛑 {}", e),
        },
        Some(Command::Dashboard { wallet }) => match ctx.store.load(&wallet) {
            Ok(loaded) => menu::show_dashboard(&ctx, &loaded),
            Err(e) => error!("❌ {}", e),
        },
        Some(Command::List) => match ctx.store.list() {
            Ok(wallets) => {
                for wallet in wallets {
                    println!(
                        "{} ({}) — node {}",
                        wallet.rig_id, wallet.wallet_id, wallet.node_id
                    );
                }
            }
            Err(e) => error!("❌ {}", e),
        },
        None => {
            if let Err(e) = menu::main_menu(&ctx).await {
                error!("❌ Menu error: {}", e);
            }
        }
    }

    info!("👋 CapMiner-RS exited");
}
