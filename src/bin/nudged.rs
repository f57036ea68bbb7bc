use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;

use nudge::core::{format_interval, Config, SinkKind};
use nudge::{ChannelSink, LogSink, ReminderScheduler, SchedulerOptions, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting nudged reminder daemon...");

    let clock = Arc::new(SystemClock);
    let options = SchedulerOptions {
        delivery_budget: config.delivery_budget,
        ..Default::default()
    };

    let scheduler = match config.sink {
        SinkKind::Log => ReminderScheduler::with_options(clock, Arc::new(LogSink), options),
        SinkKind::Json => {
            let (sink, mut events) = ChannelSink::new();
            // fired reminders become JSON lines for downstream consumers
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{line}"),
                        Err(e) => error!("Failed to encode notification event: {e}"),
                    }
                }
            });
            ReminderScheduler::with_options(clock, Arc::new(sink), options)
        }
    };

    // say hello right away, then settle into the interval
    if config.startup_fire {
        if let Err(e) = scheduler.fire_now(config.message.clone()).await {
            error!("Startup test notification failed: {e}");
        }
    }

    let id = scheduler.create(config.message.clone(), config.interval, config.repeating)?;
    info!(
        "Reminder {id} armed: every {}, repeating={}",
        format_interval(config.interval.num_seconds()),
        config.repeating
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down, cancelling active reminders");
    scheduler.cancel_all();

    Ok(())
}
