use std::{env, panic};

use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, Layer};

use crate::model::core_config::Config;
use crate::model::errors::{core_err_unexpected, LbResult};

pub static LOG_FILE: &str = "inkpot.log";

pub fn init(config: &Config) -> LbResult<()> {
    if config.logs {
        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|level| level.parse().ok())
            .unwrap_or(LevelFilter::DEBUG);
        let subscriber = tracing_subscriber::Registry::default().with(
            fmt::Layer::new()
                .with_span_events(FmtSpan::ACTIVE)
                .with_ansi(config.colored_logs)
                .with_target(true)
                .with_writer(tracing_appender::rolling::never(&config.writeable_path, LOG_FILE))
                .with_filter(filter_fn(move |metadata| {
                    metadata.target().starts_with("inkpot") && metadata.level() <= &log_level
                })),
        );
        tracing::subscriber::set_global_default(subscriber).map_err(core_err_unexpected)?;
        panic_capture();
    }
    Ok(())
}

fn panic_capture() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        error!("panic detected: {:#?}", panic_info);
        default_hook(panic_info);
    }));
}
