use {
    rotsink::{Capacity, RotatingSinkBuilder},
    tracing_subscriber::{util::SubscriberInitExt, EnvFilter},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let appender = RotatingSinkBuilder::new("./logs/tracing.log")
        .capacity(Capacity::MB(1))
        .backup_count(3)
        .create_dirs(true)
        .build()?;
    let (non_blocking, _guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_ansi(false)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .finish()
        .try_init()?;

    tracing::info!("This is an info message");
    tracing::warn!("This is a warning message");
    tracing::error!("This is an error message");

    Ok(())
}
