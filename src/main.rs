use devcircle::configuration::get_config;
use devcircle::startup::Application;
use devcircle::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("devcircle".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let config = get_config()?;
    let application = Application::build(config).await?;
    tracing::info!(port = application.port(), "Comment service listening");
    application.run_until_stopped().await
}
