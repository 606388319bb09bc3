use std::{borrow::Cow, sync::Arc, time::Duration};

use teloxide::{
    error_handlers::LoggingErrorHandler,
    prelude::*,
    update_listeners::webhooks::{self, Options},
};
use tracing_subscriber::EnvFilter;
use vocabot::{
    config::Config,
    database::connection::Connection,
    quiz::QuizEngine,
    schema::schema,
    translator::{load_dictionary, GoogleTranslate, Translator},
    web, BoxedError,
};

const TRANSLATION_TIMEOUT: Duration = Duration::from_secs(10);

fn init_tracing(log_level: &str) -> Result<(), BoxedError> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(log_level)?)
        .json()
        .with_line_number(true)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxedError> {
    let config = Config::from_env()?;
    init_tracing(&config.log_level)?;

    let connection = Arc::new(Connection::connect(Cow::Borrowed(config.database_url.as_str())).await?);
    connection.run_migrations().await?;

    let translator = Arc::new(Translator::new(
        GoogleTranslate::new(TRANSLATION_TIMEOUT)?,
        load_dictionary(&config.dictionary_path),
    ));
    tracing::info!(
        "Translator ready with {} dictionary words",
        translator.dictionary_size()
    );

    let bot = Bot::new(&config.bot_token);
    let engine = QuizEngine::new(Arc::clone(&connection), Arc::new(bot.clone()), config.quiz);

    let web_app = web::router(Arc::clone(&connection));
    let web_addr = config.web_addr;
    tokio::spawn(async move {
        if let Err(e) = web::serve(web_addr, web_app).await {
            tracing::error!("Web server stopped: {}", e);
        }
    });

    tracing::info!("Starting bot...");
    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![connection, translator, engine])
        .enable_ctrlc_handler()
        .build();

    match config.webhook {
        Some(webhook) => {
            tracing::info!("Receiving updates through webhook {}", webhook.url);
            let listener = webhooks::axum(bot, Options::new(webhook.addr, webhook.url)).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => dispatcher.dispatch().await,
    }

    Ok(())
}
