use syllable_bot::cli::parse_cli;
use syllable_bot::config::BotConfig;
use syllable_bot::dictionary::Dictionary;
use syllable_bot::info_log;
use syllable_bot::logging::{FacadeLog, init_logging};
use syllable_bot::server::BotServer;
use syllable_bot::session::Session;
use syllable_bot::solver::Solver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = parse_cli();
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    info_log!("[INIT] Options: {cli:?}");

    let dictionary_dir = cli.dictionary_dir();
    log::info!(
        "[INIT] Starting, dictionaries in {}",
        dictionary_dir.display()
    );

    let dictionary = Dictionary::new(dictionary_dir, FacadeLog::shared("syllable_bot::dictionary"));
    let mut solver =
        Solver::new(FacadeLog::shared("syllable_bot::solver")).with_random_pool(cli.random_pool);
    solver.set_strategy(cli.strategy);
    let session = Session::new(
        dictionary,
        solver,
        BotConfig::default(),
        FacadeLog::shared("syllable_bot::session"),
    )
    .with_default_language(cli.language.clone());

    let server = BotServer::bind(
        &cli.address(),
        session,
        FacadeLog::shared("syllable_bot::server"),
    )
    .await?;

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("[STOP] Cannot listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
            log::info!("[STOP] Stopped by user");
        })
        .await?;
    Ok(())
}
