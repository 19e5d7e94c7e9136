use news_collector::{Config, ImagePipeline, NewsCollector, ObjectStorage, Repository};

#[tokio::main]
async fn main() -> news_collector::Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;

    let repo = Repository::new(&config.db_path).await?;

    let storage = match &config.s3_bucket {
        Some(bucket) => Some(ObjectStorage::new(bucket.clone(), config.s3_public_url.clone()).await),
        None => None,
    };

    let collector = NewsCollector::new(repo, ImagePipeline::new(storage));

    // A failed run surfaces as Err after the log has been finalized
    // best-effort; completed runs carry partial errors in the log itself.
    match collector.collect(None).await {
        Ok(log) => {
            println!(
                "Run {} {}: collected {}, duplicates {}, failed {}",
                log.id,
                log.status.as_str(),
                log.collected,
                log.duplicates,
                log.failed
            );
            for error in &log.errors {
                eprintln!("  error: {}", error);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Collection run failed: {}", e);
            std::process::exit(1);
        }
    }
}
