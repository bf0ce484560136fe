use std::env;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use concierge_rag::cloudflare::{Vectorize, WorkersAi};
use concierge_rag::{AnswerPipeline, InMemoryVectorIndex};
use concierge_server::{ServerConfig, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut builder = AnswerPipeline::builder();

    match (env_nonempty("CLOUDFLARE_ACCOUNT_ID"), env_nonempty("CLOUDFLARE_API_TOKEN")) {
        (Some(account), Some(token)) => {
            let ai = Arc::new(WorkersAi::new(account.clone(), token.clone())?);
            builder = builder.embedder(ai.clone()).generator(ai);

            match env_nonempty("VECTORIZE_INDEX") {
                Some(index_name) => {
                    info!(index = %index_name, "using Vectorize index");
                    builder = builder.index(Arc::new(Vectorize::new(account, token, index_name)?));
                }
                None => {
                    info!("VECTORIZE_INDEX not set, using in-memory index");
                    builder = builder.index(Arc::new(InMemoryVectorIndex::new()));
                }
            }
        }
        _ => {
            info!(
                "CLOUDFLARE_ACCOUNT_ID / CLOUDFLARE_API_TOKEN not set, \
                 running in no-provider mode"
            );
        }
    }

    let pipeline = Arc::new(builder.build()?);

    let config = ServerConfig {
        host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
        port: env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8788),
    };
    run_server(config, pipeline).await
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
