use std::sync::Arc;

use recograph_core::config::{AppConfig, LoadOptions};
use recograph_core::domain::customer::CustomerId;
use recograph_core::domain::product::ProductId;
use recograph_engine::{RecommendError, Recommendation, Recommender, Seed};
use recograph_store::HttpGraphStore;

use super::CommandResult;

#[derive(Debug)]
pub struct RecommendArgs {
    pub seed: String,
    pub product: bool,
    pub max_hops: Option<u32>,
    pub top_k: Option<usize>,
    pub max_candidates: Option<usize>,
    pub include_owned: bool,
    pub json: bool,
}

pub fn run(args: RecommendArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: 2,
                output: format!("config validation failed: {error}"),
            }
        }
    };

    let mut options = config.engine.options();
    if let Some(max_hops) = args.max_hops {
        options.max_hops = max_hops;
    }
    if let Some(top_k) = args.top_k {
        options.top_k = top_k;
    }
    if let Some(max_candidates) = args.max_candidates {
        options.max_candidates = max_candidates;
    }
    if args.include_owned {
        options.exclude_owned = false;
    }

    let seed = if args.product {
        Seed::Product(ProductId::new(args.seed.clone()))
    } else {
        Seed::Customer(CustomerId::new(args.seed.clone()))
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult {
                exit_code: 1,
                output: format!("failed to initialize async runtime: {error}"),
            }
        }
    };

    let outcome = runtime.block_on(async {
        let store = HttpGraphStore::connect(&config.store)?;
        let recommender = Recommender::new(Arc::new(store));
        recommender.recommend(&seed, &options).await
    });

    match outcome {
        Ok(results) => CommandResult { exit_code: 0, output: render(&seed, &results, args.json) },
        Err(error) => failure(&error),
    }
}

fn render(seed: &Seed, results: &[Recommendation], json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(results)
            .unwrap_or_else(|error| format!("{{\"error\":\"serialization failed: {error}\"}}"));
    }

    if results.is_empty() {
        return format!("no recommendations for {seed}");
    }

    let mut lines = vec![format!("recommendations for {seed}:")];
    for (rank, recommendation) in results.iter().enumerate() {
        lines.push(format!(
            "{:>3}. {} ({}) score={:.3} via {} path(s), nearest hop {}",
            rank + 1,
            recommendation.product.name,
            recommendation.product.id,
            recommendation.score,
            recommendation.explanation.path_count,
            recommendation.explanation.hop_distance,
        ));
    }
    lines.join("\n")
}

fn failure(error: &RecommendError) -> CommandResult {
    let (exit_code, hint) = match error {
        RecommendError::InvalidOptions(_) | RecommendError::SeedNotFound(_) => (2, ""),
        error if error.is_transient() => (3, " (transient: retry later)"),
        _ => (1, ""),
    };

    CommandResult { exit_code, output: format!("recommend failed: {error}{hint}") }
}
