use std::sync::Arc;

use lda_gibbs_sampler::{Corpus, LdaSampler, SamplerOptions, TrainOptions};

fn main() -> lda_gibbs_sampler::Result<()> {
    // build a tiny corpus: two loose "themes" across six documents
    let docs = vec![
        vec!["rust", "compiler", "borrow", "checker", "rust", "lifetime"],
        vec!["soup", "noodle", "broth", "miso", "noodle"],
        vec!["rust", "trait", "generics", "compiler", "rust"],
        vec!["broth", "ramen", "noodle", "soup", "miso", "ramen"],
        vec!["lifetime", "borrow", "rust", "trait"],
        vec!["ramen", "miso", "soup", "broth"],
    ];
    let corpus = Arc::new(Corpus::from_documents(&docs));

    // two topics, single worker so runs are reproducible
    let opts = SamplerOptions {
        n_workers: Some(1),
        ..Default::default()
    };
    let mut model = LdaSampler::with_options(corpus, "document", 2, opts)?;
    model.train(
        200,
        TrainOptions {
            track_likelihood: true,
            seed: Some(42),
        },
    )?;

    println!("iteration: {}", model.iteration());
    if let Some(log_probs) = model.log_probs() {
        if let (Some(first), Some(last)) = (log_probs.first(), log_probs.last()) {
            println!("log p(w,z): {:.3} -> {:.3}", first.1, last.1);
        }
    }

    // top words per topic
    let word_top = model.word_top();
    for k in 0..model.k() {
        let mut by_count: Vec<(u32, usize)> = (0..model.vocab_size())
            .map(|w| (word_top[[w, k]], w))
            .collect();
        by_count.sort_unstable_by(|a, b| b.cmp(a));
        let words: Vec<&str> = by_count
            .iter()
            .take(5)
            .filter(|&&(count, _)| count > 0)
            .filter_map(|&(_, w)| model.corpus().word(w as u32))
            .collect();
        println!("topic {k}: {}", words.join(" "));
    }
    Ok(())
}
