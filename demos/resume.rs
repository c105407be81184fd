use std::sync::Arc;

use lda_gibbs_sampler::{Corpus, LdaSampler, TrainOptions};

fn main() -> lda_gibbs_sampler::Result<()> {
    let corpus = Arc::new(Corpus::random(5_000, 120, 25, 7)?);
    let mut model = LdaSampler::new(corpus, "document", 15)?;
    model.train(
        50,
        TrainOptions {
            seed: Some(1),
            ..Default::default()
        },
    )?;
    println!("trained to iteration {}", model.iteration());

    // checkpoint, reload, continue
    let path = std::env::temp_dir().join("lda-resume-demo.cbor");
    model.save(&path)?;
    println!("checkpoint written to {}", path.display());

    let mut restored = LdaSampler::load(&path)?;
    assert_eq!(restored.iteration(), model.iteration());
    assert_eq!(restored.z(), model.z());
    assert!(restored.log_probs().is_none());

    restored.train(
        50,
        TrainOptions {
            seed: Some(2),
            ..Default::default()
        },
    )?;
    println!("resumed to iteration {}", restored.iteration());

    std::fs::remove_file(&path)?;
    Ok(())
}
