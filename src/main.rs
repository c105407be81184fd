use std::{env, fs, process::ExitCode, sync::Arc, time::Instant};

use log::info;

use lda_gibbs_sampler::{Corpus, LdaError, LdaSampler, Result, SamplerOptions, TrainOptions};

// 環境変数で上書きできる実行時設定
const ENV_WORKERS: &str = "LDA_WORKERS";
const ENV_SEED: &str = "LDA_SEED";

fn usage() -> &'static str {
    "usage:\n  \
     lda-gibbs-sampler demo [K] [ITERS]\n  \
     lda-gibbs-sampler train <out.cbor> <K> <ITERS> <doc files...>\n  \
     lda-gibbs-sampler resume <model.cbor> <ITERS>\n  \
     lda-gibbs-sampler topics <model.cbor> [N]\n\n\
     env: LDA_WORKERS (worker count), LDA_SEED (training seed)"
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn sampler_options() -> SamplerOptions {
    SamplerOptions {
        n_workers: env_usize(ENV_WORKERS),
        ..Default::default()
    }
}

fn train_options(track: bool) -> TrainOptions {
    TrainOptions {
        track_likelihood: track,
        seed: env_u64(ENV_SEED),
    }
}

/// 各トピックの上位単語を表示する
fn print_topics(model: &LdaSampler, n: usize) {
    let word_top = model.word_top();
    for k in 0..model.k() {
        let mut by_count: Vec<(u32, usize)> = (0..model.vocab_size())
            .map(|w| (word_top[[w, k]], w))
            .collect();
        by_count.sort_unstable_by(|a, b| b.cmp(a));
        let words: Vec<&str> = by_count
            .iter()
            .take(n)
            .filter(|&&(count, _)| count > 0)
            .filter_map(|&(_, w)| model.corpus().word(w as u32))
            .collect();
        println!("topic {k:>3}: {}", words.join(" "));
    }
}

fn cmd_demo(k: usize, iters: usize) -> Result<()> {
    let corpus = Arc::new(Corpus::random(10_000, 200, 40, 0)?);
    let mut model = LdaSampler::with_options(corpus, "document", k, sampler_options())?;
    let start = Instant::now();
    model.train(iters, train_options(true))?;
    info!("trained {} iterations in {:.2?}", iters, start.elapsed());

    if let Some(log_probs) = model.log_probs() {
        if let (Some(first), Some(last)) = (log_probs.first(), log_probs.last()) {
            println!(
                "log p(w,z): {:.2} (iteration {}) -> {:.2} (iteration {})",
                first.1, first.0, last.1, last.0
            );
        }
    }
    print_topics(&model, 10);
    Ok(())
}

fn cmd_train(out: &str, k: usize, iters: usize, files: &[String]) -> Result<()> {
    // 1ファイル = 1ドキュメント。トークナイズは空白区切りのみ
    let mut docs = Vec::with_capacity(files.len());
    for path in files {
        let text = fs::read_to_string(path)?;
        let tokens: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
        docs.push(tokens);
    }
    let corpus = Arc::new(Corpus::from_documents(&docs));
    info!(
        "corpus: {} tokens, {} word types, {} documents",
        corpus.len(),
        corpus.vocab_size(),
        docs.len()
    );

    let mut model = LdaSampler::with_options(corpus, "document", k, sampler_options())?;
    let start = Instant::now();
    model.train(iters, train_options(true))?;
    info!("trained {} iterations in {:.2?}", iters, start.elapsed());

    model.save(out)?;
    println!("saved model to {out}");
    Ok(())
}

fn cmd_resume(path: &str, iters: usize) -> Result<()> {
    let mut model = LdaSampler::load(path)?;
    info!(
        "loaded model at iteration {} (K = {}, V = {})",
        model.iteration(),
        model.k(),
        model.vocab_size()
    );
    model.train(iters, train_options(model.log_probs().is_some()))?;
    model.save(path)?;
    println!("model now at iteration {}", model.iteration());
    Ok(())
}

fn cmd_topics(path: &str, n: usize) -> Result<()> {
    let model = LdaSampler::load(path)?;
    print_topics(&model, n);
    Ok(())
}

fn run(args: &[String]) -> Result<()> {
    match args {
        [] => Err(LdaError::Config(usage().to_string())),
        [cmd, rest @ ..] => match (cmd.as_str(), rest) {
            ("demo", rest) => {
                let k = rest.first().and_then(|s| s.parse().ok()).unwrap_or(20);
                let iters = rest.get(1).and_then(|s| s.parse().ok()).unwrap_or(100);
                cmd_demo(k, iters)
            }
            ("train", [out, k, iters, files @ ..]) if !files.is_empty() => {
                let k = k
                    .parse()
                    .map_err(|_| LdaError::Config(format!("invalid K: {k}")))?;
                let iters = iters
                    .parse()
                    .map_err(|_| LdaError::Config(format!("invalid ITERS: {iters}")))?;
                cmd_train(out, k, iters, files)
            }
            ("resume", [path, iters]) => {
                let iters = iters
                    .parse()
                    .map_err(|_| LdaError::Config(format!("invalid ITERS: {iters}")))?;
                cmd_resume(path, iters)
            }
            ("topics", [path, rest @ ..]) => {
                let n = rest.first().and_then(|s| s.parse().ok()).unwrap_or(10);
                cmd_topics(path, n)
            }
            _ => Err(LdaError::Config(usage().to_string())),
        },
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
