/// This crate is a parallel topic modeling engine using collapsed Gibbs sampling.
pub mod corpus;
pub mod error;
pub mod sampler;
pub mod utils;

/// LDA Sampler
/// The top-level struct of this crate, fitting a Latent Dirichlet Allocation
/// topic model to a tokenized corpus by collapsed Gibbs sampling.
///
/// Internally, it holds:
/// - A corpus reference (`Arc<Corpus>`)
/// - The shared count store (word-topic, document-topic, cached normalizers)
/// - The per-token topic assignment `Z`
/// - The iteration counter and, if tracked, the likelihood history
///
/// Documents are partitioned across workers; each sweep resamples every
/// token once against a fixed snapshot of the shared counts, with worker
/// deltas merged at the sweep barrier. This is the standard approximate
/// parallel collapsed-Gibbs scheme: within a sweep a worker's view of the
/// other workers' moves is stale, and the staleness is bounded to exactly
/// one sweep.
///
/// When creating an instance, you must pass a corpus reference as
/// `Arc<Corpus>`. The `Corpus` can be shared among multiple samplers.
///
/// # Serialization
/// Supported via [`LdaSampler::save`] and [`LdaSampler::load`], or through
/// `LdaArchive` as a serializable data structure. Training may continue on a
/// loaded model.
pub use sampler::LdaSampler;

/// Construction options for the sampler: priors, worker count, and the seed
/// for the initial assignment draw. `Default` gives symmetric 0.01 priors
/// and one worker per rayon thread.
pub use sampler::SamplerOptions;

/// Options for a single training call: likelihood tracking and the sweep
/// seed. Training is deterministic for a fixed seed and worker count.
pub use sampler::trainer::TrainOptions;

/// LDA Archive Data Structure for Serialization
/// A self-describing named-array archive of the full sampler state. It does
/// not hold an `Arc` reference, so it can be stored and shipped freely; use
/// `into_sampler` to turn it back into a live `LdaSampler` (validated
/// first), and `from_sampler` to capture one.
///
/// The likelihood history is written only if the model ever tracked it, and
/// stays absent after a round trip otherwise.
pub use sampler::serde::LdaArchive;

/// Corpus for the LDA Sampler
/// An immutable tokenized corpus: the ordered word-id stream, the
/// vocabulary, and named context types (token spans grouping the stream
/// into documents). Corpus construction and tokenization live outside this
/// crate; the `from_documents` and `random` builders exist for demos and
/// tests.
///
/// `Corpus` is immutable and can be shared among multiple samplers via
/// `Arc`.
pub use corpus::Corpus;

/// Error type and result alias for everything this crate can fail at:
/// configuration, shape mismatches, unknown context types, archive I/O and
/// format problems, and numerical degeneracy.
pub use error::{LdaError, Result};
