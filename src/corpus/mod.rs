use std::ops::Range;

use indexmap::{IndexMap, IndexSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{LdaError, Result};

/// Tokenized corpus for the LDA sampler.
///
/// Holds an ordered stream of word ids, the vocabulary that maps ids to
/// surface forms, and one or more named context types. A context type is a
/// monotone list of token end-offsets: context `i` covers the token range
/// `[offsets[i-1], offsets[i])` (with an implicit leading 0). "document" is
/// the usual context type, but a corpus may carry coarser or finer groupings
/// (paragraphs, sentences) under other names.
///
/// The token stream is immutable after construction. Corpus construction and
/// tokenization proper live outside this crate; the builders here exist so
/// demos and tests have a collaborator to talk to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Corpus {
    tokens: Vec<u32>,
    vocab: IndexSet<Box<str>>,
    contexts: IndexMap<Box<str>, Vec<usize>>,
}

impl Corpus {
    /// Create a corpus from raw parts, validating every cross-reference.
    ///
    /// Fails if a token id is out of vocabulary range, or if any context's
    /// offsets are not monotone or do not end at the token stream length.
    pub fn new(
        tokens: Vec<u32>,
        vocab: IndexSet<Box<str>>,
        contexts: IndexMap<Box<str>, Vec<usize>>,
    ) -> Result<Self> {
        let v = vocab.len();
        if let Some(&bad) = tokens.iter().find(|&&t| t as usize >= v) {
            return Err(LdaError::Config(format!(
                "token id {bad} out of range for vocabulary of size {v}"
            )));
        }
        for (name, offsets) in &contexts {
            let mut prev = 0usize;
            for &end in offsets {
                if end < prev {
                    return Err(LdaError::Config(format!(
                        "context type '{name}' has non-monotone offsets"
                    )));
                }
                prev = end;
            }
            if prev != tokens.len() {
                return Err(LdaError::Config(format!(
                    "context type '{name}' covers {prev} of {} tokens",
                    tokens.len()
                )));
            }
        }
        Ok(Self {
            tokens,
            vocab,
            contexts,
        })
    }

    /// Vocabulary size V.
    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// Total token count N.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The ordered word-id stream.
    pub fn tokens(&self) -> &[u32] {
        &self.tokens
    }

    /// Surface form for a word id.
    pub fn word(&self, id: u32) -> Option<&str> {
        self.vocab.get_index(id as usize).map(|w| w.as_ref())
    }

    /// Word id for a surface form.
    pub fn word_id(&self, word: &str) -> Option<u32> {
        self.vocab.get_index_of(word).map(|i| i as u32)
    }

    /// The vocabulary in id order.
    pub fn vocabulary(&self) -> impl Iterator<Item = &str> {
        self.vocab.iter().map(|w| w.as_ref())
    }

    /// Names of the context types this corpus defines.
    pub fn context_types(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(|k| k.as_ref())
    }

    /// Raw end-offsets for a context type.
    pub fn context_offsets(&self, context_type: &str) -> Result<&[usize]> {
        self.contexts
            .get(context_type)
            .map(|o| o.as_slice())
            .ok_or_else(|| LdaError::UnknownContextType(context_type.to_string()))
    }

    /// Token index spans delimiting each context of the given type.
    pub fn context_spans(&self, context_type: &str) -> Result<Vec<Range<usize>>> {
        let offsets = self.context_offsets(context_type)?;
        let mut spans = Vec::with_capacity(offsets.len());
        let mut start = 0usize;
        for &end in offsets {
            spans.push(start..end);
            start = end;
        }
        Ok(spans)
    }
}

/// Builders. 本体のコーパス構築はクレート外の責務なので、ここにあるのは
/// デモとテストのための最小限のものだけ。
impl Corpus {
    /// Build a corpus from pre-tokenized documents, registered under the
    /// `"document"` context type. Vocabulary ids follow first appearance.
    pub fn from_documents<S: AsRef<str>>(docs: &[Vec<S>]) -> Self {
        let mut vocab: IndexSet<Box<str>> = IndexSet::new();
        let mut tokens = Vec::new();
        let mut offsets = Vec::with_capacity(docs.len());
        for doc in docs {
            for word in doc {
                let (id, _) = vocab.insert_full(Box::<str>::from(word.as_ref()));
                tokens.push(id as u32);
            }
            offsets.push(tokens.len());
        }
        let mut contexts = IndexMap::new();
        contexts.insert(Box::<str>::from("document"), offsets);
        Self {
            tokens,
            vocab,
            contexts,
        }
    }

    /// Build a synthetic corpus: `n_tokens` uniform draws over a vocabulary
    /// of `vocab_size` synthetic words, cut into `n_docs` documents at
    /// random boundaries. Deterministic for a fixed seed.
    pub fn random(n_tokens: usize, vocab_size: usize, n_docs: usize, seed: u64) -> Result<Self> {
        if vocab_size == 0 && n_tokens > 0 {
            return Err(LdaError::Config(
                "vocab_size must be positive when n_tokens > 0".to_string(),
            ));
        }
        if n_docs == 0 {
            return Err(LdaError::Config("n_docs must be positive".to_string()));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let tokens: Vec<u32> = (0..n_tokens)
            .map(|_| rng.random_range(0..vocab_size as u32))
            .collect();

        // n_docs - 1 random cut points; duplicates give empty documents,
        // which the sampler tolerates
        let mut offsets: Vec<usize> = (0..n_docs - 1)
            .map(|_| rng.random_range(0..=n_tokens))
            .collect();
        offsets.sort_unstable();
        offsets.push(n_tokens);

        let vocab: IndexSet<Box<str>> = (0..vocab_size)
            .map(|i| Box::<str>::from(format!("w{i}")))
            .collect();
        let mut contexts = IndexMap::new();
        contexts.insert(Box::<str>::from("document"), offsets);
        Ok(Self {
            tokens,
            vocab,
            contexts,
        })
    }
}
