use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One verse translation record. `document_id` is the corpus array index and
/// the stable join key to every embedding file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerseRecord {
    /// `"surah:ayah"` or `"surah:ayah_start-ayah_end"` for thematic passages.
    pub document_number: String,
    pub document_id: usize,
    pub text: String,
}

/// Immutable ordered verse corpus. Loaded once at startup, read-only for the
/// process lifetime; safe to share across request tasks without locking.
pub struct Corpus {
    verses: Vec<VerseRecord>,
}

impl Corpus {
    /// Load the corpus from a JSONL file, one record per line. Records are
    /// re-numbered by line position so `document_id` always equals the index.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read corpus file {}", path.display()))?;

        let mut verses = Vec::new();
        for (i, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut record: VerseRecord = serde_json::from_str(line)
                .with_context(|| format!("Invalid corpus record on line {}", i + 1))?;
            record.document_id = verses.len();
            verses.push(record);
        }

        tracing::info!("Loaded {} verses from {}", verses.len(), path.display());
        Ok(Self { verses })
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    pub fn verse(&self, document_id: usize) -> Option<&VerseRecord> {
        self.verses.get(document_id)
    }

    pub fn verses(&self) -> &[VerseRecord] {
        &self.verses
    }

    /// Resolve a `surah:ayah` reference to the passage containing it.
    /// Passages may span ayah ranges (`"2:3-5"` contains `2:4`).
    pub fn lookup_verse(&self, surah: u32, ayah: u32) -> Option<&VerseRecord> {
        self.verses.iter().find(|v| {
            VerseRef::parse(&v.document_number)
                .map(|r| r.surah == surah && r.ayah_start <= ayah && ayah <= r.ayah_end)
                .unwrap_or(false)
        })
    }

    #[cfg(test)]
    pub fn from_records(verses: Vec<VerseRecord>) -> Self {
        Self { verses }
    }
}

/// Parsed form of a `document_number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerseRef {
    pub surah: u32,
    pub ayah_start: u32,
    pub ayah_end: u32,
}

impl VerseRef {
    /// Parse `"surah:ayah"` or `"surah:start-end"`. Returns None on any
    /// malformed or non-positive component.
    pub fn parse(s: &str) -> Option<Self> {
        let (surah, ayat) = s.split_once(':')?;
        let surah: u32 = surah.trim().parse().ok()?;
        let (start, end) = match ayat.split_once('-') {
            Some((a, b)) => (a.trim().parse().ok()?, b.trim().parse().ok()?),
            None => {
                let a: u32 = ayat.trim().parse().ok()?;
                (a, a)
            }
        };
        if surah == 0 || start == 0 || end < start {
            return None;
        }
        Some(Self {
            surah,
            ayah_start: start,
            ayah_end: end,
        })
    }
}

/// Load a corpus embedding file: a JSON array of fixed-length float vectors,
/// one per verse, aligned by `document_id`.
pub fn load_embeddings(path: &Path, corpus_len: usize) -> Result<Vec<Vec<f32>>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read embeddings file {}", path.display()))?;
    let embeddings: Vec<Vec<f32>> = serde_json::from_str(&data)
        .with_context(|| format!("Invalid embeddings file {}", path.display()))?;

    if embeddings.len() != corpus_len {
        anyhow::bail!(
            "Embedding count {} does not match corpus size {} ({})",
            embeddings.len(),
            corpus_len,
            path.display()
        );
    }
    Ok(embeddings)
}
