use rand::{thread_rng, Rng};

use crate::config::Settings;
use crate::params::TensorData;

/// One record of user data: a tuple of input tensors and an optional label.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub inputs: Vec<TensorData>,
    pub label: Option<TensorData>,
}

/// Indexable, finite store of representative model inputs, used both for
/// calibration and for accuracy validation.
pub struct SampleStore {
    records: Vec<SampleRecord>,
}

impl SampleStore {
    pub fn new(records: Vec<SampleRecord>) -> SampleStore {
        SampleStore { records }
    }

    /// Materialize at most `cap` records from an arbitrary source, guarding
    /// against unbounded memory use when wrapping streaming data.
    pub fn from_source<I>(source: I, cap: usize) -> SampleStore
    where
        I: IntoIterator<Item = SampleRecord>,
    {
        SampleStore { records: source.into_iter().take(cap).collect() }
    }

    /// `from_source` with the crate's default materialization cap.
    pub fn from_streamed<I>(source: I) -> SampleStore
    where
        I: IntoIterator<Item = SampleRecord>,
    {
        SampleStore::from_source(source, Settings::defaults().max_store_len)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// # Panics
    /// Panics when `index` is outside `[0, len)`.
    pub fn get(&self, index: usize) -> &SampleRecord {
        &self.records[index]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SampleRecord> {
        self.records.iter()
    }

    fn draw_indices(&self, n: usize, shuffle: bool) -> Vec<usize> {
        if self.records.is_empty() {
            return Vec::new();
        }
        let len = self.records.len();
        let mut rng = thread_rng();
        if shuffle {
            (0..n).map(|_| rng.gen_range(0..len)).collect()
        } else {
            let mut indices: Vec<usize> = (0..n.min(len)).collect();
            for _ in len..n {
                indices.push(rng.gen_range(0..len));
            }
            indices
        }
    }

    /// Draw `n` input tuples. Without `shuffle` the first `n` records come
    /// back in index order and the call is repeatable; once the store is
    /// exhausted, or whenever `shuffle` is set, elements are drawn uniformly
    /// at random with replacement.
    pub fn sample_inputs(&self, n: usize, shuffle: bool) -> Vec<Vec<TensorData>> {
        self.draw_indices(n, shuffle)
            .into_iter()
            .map(|i| self.records[i].inputs.clone())
            .collect()
    }

    /// Like `sample_inputs`, also returning the label of every drawn record.
    pub fn sample_pairs(
        &self,
        n: usize,
        shuffle: bool,
    ) -> (Vec<Vec<TensorData>>, Vec<Option<TensorData>>) {
        let indices = self.draw_indices(n, shuffle);
        let mut inputs = Vec::with_capacity(indices.len());
        let mut labels = Vec::with_capacity(indices.len());
        for i in indices {
            inputs.push(self.records[i].inputs.clone());
            labels.push(self.records[i].label.clone());
        }
        (inputs, labels)
    }
}

impl<'a> IntoIterator for &'a SampleStore {
    type Item = &'a SampleRecord;
    type IntoIter = std::slice::Iter<'a, SampleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
