/// Trace key type.
pub type Key = i64;

/// Entry weight (cost or size) carried by each access.
pub type Weight = u32;

/// One simulated cache access, produced by the trace reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AccessEvent {
    key: Key,
    weight: Weight,
}

impl AccessEvent {
    pub fn new(key: Key, weight: Weight) -> Self {
        AccessEvent { key, weight }
    }

    /// An access from an unweighted trace.
    pub fn for_key(key: Key) -> Self {
        AccessEvent { key, weight: 1 }
    }

    #[inline]
    pub fn key(&self) -> Key {
        self.key
    }

    #[inline]
    pub fn weight(&self) -> Weight {
        self.weight
    }
}

impl From<(Key, Weight)> for AccessEvent {
    fn from((key, weight): (Key, Weight)) -> Self {
        AccessEvent::new(key, weight)
    }
}
