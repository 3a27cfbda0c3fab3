use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use std::fmt;
use std::marker::PhantomData;

/// JSON object read as a list of entries in document order.
///
/// Slot maps are keyed by id and rendered in the order the backend wrote them,
/// which a `HashMap` or `BTreeMap` would lose.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderedEntries<K, V>(pub Vec<(K, V)>);

impl<K, V> OrderedEntries<K, V> {
    pub fn into_inner(self) -> Vec<(K, V)> {
        self.0
    }
}

impl<'de, K, V> Deserialize<'de> for OrderedEntries<K, V>
where
    K: Deserialize<'de>,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<K, V>(PhantomData<(K, V)>);

        impl<'de, K, V> Visitor<'de> for EntriesVisitor<K, V>
        where
            K: Deserialize<'de>,
            V: Deserialize<'de>,
        {
            type Value = OrderedEntries<K, V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry()? {
                    entries.push(entry);
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}
