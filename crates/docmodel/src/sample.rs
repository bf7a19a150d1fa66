//! Bounded, representative subsets of homogeneous lists
//!
//! Every strategy returns exactly `min(max_items, items.len())` nodes, in
//! ascending input order. Randomised strategies draw from a caller-supplied
//! [`Rng`]; use [`Sampler::seeded`] for reproducible output.

use std::fmt;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::node::Node;
use crate::xml::codec::{to_xml, ExportOptions, LIST_ITEM_TAG};

/// Selection strategy for [`sample`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Strategy {
    /// First `n` items
    Head,
    /// First `n / 2` and last `n - n / 2` items
    #[cfg_attr(feature = "serde", serde(alias = "headTail"))]
    HeadTail,
    /// Every `len / n`-th item starting at 0
    Uniform,
    /// Uniform random choice without replacement
    Random,
    /// Cover as many distinct field values as the budget allows, rarest first
    #[default]
    Diverse,
}

impl Strategy {
    pub const ALL: [Self; 5] = [
        Self::Head,
        Self::HeadTail,
        Self::Uniform,
        Self::Random,
        Self::Diverse,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::HeadTail => "head_tail",
            Self::Uniform => "uniform",
            Self::Random => "random",
            Self::Diverse => "diverse",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "head" => Ok(Self::Head),
            "head_tail" | "headTail" | "head-tail" => Ok(Self::HeadTail),
            "uniform" => Ok(Self::Uniform),
            "random" => Ok(Self::Random),
            "diverse" => Ok(Self::Diverse),
            other => Err(Error::invalid_argument(format!(
                "unknown sampling strategy '{other}'"
            ))),
        }
    }
}

/// Select at most `max_items` of `items`.
///
/// Returns the items unchanged when there are no more than `max_items`.
/// Fails with `InvalidArgument` when `max_items` is zero.
#[instrument(level = "debug", skip(items, rng), fields(len = items.len()))]
pub fn sample<R>(items: &[Node], max_items: usize, strategy: Strategy, rng: &mut R) -> Result<Vec<Node>>
where
    R: Rng + ?Sized,
{
    if max_items == 0 {
        return Err(Error::invalid_argument("max_items must be at least 1"));
    }
    if items.len() <= max_items {
        return Ok(items.to_vec());
    }

    let mut indices = match strategy {
        Strategy::Head => (0..max_items).collect(),
        Strategy::HeadTail => head_tail(items.len(), max_items),
        Strategy::Uniform => uniform(items.len(), max_items),
        Strategy::Random => index::sample(rng, items.len(), max_items).into_vec(),
        Strategy::Diverse => diverse(items, max_items, rng),
    };
    indices.sort_unstable();
    indices.truncate(max_items);

    debug!(selected = indices.len(), "sampled items");
    Ok(indices
        .into_iter()
        .filter_map(|i| items.get(i).cloned())
        .collect())
}

fn head_tail(len: usize, max_items: usize) -> Vec<usize> {
    let head = max_items / 2;
    let tail = max_items - head;
    (0..head).chain(len - tail..len).collect()
}

fn uniform(len: usize, max_items: usize) -> Vec<usize> {
    let stride = len / max_items;
    (0..max_items).map(|i| i * stride).collect()
}

fn diverse<R>(items: &[Node], max_items: usize, rng: &mut R) -> Vec<usize>
where
    R: Rng + ?Sized,
{
    // field path -> value -> indices of items carrying it
    let mut groups: IndexMap<String, IndexMap<&str, Vec<usize>>> = IndexMap::new();
    // per item, the (field, value) slots it carries
    let mut carried: Vec<Vec<Slot>> = vec![Vec::new(); items.len()];
    for (i, (item, slots)) in items.iter().zip(carried.iter_mut()).enumerate() {
        for (path, value) in item.scalar_leaves() {
            let field = groups.entry(path);
            let field_index = field.index();
            let entry = field.or_default().entry(value);
            let slot = (field_index, entry.index());
            let members = entry.or_default();
            if members.last() != Some(&i) {
                members.push(i);
                slots.push(slot);
            }
        }
    }

    // Low-cardinality fields first so categorical values are covered before
    // near-unique identifiers eat the budget.
    let mut fields: Vec<(usize, &IndexMap<&str, Vec<usize>>)> = groups.values().enumerate().collect();
    fields.sort_by_key(|(_, values)| values.len());

    let mut taken = vec![false; items.len()];
    let mut covered: IndexSet<Slot> = IndexSet::new();
    let mut selected = Vec::with_capacity(max_items);

    'fields: for (field, values) in fields {
        let mut values: Vec<(usize, &Vec<usize>)> = values.values().enumerate().collect();
        values.sort_by_key(|(_, members)| members.len());
        for (value, members) in values {
            if selected.len() == max_items {
                break 'fields;
            }
            // already carried by a selected item
            if covered.contains(&(field, value)) {
                continue;
            }
            let open: Vec<usize> = members
                .iter()
                .copied()
                .filter(|&i| !taken.get(i).copied().unwrap_or(true))
                .collect();
            let best = open
                .iter()
                .map(|&i| uncovered(&carried, &covered, i))
                .max()
                .unwrap_or(0);
            let candidates: Vec<usize> = open
                .into_iter()
                .filter(|&i| uncovered(&carried, &covered, i) == best)
                .collect();
            if let Some(&pick) = candidates.choose(rng) {
                mark(&mut taken, pick);
                selected.push(pick);
                if let Some(slots) = carried.get(pick) {
                    covered.extend(slots.iter().copied());
                }
            }
        }
    }
    debug!(covered = covered.len(), picked = selected.len(), "covered field values");

    if selected.len() < max_items {
        let rest = untaken(&taken);
        let need = (max_items - selected.len()).min(rest.len());
        debug!(fill = need, "filling diverse sample");
        for position in head_tail(rest.len(), need) {
            if let Some(&i) = rest.get(position) {
                mark(&mut taken, i);
                selected.push(i);
            }
        }
    }

    if selected.len() < max_items {
        let rest = untaken(&taken);
        let need = max_items - selected.len();
        warn!(need, "falling back to random fill");
        selected.extend(rest.choose_multiple(rng, need).copied());
    }

    selected
}

/// `(field index, value index)` into the diverse grouping table
type Slot = (usize, usize);

/// How many not-yet-covered field values item `i` would add
fn uncovered(carried: &[Vec<Slot>], covered: &IndexSet<Slot>, i: usize) -> usize {
    carried
        .get(i)
        .map_or(0, |slots| slots.iter().filter(|slot| !covered.contains(*slot)).count())
}

fn untaken(taken: &[bool]) -> Vec<usize> {
    taken
        .iter()
        .enumerate()
        .filter(|(_, taken)| !**taken)
        .map(|(i, _)| i)
        .collect()
}

fn mark(taken: &mut [bool], i: usize) {
    if let Some(slot) = taken.get_mut(i) {
        *slot = true;
    }
}

/// Sample so that the compact XML of the chosen items fits in `max_bytes`.
///
/// The item count is first estimated from the average exported size, then
/// the largest chosen items are dropped until the budget holds. An item
/// larger than the whole budget is never returned, so the result may be
/// empty.
#[instrument(level = "debug", skip(items, rng), fields(len = items.len()))]
pub fn sample_within_bytes<R>(
    items: &[Node],
    max_bytes: usize,
    strategy: Strategy,
    rng: &mut R,
) -> Result<Vec<Node>>
where
    R: Rng + ?Sized,
{
    if max_bytes == 0 {
        return Err(Error::invalid_argument("max_bytes must be at least 1"));
    }
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let total: usize = items.iter().map(exported_len).sum();
    let average = total.div_ceil(items.len()).max(1);
    let estimate = (max_bytes / average).clamp(1, items.len());

    let mut subset: Vec<(usize, Node)> = sample(items, estimate, strategy, rng)?
        .into_iter()
        .map(|node| (exported_len(&node), node))
        .collect();

    let mut size: usize = subset.iter().map(|(len, _)| len).sum();
    while size > max_bytes {
        let Some(largest) = subset
            .iter()
            .enumerate()
            .max_by_key(|(_, (len, _))| *len)
            .map(|(i, _)| i)
        else {
            break;
        };
        let (len, _) = subset.remove(largest);
        size -= len;
    }

    debug!(estimate, kept = subset.len(), bytes = size, "sampled within budget");
    Ok(subset.into_iter().map(|(_, node)| node).collect())
}

fn exported_len(node: &Node) -> usize {
    to_xml(node, LIST_ITEM_TAG, &ExportOptions::compact()).len()
}

/// Owns a seedable random source for repeated sampling
#[derive(Clone, Debug)]
pub struct Sampler {
    rng: ChaCha8Rng,
}

impl Sampler {
    /// Deterministic sampler; equal seeds give equal selections
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Sampler seeded from the operating system
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn sample(&mut self, items: &[Node], max_items: usize, strategy: Strategy) -> Result<Vec<Node>> {
        sample(items, max_items, strategy, &mut self.rng)
    }

    pub fn sample_within_bytes(
        &mut self,
        items: &[Node],
        max_bytes: usize,
        strategy: Strategy,
    ) -> Result<Vec<Node>> {
        sample_within_bytes(items, max_bytes, strategy, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::node::Object;

    fn numbered(n: usize) -> Vec<Node> {
        (0..n).map(|i| Node::scalar(i.to_string())).collect()
    }

    fn values(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().filter_map(Node::as_scalar).collect()
    }

    #[test]
    fn test_zero_budget_is_invalid() {
        let mut sampler = Sampler::seeded(1);
        let err = sampler.sample(&numbered(3), 0, Strategy::Head).err();
        assert!(matches!(err.map(|e| e.kind().clone()), Some(ErrorKind::InvalidArgument)));
    }

    #[test]
    fn test_small_input_unchanged() -> Result<()> {
        let items = numbered(3);
        for strategy in Strategy::ALL {
            assert_eq!(Sampler::seeded(7).sample(&items, 5, strategy)?, items);
        }
        Ok(())
    }

    #[test]
    fn test_head_and_head_tail() -> Result<()> {
        let items = numbered(10);
        let mut sampler = Sampler::seeded(0);
        assert_eq!(values(&sampler.sample(&items, 3, Strategy::Head)?), ["0", "1", "2"]);
        assert_eq!(
            values(&sampler.sample(&items, 5, Strategy::HeadTail)?),
            ["0", "1", "7", "8", "9"]
        );
        Ok(())
    }

    #[test]
    fn test_uniform_stride() -> Result<()> {
        let items = numbered(10);
        let picked = Sampler::seeded(0).sample(&items, 3, Strategy::Uniform)?;
        assert_eq!(values(&picked), ["0", "3", "6"]);
        Ok(())
    }

    #[test]
    fn test_random_is_reproducible() -> Result<()> {
        let items = numbered(50);
        let a = Sampler::seeded(42).sample(&items, 10, Strategy::Random)?;
        let b = Sampler::seeded(42).sample(&items, 10, Strategy::Random)?;
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        Ok(())
    }

    #[test]
    fn test_diverse_prefers_rare_values() -> Result<()> {
        let mut items: Vec<Node> = (0..20)
            .map(|_| Node::Object(Object::new().with_attribute("kind", "common")))
            .collect();
        items.push(Node::Object(Object::new().with_attribute("kind", "rare")));

        let picked = Sampler::seeded(3).sample(&items, 2, Strategy::Diverse)?;
        assert_eq!(picked.len(), 2);
        assert!(picked
            .iter()
            .any(|n| n.as_object().and_then(|o| o.attribute("kind")) == Some("rare")));
        Ok(())
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("headTail".parse::<Strategy>().ok(), Some(Strategy::HeadTail));
        assert_eq!("head_tail".parse::<Strategy>().ok(), Some(Strategy::HeadTail));
        assert_eq!(Strategy::default(), Strategy::Diverse);
        assert!("sideways".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_within_bytes_respects_budget() -> Result<()> {
        let items = numbered(100);
        let budget = 120;
        let picked = Sampler::seeded(9).sample_within_bytes(&items, budget, Strategy::Uniform)?;
        assert!(!picked.is_empty());
        let size: usize = picked.iter().map(exported_len).sum();
        assert!(size <= budget);
        Ok(())
    }

    #[test]
    fn test_within_bytes_drops_oversized_items() -> Result<()> {
        let items = vec![Node::scalar("x".repeat(64))];
        let picked = Sampler::seeded(9).sample_within_bytes(&items, 10, Strategy::Head)?;
        assert!(picked.is_empty());
        Ok(())
    }
}
