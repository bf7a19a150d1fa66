#![allow(clippy::panic_in_result_fn)]
#![allow(clippy::indexing_slicing)]

use std::collections::HashSet;

use docmodel::sample::sample_within_bytes;
use docmodel::{diversity_sample, ErrorKind, Node, Object, Result, Sampler, Strategy};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// 100 items whose `f` attribute cycles through three values, with a unique
/// id and a unique name each
fn catalog() -> Vec<Node> {
    (0..100)
        .map(|i| {
            let f = ["alpha", "beta", "gamma"][i % 3];
            Node::Object(
                Object::new()
                    .with_attribute("id", i.to_string())
                    .with_attribute("f", f)
                    .with_child("name", format!("item {i}")),
            )
        })
        .collect()
}

/// Like [`catalog`], but `f` is no longer the lowest-cardinality field: each
/// item also carries a constant `type` attribute, a constant `category`
/// child and, when `with_parity` is set, a two-valued `parity` attribute
/// that cuts across `f`
fn catalog_with_constant_fields(with_parity: bool) -> Vec<Node> {
    catalog()
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let Node::Object(mut object) = item else {
                return item;
            };
            object = object.with_attribute("type", "Item");
            if with_parity {
                object = object.with_attribute("parity", if i % 2 == 0 { "even" } else { "odd" });
            }
            Node::Object(object.with_child("category", "weapon"))
        })
        .collect()
}

fn attribute<'a>(node: &'a Node, name: &str) -> Option<&'a str> {
    node.as_object().and_then(|o| o.attribute(name))
}

#[test]
fn test_diverse_covers_every_value() -> Result<()> {
    let catalogs = [
        ("plain", catalog()),
        ("constant fields", catalog_with_constant_fields(false)),
        ("constant and parity fields", catalog_with_constant_fields(true)),
    ];
    for (name, items) in &catalogs {
        for (seed, max_items) in (0..32).zip([3, 4, 5].into_iter().cycle()) {
            let picked = Sampler::seeded(seed).sample(items, max_items, Strategy::Diverse)?;
            let values: HashSet<_> = picked.iter().filter_map(|n| attribute(n, "f")).collect();
            assert_eq!(picked.len(), max_items, "{name}, seed {seed}");
            assert_eq!(values.len(), 3, "{name}, seed {seed}");
        }
    }
    Ok(())
}

#[test]
fn test_diverse_surfaces_rare_value() -> Result<()> {
    let mut items = catalog();
    items.push(Node::Object(
        Object::new()
            .with_attribute("id", "rare")
            .with_attribute("f", "delta"),
    ));
    let picked = Sampler::seeded(11).sample(&items, 4, Strategy::Diverse)?;
    assert!(picked.iter().any(|n| attribute(n, "f") == Some("delta")));
    Ok(())
}

#[test]
fn test_results_keep_input_order() -> Result<()> {
    let items = catalog();
    for strategy in Strategy::ALL {
        let picked = Sampler::seeded(5).sample(&items, 20, strategy)?;
        let ids: Vec<usize> = picked
            .iter()
            .filter_map(|n| attribute(n, "id"))
            .filter_map(|id| id.parse().ok())
            .collect();
        assert_eq!(ids.len(), 20, "{strategy}");
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "{strategy}");
    }
    Ok(())
}

#[test]
fn test_odd_head_tail_gives_tail_the_extra() -> Result<()> {
    let items: Vec<Node> = (0..10).map(|i| Node::scalar(i.to_string())).collect();
    let picked = Sampler::seeded(0).sample(&items, 3, Strategy::HeadTail)?;
    let values: Vec<_> = picked.iter().filter_map(Node::as_scalar).collect();
    assert_eq!(values, ["0", "8", "9"]);
    Ok(())
}

#[test]
fn test_heterogeneous_items_do_not_fail() -> Result<()> {
    let items = vec![
        Node::scalar("bare"),
        Node::Object(Object::new().with_attribute("a", "1")),
        Node::List(vec![Node::scalar("x")]),
        Node::Object(Object::new().with_child("b", "2")),
        Node::default(),
    ];
    let picked = Sampler::seeded(2).sample(&items, 3, Strategy::Diverse)?;
    assert_eq!(picked.len(), 3);
    Ok(())
}

#[test]
fn test_diversity_sample_accepts_external_rng() -> Result<()> {
    let items = catalog();
    let mut a = ChaCha8Rng::seed_from_u64(99);
    let mut b = ChaCha8Rng::seed_from_u64(99);
    assert_eq!(
        diversity_sample(&items, 7, Strategy::Random, &mut a)?,
        diversity_sample(&items, 7, Strategy::Random, &mut b)?
    );
    Ok(())
}

#[test]
fn test_invalid_budgets() {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let items = catalog();
    let err = diversity_sample(&items, 0, Strategy::Diverse, &mut rng).err();
    assert_eq!(err.map(|e| e.kind().clone()), Some(ErrorKind::InvalidArgument));

    let err = sample_within_bytes(&items, 0, Strategy::Diverse, &mut rng).err();
    assert_eq!(err.map(|e| e.kind().clone()), Some(ErrorKind::InvalidArgument));
}

#[test]
fn test_byte_budget_bounds_output() -> Result<()> {
    let items = catalog();
    let mut sampler = Sampler::seeded(8);
    let picked = sampler.sample_within_bytes(&items, 1_000, Strategy::Diverse)?;
    assert!(!picked.is_empty());
    assert!(picked.len() < items.len());

    let everything = sampler.sample_within_bytes(&items, usize::MAX, Strategy::Diverse)?;
    assert_eq!(everything, items);
    Ok(())
}
