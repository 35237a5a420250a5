//! Query-string handoff of a selection between the estimate and order pages.
//!
//! Keys: `pid` (product id), `qty` (quantity from the fixed enumeration) and one
//! `opt_<group>` per option group. Decoding never yields a partial selection: an unknown
//! product or an unoffered quantity is unresolvable, while a bad or absent option value is
//! replaced by that group's default.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cpq::catalog::Catalog;
use crate::domain::product::{is_offered_quantity, OptionSelections, ProductId};

pub const PRODUCT_KEY: &str = "pid";
pub const QUANTITY_KEY: &str = "qty";
pub const OPTION_PREFIX: &str = "opt_";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub product_id: ProductId,
    pub options: OptionSelections,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "value", rename_all = "snake_case")]
pub enum UnresolvableReason {
    MissingProduct,
    UnknownProduct(String),
    MissingQuantity,
    InvalidQuantity(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SelectionOutcome {
    Resolved { selection: Selection },
    /// Usable, with the listed option groups reset to their default choice.
    ResolvedWithDefaults { selection: Selection, substituted: Vec<String> },
    /// Not usable at all; the caller starts the flow fresh.
    Unresolvable { reason: UnresolvableReason },
}

impl SelectionOutcome {
    pub fn selection(&self) -> Option<&Selection> {
        match self {
            Self::Resolved { selection } | Self::ResolvedWithDefaults { selection, .. } => {
                Some(selection)
            }
            Self::Unresolvable { .. } => None,
        }
    }

    pub fn into_selection(self) -> Option<Selection> {
        match self {
            Self::Resolved { selection } | Self::ResolvedWithDefaults { selection, .. } => {
                Some(selection)
            }
            Self::Unresolvable { .. } => None,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.selection().is_some()
    }
}

/// Canonical key/value pairs: `pid`, `qty`, then `opt_<group>` in group-id order.
pub fn encode_selection(
    product_id: &ProductId,
    options: &OptionSelections,
    quantity: u32,
) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(options.len() + 2);
    pairs.push((PRODUCT_KEY.to_string(), product_id.as_str().to_string()));
    pairs.push((QUANTITY_KEY.to_string(), quantity.to_string()));
    pairs.extend(
        options
            .iter()
            .map(|(group, choice)| (format!("{OPTION_PREFIX}{group}"), choice.clone())),
    );
    pairs
}

pub fn to_query_string(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Splits `a=1&b=2` (leading `?` optional) into decoded pairs. `+` is read as a space and
/// undecodable components are kept verbatim.
pub fn parse_query_string(query: &str) -> Vec<(String, String)> {
    query
        .trim()
        .trim_start_matches('?')
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

pub fn encode_query(product_id: &ProductId, options: &OptionSelections, quantity: u32) -> String {
    to_query_string(&encode_selection(product_id, options, quantity))
}

pub fn decode_query(catalog: &Catalog, query: &str) -> SelectionOutcome {
    decode_selection(catalog, &parse_query_string(query))
}

pub fn decode_selection(catalog: &Catalog, pairs: &[(String, String)]) -> SelectionOutcome {
    let Some(raw_product) = first_value(pairs, PRODUCT_KEY) else {
        return unresolvable(UnresolvableReason::MissingProduct);
    };
    let Some(product) = catalog.find_by_str(raw_product.trim()) else {
        return unresolvable(UnresolvableReason::UnknownProduct(raw_product.to_string()));
    };

    let Some(raw_quantity) = first_value(pairs, QUANTITY_KEY) else {
        return unresolvable(UnresolvableReason::MissingQuantity);
    };
    let quantity = match raw_quantity.trim().parse::<u32>() {
        Ok(quantity) if is_offered_quantity(quantity) => quantity,
        _ => return unresolvable(UnresolvableReason::InvalidQuantity(raw_quantity.to_string())),
    };

    let mut options = OptionSelections::new();
    let mut substituted = Vec::new();
    for group in &product.options {
        let key = format!("{OPTION_PREFIX}{}", group.id);
        let supplied = first_value(pairs, &key).and_then(|choice_id| group.choice(choice_id));
        let chosen = match supplied {
            Some(choice) => choice,
            None => {
                substituted.push(group.id.clone());
                match group.default_choice() {
                    Some(choice) => choice,
                    None => continue,
                }
            }
        };
        options.insert(group.id.clone(), chosen.id.clone());
    }

    let selection = Selection { product_id: product.id.clone(), options, quantity };
    if substituted.is_empty() {
        SelectionOutcome::Resolved { selection }
    } else {
        debug!(
            event_name = "handoff.defaults_substituted",
            product_id = %selection.product_id,
            groups = ?substituted,
            "handoff options replaced by group defaults"
        );
        SelectionOutcome::ResolvedWithDefaults { selection, substituted }
    }
}

fn unresolvable(reason: UnresolvableReason) -> SelectionOutcome {
    debug!(event_name = "handoff.unresolvable", reason = ?reason, "handoff selection discarded");
    SelectionOutcome::Unresolvable { reason }
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(candidate, _)| candidate == key).map(|(_, value)| value.as_str())
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| spaced.clone())
}

#[cfg(test)]
mod tests {
    use super::{
        decode_query, decode_selection, encode_query, encode_selection, parse_query_string,
        Selection, SelectionOutcome, UnresolvableReason,
    };
    use crate::cpq::catalog::Catalog;
    use crate::domain::product::{OptionSelections, ProductId, QUANTITY_TIERS};

    fn options(pairs: &[(&str, &str)]) -> OptionSelections {
        pairs.iter().map(|(group, choice)| (group.to_string(), choice.to_string())).collect()
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(key, value)| (key.to_string(), value.to_string())).collect()
    }

    #[test]
    fn encode_emits_product_quantity_then_options() {
        let encoded = encode_selection(
            &ProductId::new("uchiwa-poly"),
            &options(&[("shape", "diecut"), ("print", "double")]),
            100,
        );

        assert_eq!(
            encoded,
            pairs(&[
                ("pid", "uchiwa-poly"),
                ("qty", "100"),
                ("opt_print", "double"),
                ("opt_shape", "diecut"),
            ])
        );
        assert_eq!(
            encode_query(
                &ProductId::new("uchiwa-poly"),
                &options(&[("shape", "diecut"), ("print", "double")]),
                100
            ),
            "pid=uchiwa-poly&qty=100&opt_print=double&opt_shape=diecut"
        );
    }

    #[test]
    fn round_trip_fills_defaults_for_every_product_and_quantity() {
        let catalog = Catalog::builtin();
        for product in &catalog.products {
            let last_group = product.options.last().expect("builtin products have options");
            let last_choice = last_group.choices.last().expect("groups have choices");
            let partial = options(&[(last_group.id.as_str(), last_choice.id.as_str())]);

            let mut expected_options = product.default_selections();
            expected_options.insert(last_group.id.clone(), last_choice.id.clone());

            for quantity in QUANTITY_TIERS {
                let decoded = decode_selection(&catalog, &encode_selection(&product.id, &partial, quantity))
                    .into_selection();
                assert_eq!(
                    decoded,
                    Some(Selection {
                        product_id: product.id.clone(),
                        options: expected_options.clone(),
                        quantity,
                    })
                );
            }
        }
    }

    #[test]
    fn complete_selection_is_resolved_without_substitution() {
        let catalog = Catalog::builtin();
        let outcome =
            decode_query(&catalog, "?pid=calendar-desk&qty=1000&opt_type=ring&opt_print=color4");

        assert!(matches!(outcome, SelectionOutcome::Resolved { .. }));
    }

    #[test]
    fn invalid_option_values_are_replaced_and_reported() {
        let catalog = Catalog::builtin();
        let outcome = decode_query(&catalog, "pid=calendar-desk&qty=300&opt_type=spiral&opt_bogus=1");

        match outcome {
            SelectionOutcome::ResolvedWithDefaults { selection, substituted } => {
                assert_eq!(selection.options, options(&[("type", "ring"), ("print", "color4")]));
                assert_eq!(substituted, vec!["type".to_string(), "print".to_string()]);
            }
            other => panic!("expected defaults substitution, got {other:?}"),
        }
    }

    #[test]
    fn unknown_product_or_unoffered_quantity_is_unresolvable() {
        let catalog = Catalog::builtin();

        assert_eq!(
            decode_query(&catalog, "pid=mug&qty=100"),
            SelectionOutcome::Unresolvable {
                reason: UnresolvableReason::UnknownProduct("mug".to_string())
            }
        );
        assert_eq!(
            decode_query(&catalog, "pid=uchiwa-poly&qty=250"),
            SelectionOutcome::Unresolvable {
                reason: UnresolvableReason::InvalidQuantity("250".to_string())
            }
        );
        assert!(decode_query(&catalog, "pid=uchiwa-poly&qty=lots").selection().is_none());
        assert!(decode_query(&catalog, "qty=100").selection().is_none());
        assert!(decode_query(&catalog, "pid=uchiwa-poly").selection().is_none());
        assert!(decode_query(&catalog, "").selection().is_none());
    }

    #[test]
    fn parse_decodes_percent_and_plus_and_keeps_first_duplicate() {
        let parsed = parse_query_string("?note=hello+world%21&pid=a&pid=b&flag");

        assert_eq!(
            parsed,
            pairs(&[("note", "hello world!"), ("pid", "a"), ("pid", "b"), ("flag", "")])
        );

        let catalog = Catalog::builtin();
        let outcome = decode_query(&catalog, "pid=bag-tote&pid=calendar-desk&qty=500");
        assert_eq!(
            outcome.selection().map(|selection| selection.product_id.as_str()),
            Some("bag-tote")
        );
    }
}
