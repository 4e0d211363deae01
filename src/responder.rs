use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::Catalog;

/// Replies used when neither the predicted tag nor a `fallback` intent exists.
pub const NOT_UNDERSTOOD_REPLIES: &[&str] = &[
    "I'm not sure I understand. Could you rephrase?",
    "Sorry, I didn't catch that. Could you explain further?",
    "I'm still learning. Please provide more details.",
];

/// Reply used when a turn fails before a response could be chosen.
pub const APOLOGY: &str = "Oops! Something went wrong.";

/// Picks a response uniformly among the responses of `tag`, then of the
/// `fallback` intent, then among [`NOT_UNDERSTOOD_REPLIES`].
pub fn select<R: Rng + ?Sized>(catalog: &Catalog, tag: &str, rng: &mut R) -> String {
    if let Some(response) = catalog
        .get(tag)
        .and_then(|intent| intent.responses.choose(rng))
    {
        return response.clone();
    }

    log::debug!("No responses for '{}', using the fallback intent", tag);
    if let Some(response) = catalog
        .fallback()
        .and_then(|intent| intent.responses.choose(rng))
    {
        return response.clone();
    }

    NOT_UNDERSTOOD_REPLIES
        .choose(rng)
        .copied()
        .unwrap_or(APOLOGY)
        .to_string()
}
