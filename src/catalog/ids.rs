/// Allocates the next product id for a category.
///
/// Ids look like `{prefix}{NN}`: the numeric suffix of every existing id with the same
/// prefix is parsed, and the result is one more than the largest, zero-padded to at
/// least two digits. Ids with a non-numeric suffix, or one that does not fit a `u64`,
/// are ignored.
pub fn next_product_id<'a>(existing: impl IntoIterator<Item = &'a str>, prefix: &str) -> String {
    let next = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(prefix))
        .filter(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .max()
        .map_or(1, |max| u128::from(max) + 1);

    format!("{prefix}{next:02}")
}
