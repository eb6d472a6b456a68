pub mod advisories;
pub mod cert;
pub mod quote;
pub mod report;
pub mod tcb_level;
pub mod tdx_module;

/// First element of an issuer-ordered list that satisfies `predicate`.
///
/// Levels are sorted from the most to the least restrictive, so the first hit is the
/// answer. There is no "closest" match.
pub fn first_match<'a, T, P>(levels: &'a [T], predicate: P) -> Option<&'a T>
where
    P: FnMut(&&'a T) -> bool,
{
    levels.iter().find(predicate)
}

/// Removes duplicates by equality, keeping the first occurrence of each element.
pub fn dedup_preserving_order<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut unique: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}
