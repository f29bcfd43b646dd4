/// Levenshtein edit distance with unit costs, over Unicode scalar values.
///
/// Either operand being empty short-circuits to the other's length.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings() {
        assert_eq!(levenshtein("model", "model"), 0);
        assert_eq!(levenshtein("", ""), 0);
    }

    #[test]
    fn test_empty_operand() {
        assert_eq!(levenshtein("", "history"), 7);
        assert_eq!(levenshtein("apikey", ""), 6);
    }

    #[test]
    fn test_classic_pair() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
    }

    #[test]
    fn test_prefix_distances() {
        assert_eq!(levenshtein("mod", "mode"), 1);
        assert_eq!(levenshtein("mod", "model"), 2);
        assert_eq!(levenshtein("mod", "system"), 6);
    }

    #[test]
    fn test_symmetric() {
        assert_eq!(levenshtein("clear", "detail"), levenshtein("detail", "clear"));
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        assert_eq!(levenshtein("é", "e"), 1);
        assert_eq!(levenshtein("日本", "日本語"), 1);
    }
}
