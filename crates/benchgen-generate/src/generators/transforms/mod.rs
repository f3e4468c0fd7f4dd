use rand::Rng;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Probabilistic string mangler for dirty categorical data. One roll picks
/// at most one edit: upper-casing, lower-casing, trailing spaces, a random
/// letter insertion or a random deletion (10% each); half the values pass
/// through untouched.
pub fn mangle<R: Rng + ?Sized>(value: &str, rng: &mut R) -> String {
    let roll = rng.random::<f64>();
    if roll < 0.1 {
        value.to_uppercase()
    } else if roll < 0.2 {
        value.to_lowercase()
    } else if roll < 0.3 {
        let spaces = rng.random_range(1..=3);
        format!("{value}{}", " ".repeat(spaces))
    } else if roll < 0.4 {
        let mut chars: Vec<char> = value.chars().collect();
        let at = rng.random_range(0..=chars.len());
        chars.insert(at, LETTERS[rng.random_range(0..LETTERS.len())] as char);
        chars.into_iter().collect()
    } else if roll < 0.5 {
        let mut chars: Vec<char> = value.chars().collect();
        let at = rng.random_range(0..=chars.len());
        if at < chars.len() {
            chars.remove(at);
        }
        chars.into_iter().collect()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn mangle_produces_variants() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let outputs: Vec<String> = (0..400).map(|_| mangle("Protein", &mut rng)).collect();

        assert!(outputs.iter().any(|value| value == "Protein"));
        assert!(outputs.iter().any(|value| value == "PROTEIN"));
        assert!(outputs.iter().any(|value| value == "protein"));
        assert!(outputs.iter().any(|value| value.starts_with("Protein ")));
        assert!(outputs.iter().any(|value| value.chars().count() == 8 && !value.ends_with(' ')));
        assert!(outputs.iter().any(|value| value.chars().count() == 6));
    }

    #[test]
    fn mangle_handles_multibyte_text() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..200 {
            let value = mangle("çáé", &mut rng);
            assert!(value.chars().count() >= 2);
        }
    }

    #[test]
    fn mangle_keeps_empty_strings_valid() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..50 {
            assert!(mangle("", &mut rng).chars().count() <= 3);
        }
    }
}
