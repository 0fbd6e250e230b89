//! Comparaison naturelle de chaînes.
//!
//! Une comparaison « naturelle » traite les suites de chiffres comme des
//! nombres entiers : `"Track 2"` vient avant `"Track 10"`, là où la
//! comparaison lexicographique classique les inverserait. La comparaison
//! est insensible à la casse.

use std::cmp::Ordering;

/// Un segment de chaîne : soit du texte, soit un nombre.
enum Segment<'a> {
    Text(&'a str),
    Number(&'a str),
}

/// Découpe une chaîne en segments texte/nombre successifs.
fn segments(s: &str) -> impl Iterator<Item = Segment<'_>> {
    let mut rest = s;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let first_is_digit = rest.chars().next().is_some_and(|c| c.is_ascii_digit());
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != first_is_digit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(if first_is_digit {
            Segment::Number(head)
        } else {
            Segment::Text(head)
        })
    })
}

/// Compare deux suites de chiffres comme des entiers de taille arbitraire.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    match a.len().cmp(&b.len()) {
        Ordering::Equal => a.cmp(b),
        other => other,
    }
}

/// Compare deux segments de texte, insensible à la casse.
fn cmp_text(a: &str, b: &str) -> Ordering {
    let mut ia = a.chars().flat_map(char::to_lowercase);
    let mut ib = b.chars().flat_map(char::to_lowercase);
    loop {
        match (ia.next(), ib.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => match ca.cmp(&cb) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

/// Comparaison naturelle de deux chaînes.
///
/// Ordre total : les segments numériques sont comparés par valeur, les
/// segments textuels sans tenir compte de la casse. En cas d'égalité
/// naturelle (`"Track 01"` vs `"Track 1"`), la comparaison binaire des
/// chaînes départage pour rester déterministe.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut sa = segments(a);
    let mut sb = segments(b);
    loop {
        match (sa.next(), sb.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x, y) {
                    (Segment::Number(x), Segment::Number(y)) => cmp_digits(x, y),
                    (Segment::Text(x), Segment::Text(y)) => cmp_text(x, y),
                    // Un nombre vient avant du texte à position égale.
                    (Segment::Number(_), Segment::Text(_)) => Ordering::Less,
                    (Segment::Text(_), Segment::Number(_)) => Ordering::Greater,
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Clé de normalisation pour l'indexation par clé.
///
/// Minuscules, espaces repliés, et suites de chiffres canonisées (zéros de
/// tête supprimés) : `"Track 01"` et `"track 1"` produisent la même clé.
pub fn fold_key(s: &str) -> String {
    let mut key = String::with_capacity(s.len());
    let mut last_was_space = true;
    for seg in segments(s.trim()) {
        match seg {
            Segment::Number(n) => {
                let n = n.trim_start_matches('0');
                if n.is_empty() {
                    key.push('0');
                } else {
                    key.push_str(n);
                }
                last_was_space = false;
            }
            Segment::Text(t) => {
                for c in t.chars() {
                    if c.is_whitespace() {
                        if !last_was_space {
                            key.push(' ');
                            last_was_space = true;
                        }
                    } else {
                        key.extend(c.to_lowercase());
                        last_was_space = false;
                    }
                }
            }
        }
    }
    while key.ends_with(' ') {
        key.pop();
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_ordering() {
        let mut tracks = vec!["Track 2", "Track 10", "Track 1"];
        tracks.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(tracks, vec!["Track 1", "Track 2", "Track 10"]);
    }

    #[test]
    fn test_case_insensitive() {
        let mut names = vec!["zz top", "Abba", "abba live"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["Abba", "abba live", "zz top"]);
    }

    #[test]
    fn test_leading_zeros() {
        assert_eq!(cmp_digits("002", "2"), Ordering::Equal);
        assert_eq!(cmp_digits("012", "2"), Ordering::Greater);
    }

    #[test]
    fn test_fold_key() {
        assert_eq!(fold_key("Track 01"), fold_key("track 1"));
        assert_eq!(fold_key("  ROCK  "), "rock");
        assert_eq!(fold_key("Disc 2 /  Track 003"), "disc 2 / track 3");
        assert_ne!(fold_key("Track 1"), fold_key("Track 2"));
    }

    #[test]
    fn test_total_order_deterministic() {
        // Égalité naturelle mais chaînes différentes : l'ordre reste stable.
        assert_ne!(natural_cmp("Track 01", "Track 1"), Ordering::Equal);
        assert_eq!(natural_cmp("Track 01", "Track 01"), Ordering::Equal);
    }
}
