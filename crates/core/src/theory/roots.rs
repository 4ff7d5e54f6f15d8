use rand::Rng;

use super::pitch::{Letter, Pitch};

const ROOT_NAMES: [(Letter, i8); 12] = [
    (Letter::C, 0),
    (Letter::D, -1),
    (Letter::D, 0),
    (Letter::E, -1),
    (Letter::E, 0),
    (Letter::F, 0),
    (Letter::F, 1),
    (Letter::G, 0),
    (Letter::A, -1),
    (Letter::A, 0),
    (Letter::B, -1),
    (Letter::B, 0),
];

const ROOT_OCTAVES: [i8; 2] = [3, 4];

/// Roots used when a session has no fixed root: the twelve common spellings in
/// octaves 3 and 4.
#[must_use]
pub fn root_choices() -> Vec<Pitch> {
    ROOT_OCTAVES
        .iter()
        .flat_map(|octave| {
            ROOT_NAMES
                .iter()
                .filter_map(move |(letter, accidental)| {
                    Pitch::new(*letter, *accidental, *octave).ok()
                })
        })
        .collect()
}

/// Draws a random root from [`root_choices`].
pub fn random_root<R: Rng + ?Sized>(rng: &mut R) -> Pitch {
    let choices = root_choices();
    choices[rng.random_range(0..choices.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn offers_two_octaves_of_roots() {
        let roots = root_choices();
        assert_eq!(roots.len(), 24);
        assert!(roots.iter().all(|p| (3..=4).contains(&p.octave())));
    }

    #[test]
    fn random_root_is_one_of_the_choices() {
        let mut rng = StdRng::seed_from_u64(11);
        let roots = root_choices();
        for _ in 0..50 {
            assert!(roots.contains(&random_root(&mut rng)));
        }
    }
}
